use camino::Utf8PathBuf;
use overlay_keeper_lib::core::copier::{BufferedCopier, CopySettings};
use overlay_keeper_lib::models::error::SError;
use overlay_keeper_lib::utils::file::FileUtils;
use overlay_keeper_lib::utils::hash::{hash_bytes, hash_file};
use std::fs;
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

const CHUNK: usize = 16;
const SLOTS: usize = 4;

fn copier() -> BufferedCopier {
    BufferedCopier::new(CopySettings {
        chunk_size: CHUNK,
        ring_slots: SLOTS,
    })
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn test_copy_preserves_content_across_chunk_boundaries() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let copier = copier();

    let sizes = [
        0,
        1,
        CHUNK,
        CHUNK * 3 + 1,
        copier.capacity(),
        copier.capacity() * 3,
        copier.capacity() * 3 + 7,
    ];

    for size in sizes {
        let data = patterned(size);
        let src = root.join(format!("src_{size}"));
        let dst = root.join(format!("out/dst_{size}"));
        fs::write(&src, &data).unwrap();

        let written = copier.copy(&src, &dst).unwrap();

        assert_eq!(written, size as u64, "size {size}");
        assert_eq!(hash_file(&dst).unwrap(), hash_bytes(&data), "size {size}");
        assert!(!FileUtils::sibling(&dst, "partial").exists());
    }
}

#[test]
fn test_copy_overwrites_existing_destination() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let src = root.join("src");
    let dst = root.join("dst");
    fs::write(&src, b"short").unwrap();
    fs::write(&dst, patterned(200)).unwrap();

    copier().copy(&src, &dst).unwrap();

    assert_eq!(fs::read(&dst).unwrap(), b"short");
}

#[test]
fn test_missing_source_leaves_no_destination() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let dst = root.join("nested/dst");

    let err = copier().copy(&root.join("missing"), &dst).unwrap_err();

    assert!(matches!(err, SError::IOError(_)));
    assert!(!dst.exists());
    assert!(!FileUtils::sibling(&dst, "partial").exists());
}

#[test]
fn test_failed_rename_removes_partial_file() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let src = root.join("src");
    let dst = root.join("dst");
    fs::write(&src, patterned(CHUNK * 2)).unwrap();
    fs::create_dir_all(dst.join("occupied")).unwrap();
    fs::write(dst.join("occupied/file"), b"x").unwrap();

    let err = copier().copy(&src, &dst).unwrap_err();

    assert!(matches!(err, SError::IOError(_)));
    assert!(dst.is_dir());
    assert!(!FileUtils::sibling(&dst, "partial").exists());
}

#[test]
fn test_cancelled_copy_keeps_destination() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let src = root.join("src");
    let dst = root.join("dst");
    fs::write(&src, patterned(CHUNK * 10)).unwrap();
    fs::write(&dst, b"before").unwrap();

    let cancel = AtomicBool::new(true);
    let err = copier().copy_cancellable(&src, &dst, &cancel).unwrap_err();

    assert_eq!(err, SError::Cancelled);
    assert_eq!(fs::read(&dst).unwrap(), b"before");
    assert!(!FileUtils::sibling(&dst, "partial").exists());
}

#[test]
fn test_default_copier_handles_large_file() {
    let temp = tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let src = root.join("big");
    let dst = root.join("big_copy");
    let data = patterned(3 * 1024 * 1024 + 5);
    fs::write(&src, &data).unwrap();

    BufferedCopier::default().copy(&src, &dst).unwrap();

    assert_eq!(hash_file(&dst).unwrap(), hash_bytes(&data));
}
