use crate::models::error::SError;
use crate::utils::file::FileUtils;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_RING_SLOTS: usize = 10;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CopySettings {
    pub chunk_size: usize,
    pub ring_slots: usize,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            ring_slots: DEFAULT_RING_SLOTS,
        }
    }
}

enum Chunk {
    Data(Vec<u8>, usize),
    Failed(io::Error),
    Cancelled,
}

/// Single-file copy through a fixed ring of buffers shared by a reader and a writer thread.
///
/// Peak memory is `chunk_size * ring_slots` regardless of file size. Filled buffers travel
/// reader -> writer and emptied ones travel back, both over bounded channels, so each side
/// blocks instead of spinning when the other falls behind.
///
/// The destination only ever changes by a rename of a fully written temp sibling.
#[derive(Clone, Copy, Debug)]
pub struct BufferedCopier {
    chunk_size: usize,
    ring_slots: usize,
}

impl Default for BufferedCopier {
    fn default() -> Self {
        Self::new(CopySettings::default())
    }
}

impl BufferedCopier {
    pub fn new(settings: CopySettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            ring_slots: settings.ring_slots.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.chunk_size * self.ring_slots
    }

    pub fn copy(&self, source: &Utf8Path, destination: &Utf8Path) -> Result<u64, SError> {
        self.copy_cancellable(source, destination, &AtomicBool::new(false))
    }

    pub fn copy_cancellable(
        &self,
        source: &Utf8Path,
        destination: &Utf8Path,
        cancel: &AtomicBool,
    ) -> Result<u64, SError> {
        let input = File::open(source)?;
        FileUtils::ensure_parent(destination)?;

        let partial = FileUtils::sibling(destination, "partial");
        let output = File::create(&partial)?;

        let result = self.pump(input, output, cancel).and_then(|written| {
            std::fs::rename(&partial, destination)?;
            Ok(written)
        });

        match result {
            Ok(written) => {
                debug!("copied {written} bytes {source} -> {destination}");
                Ok(written)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                Err(e)
            }
        }
    }

    fn pump(&self, input: File, mut output: File, cancel: &AtomicBool) -> Result<u64, SError> {
        let (filled_tx, filled_rx) = sync_channel::<Chunk>(self.ring_slots);
        let (free_tx, free_rx) = sync_channel::<Vec<u8>>(self.ring_slots);

        for _ in 0..self.ring_slots {
            // Cannot block: the channel holds exactly ring_slots items.
            let _ = free_tx.send(vec![0u8; self.chunk_size]);
        }

        let chunk_size = self.chunk_size;
        let written = thread::scope(|scope| {
            scope.spawn(move || read_side(input, chunk_size, filled_tx, free_rx, cancel));
            write_side(&mut output, filled_rx, free_tx)
        })?;

        output.sync_all()?;
        Ok(written)
    }
}

fn read_side(
    mut input: File,
    chunk_size: usize,
    filled: SyncSender<Chunk>,
    free: Receiver<Vec<u8>>,
    cancel: &AtomicBool,
) {
    // recv fails once the writer has given up; that ends the reader too.
    while let Ok(mut buf) = free.recv() {
        if cancel.load(Ordering::Relaxed) {
            let _ = filled.send(Chunk::Cancelled);
            return;
        }

        let len = match read_full(&mut input, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                let _ = filled.send(Chunk::Failed(e));
                return;
            }
        };

        if len == 0 {
            return;
        }
        if filled.send(Chunk::Data(buf, len)).is_err() || len < chunk_size {
            return;
        }
    }
}

fn write_side(
    output: &mut File,
    filled: Receiver<Chunk>,
    free: SyncSender<Vec<u8>>,
) -> Result<u64, SError> {
    let mut written = 0u64;
    // Ends when the reader drops its sender after the last chunk.
    for chunk in filled {
        match chunk {
            Chunk::Data(buf, len) => {
                output.write_all(&buf[..len])?;
                written += len as u64;
                let _ = free.send(buf);
            }
            Chunk::Failed(e) => return Err(e.into()),
            Chunk::Cancelled => return Err(SError::Cancelled),
        }
    }
    Ok(written)
}

/// Fills `buf` unless EOF comes first; short reads from the OS are retried.
fn read_full(input: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
