mod common;

use common::TestEnv;
use overlay_keeper_lib::core::content_registry::ContentRegistry;
use overlay_keeper_lib::core::registry::AppRegistry;
use overlay_keeper_lib::models::error::SError;
use overlay_keeper_lib::models::event::{ErrorKind, ModEvent};
use overlay_keeper_lib::models::mod_dto::{Mod, ModState};
use overlay_keeper_lib::models::paths::{ManagerPaths, TargetLayout};
use overlay_keeper_lib::models::registry_dto::RegistryDTO;
use overlay_keeper_lib::utils::context::EventSink;
use overlay_keeper_lib::utils::toml::Toml;

fn remote_mod(slug: &str) -> Mod {
    Mod {
        id: "10".into(),
        slug: slug.into(),
        name: slug.into(),
        source_url: "http://api.test/posts/10".into(),
        package_url: "http://cdn.test/x.zip".into(),
        ..Default::default()
    }
}

#[test]
fn test_absent_registry_requires_initialization() {
    let env = TestEnv::new();
    assert!(env.reopen().unwrap().is_none());
}

#[test]
fn test_malformed_registry_is_invalid() {
    let env = TestEnv::new();
    std::fs::create_dir_all(&env.home).unwrap();
    std::fs::write(env.home.join("registry.toml"), "target_root = [ not toml").unwrap();

    assert!(matches!(env.reopen(), Err(SError::InvalidRegistry(_))));
}

#[test]
fn test_registry_survives_reopen() {
    let env = TestEnv::new();
    let app = env.app();
    let url = env.publish(1, "pack", &[("a.ice", b"a")]);
    app.fetch_and_stage(&url).unwrap();
    app.install("pack").unwrap();
    drop(app);

    let reopened = env.reopen().unwrap().unwrap();
    let installed = reopened.installed_mods();

    assert_eq!(reopened.target_root(), env.target);
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].slug, "pack");
    assert_eq!(installed[0].files.len(), 1);
    assert!(!installed[0].broken);
}

#[test]
fn test_moved_target_root_invalidates_registry() {
    let env = TestEnv::new();
    drop(env.app());
    std::fs::remove_file(env.target.join("../../pso2.exe")).unwrap();

    assert!(matches!(env.reopen(), Err(SError::InvalidRegistry(_))));
}

#[test]
fn test_initialize_rejects_wrong_layout() {
    let env = TestEnv::new();
    let source = env.source.clone();

    let wrong_dir = env.target.parent().unwrap().to_owned();
    let err = AppRegistry::initialize(&env.settings, &wrong_dir, source.clone(), EventSink::disabled())
        .err()
        .unwrap();
    assert!(matches!(err, SError::InvalidTargetRoot(_)));

    let missing = env.target.join("nope/win32");
    let err = AppRegistry::initialize(&env.settings, &missing, source, EventSink::disabled())
        .err()
        .unwrap();
    assert!(matches!(err, SError::TargetRootMissing(_)));
}

#[test]
fn test_slugs_are_unique_across_lists() {
    let env = TestEnv::new();
    let paths = ManagerPaths::new(&env.home);
    let mut registry = ContentRegistry::create(
        &paths,
        &env.target,
        &TargetLayout::default(),
        EventSink::disabled(),
    )
    .unwrap();

    registry.add(remote_mod("pack")).unwrap();
    assert_eq!(
        registry.add(remote_mod("pack")).unwrap_err(),
        SError::DuplicateSlug("pack".into())
    );

    registry.move_to_installed(remote_mod("pack")).unwrap();
    assert!(matches!(
        registry.add(remote_mod("pack")),
        Err(SError::DuplicateSlug(_))
    ));
    assert_eq!(registry.find("pack").unwrap().0, ModState::Installed);
    assert!(registry.is_valid());
}

#[test]
fn test_registry_rejects_incomplete_mods() {
    let env = TestEnv::new();
    let paths = ManagerPaths::new(&env.home);
    let mut registry = ContentRegistry::create(
        &paths,
        &env.target,
        &TargetLayout::default(),
        EventSink::disabled(),
    )
    .unwrap();
    registry.add(remote_mod("kept")).unwrap();

    let mut no_package = remote_mod("pack");
    no_package.package_url.clear();
    let mut no_name = remote_mod("nameless");
    no_name.name = "  ".into();

    for m in [no_package, no_name] {
        assert!(matches!(
            registry.add(m.clone()),
            Err(SError::IncompleteRecord(_))
        ));
        assert!(matches!(
            registry.move_to_installed(m),
            Err(SError::IncompleteRecord(_))
        ));
    }

    let mut kept = remote_mod("kept");
    kept.id.clear();
    assert!(matches!(
        registry.update(kept),
        Err(SError::IncompleteRecord(_))
    ));

    assert!(registry.is_valid());
    let reloaded = ContentRegistry::load(&paths, &TargetLayout::default(), EventSink::disabled())
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.available().len(), 1);
    assert_eq!(reloaded.available()[0].id, "10");
}

#[test]
fn test_incomplete_record_on_disk_invalidates_registry() {
    let env = TestEnv::new();
    let paths = ManagerPaths::new(&env.home);
    let mut registry = ContentRegistry::create(
        &paths,
        &env.target,
        &TargetLayout::default(),
        EventSink::disabled(),
    )
    .unwrap();
    registry.add(remote_mod("pack")).unwrap();

    let mut dto: RegistryDTO = Toml::read(&paths.registry).unwrap();
    dto.available[0].package_url.clear();
    Toml::write(&paths.registry, &dto).unwrap();

    assert!(matches!(
        ContentRegistry::load(&paths, &TargetLayout::default(), EventSink::disabled()),
        Err(SError::InvalidRegistry(_))
    ));
}

#[test]
fn test_unwritable_registry_keeps_state_and_reports() {
    let mut env = TestEnv::new();
    let app = env.app();
    let registry_file = env.home.join("registry.toml");
    std::fs::remove_file(&registry_file).unwrap();
    std::fs::create_dir_all(registry_file.join("blocked")).unwrap();
    env.drain_events();

    let url = env.publish(1, "pack", &[("a.ice", b"a")]);
    app.fetch_and_stage(&url).unwrap();

    assert_eq!(app.available_mods().len(), 1);
    assert!(env.drain_events().iter().any(|e| matches!(
        e,
        ModEvent::Error {
            kind: ErrorKind::Persistence,
            ..
        }
    )));
}

#[test]
fn test_selected_details() {
    let env = TestEnv::new();
    let app = env.app();
    let url = env.publish(1, "pack", &[("a.ice", b"a")]);
    app.fetch_and_stage(&url).unwrap();

    assert!(app.selected_details().is_none());
    app.select(Some("pack".into()));

    let details = app.selected_details().unwrap();
    assert_eq!(details.state, ModState::Available);
    assert!(details
        .thumbnail_data
        .as_deref()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert!(details.can_install_uninstall);
    assert!(!details.can_update);
    assert!(details.can_view_online);
    assert_eq!(app.selected_mod().unwrap().slug, "pack");

    app.delete("pack").unwrap();
    assert!(app.selected_mod().is_none());
}
