// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Hot reload: generations are rebuilt off to the side and swapped in whole.

mod common;

use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{entry, standard_tree, SchemaTree, USER_AVSC};
use crossbeam_channel::{bounded, Receiver, Sender};
use schemacodec::{
    Parameters, RegistryError, ReloadManager, ReloadOutcome, ReloadState, SchemaRegistry,
};
use serde_json::Value;

fn manager(tree: &SchemaTree) -> ReloadManager {
    let registry = SchemaRegistry::open(tree.catalog_path(), tree.root()).unwrap();
    ReloadManager::new(Arc::new(registry))
}

fn catalog_json(tree: &SchemaTree) -> Value {
    serde_json::from_slice(&std::fs::read(tree.catalog_path()).unwrap()).unwrap()
}

fn add_schema(tree: &SchemaTree, id: &str) {
    tree.write_file(id, "user.avsc", USER_AVSC);
    let mut catalog = catalog_json(tree);
    catalog[id] = entry("user.avsc", "avro", &[]);
    tree.write_catalog(&catalog);
}

fn encode_user(registry: &SchemaRegistry, id: &str) -> Result<Vec<u8>, RegistryError> {
    let mut out = Vec::new();
    registry
        .encode(
            id,
            &mut r#"{"name": "a", "age": 1, "email": null}"#.as_bytes(),
            &mut out,
            &Parameters::new(),
        )
        .map(|_| out)
}

#[test]
fn test_unchanged_catalog_is_not_rebuilt() {
    let tree = standard_tree("reload_unchanged");
    let manager = manager(&tree);

    assert!(matches!(manager.poll_once(), ReloadOutcome::Unchanged));
    assert_eq!(manager.registry().snapshot().number(), 1);
    assert_eq!(manager.state(), ReloadState::Idle);
}

#[test]
fn test_changed_catalog_publishes_new_generation() {
    let tree = standard_tree("reload_changed");
    let manager = manager(&tree);
    let registry = Arc::clone(manager.registry());

    let before = registry.snapshot();
    assert!(matches!(
        encode_user(&registry, "user2"),
        Err(RegistryError::UnknownSchema { .. })
    ));

    add_schema(&tree, "user2");
    assert!(matches!(manager.poll_once(), ReloadOutcome::Reloaded(2)));
    assert_eq!(manager.state(), ReloadState::Idle);

    let after = registry.snapshot();
    assert_eq!(after.number(), 2);
    assert!(after.catalog().contains("user2"));
    assert!(encode_user(&registry, "user2").is_ok());

    // a snapshot taken before the swap still serves its own generation
    assert_eq!(before.number(), 1);
    assert!(!before.catalog().contains("user2"));
    assert!(matches!(
        before.registry().dispatch("user2"),
        Err(RegistryError::UnknownSchema { .. })
    ));

    assert!(matches!(manager.poll_once(), ReloadOutcome::Unchanged));
}

#[test]
fn test_broken_catalog_keeps_previous_generation() {
    let tree = standard_tree("reload_broken");
    let manager = manager(&tree);
    let registry = Arc::clone(manager.registry());
    let original = catalog_json(&tree);

    std::fs::write(tree.catalog_path(), b"{ \"user\": ").unwrap();
    match manager.poll_once() {
        ReloadOutcome::Failed(RegistryError::CatalogBuild { .. }) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(manager.state(), ReloadState::Failed);
    assert_eq!(registry.snapshot().number(), 1);
    assert!(encode_user(&registry, "user").is_ok());

    // the broken file is built again on every poll
    assert!(matches!(
        manager.poll_once(),
        ReloadOutcome::Failed(RegistryError::CatalogBuild { .. })
    ));
    assert_eq!(manager.state(), ReloadState::Failed);
    assert_eq!(registry.snapshot().number(), 1);

    tree.write_catalog(&original);
    add_schema(&tree, "user3");
    assert!(matches!(manager.poll_once(), ReloadOutcome::Reloaded(2)));
}

#[test]
fn test_restored_catalog_returns_to_idle() {
    let tree = standard_tree("reload_restored");
    let manager = manager(&tree);
    let path = tree.catalog_path();
    let original = std::fs::read(&path).unwrap();
    let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

    std::fs::write(&path, b"{ \"user\": ").unwrap();
    assert!(matches!(manager.poll_once(), ReloadOutcome::Failed(_)));

    // same bytes and timestamp as the file behind the current generation
    std::fs::write(&path, &original).unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
    assert!(matches!(manager.poll_once(), ReloadOutcome::Unchanged));
    assert_eq!(manager.state(), ReloadState::Idle);
    assert_eq!(manager.registry().snapshot().number(), 1);
}

/// Hands out `data` only after the test releases it, so a conversion can be
/// held open while the registry swaps generations.
struct GatedReader {
    data: &'static [u8],
    started: Option<Sender<()>>,
    release: Receiver<()>,
}

impl Read for GatedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(started) = self.started.take() {
            started.send(()).unwrap();
            self.release.recv().unwrap();
        }
        self.data.read(buf)
    }
}

#[test]
fn test_in_flight_request_finishes_on_its_generation() {
    let tree = standard_tree("reload_in_flight");
    let manager = manager(&tree);
    let registry = Arc::clone(manager.registry());

    let (started_tx, started_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let worker = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            let mut input = GatedReader {
                data: br#"{"name": "Ada", "age": 36, "email": null}"#,
                started: Some(started_tx),
                release: release_rx,
            };
            let mut out = Vec::new();
            registry
                .encode("user", &mut input, &mut out, &Parameters::new())
                .map(|_| out)
        })
    };

    // the request is now reading its input against generation 1
    started_rx.recv().unwrap();

    let mut catalog = catalog_json(&tree);
    catalog.as_object_mut().unwrap().remove("user");
    tree.write_catalog(&catalog);
    assert!(matches!(manager.force(), ReloadOutcome::Reloaded(2)));
    assert!(matches!(
        encode_user(&registry, "user"),
        Err(RegistryError::UnknownSchema { .. })
    ));

    release_tx.send(()).unwrap();
    let binary = worker.join().unwrap().unwrap();
    assert_eq!(binary, vec![0x06, b'A', b'd', b'a', 0x48, 0x00]);
    assert_eq!(registry.snapshot().number(), 2);
}

#[test]
fn test_force_rebuilds_unchanged_catalog() {
    let tree = standard_tree("reload_force");
    let manager = manager(&tree);

    assert!(matches!(manager.force(), ReloadOutcome::Reloaded(2)));
    assert!(matches!(manager.force(), ReloadOutcome::Reloaded(3)));
    assert!(matches!(manager.poll_once(), ReloadOutcome::Unchanged));
}

#[test]
fn test_background_thread_picks_up_changes() {
    let tree = standard_tree("reload_thread");
    let manager = Arc::new(manager(&tree));
    let handle = Arc::clone(&manager)
        .spawn(Duration::from_millis(20), Duration::ZERO)
        .unwrap();

    add_schema(&tree, "user4");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !manager.registry().snapshot().catalog().contains("user4") {
        assert!(Instant::now() < deadline, "reload not observed");
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.stop();

    assert!(manager.registry().snapshot().number() >= 2);
}
