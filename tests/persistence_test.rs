// Save callbacks, dirty tracking and the initialization protocol
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use geo_store::store::EntityKind;
use geo_store::{
    DirtyEntity, DomainValue, ElementUpdate, FnPersistence, GeoStore, GeographyType, Layer, StoreError,
};

fn poles() -> Layer {
    let mut layer = Layer::new("POLE", GeographyType::Point);
    layer.is_electrical = true;
    layer
}

#[test]
fn test_no_saves_before_initial_load_ends() {
    let saves = Arc::new(AtomicUsize::new(0));
    let store = GeoStore::default();
    store.begin_initial().unwrap();
    store.load_layers(&[poles()]).unwrap();
    store
        .load_elements("POLE", &[ElementUpdate::new("P1", 1).at(1.0, 1.0)])
        .unwrap();

    let counter = saves.clone();
    store
        .end_initial(FnPersistence::new(
            |_| Ok(()),
            |_| Ok(()),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ))
        .unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 0);

    store
        .upsert_element("POLE", &ElementUpdate::new("P1", 2).at(1.0, 1.0))
        .unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 1);

    // Rejected mutations are not saved
    assert!(store.upsert_element("POLE", &ElementUpdate::new("P1", 1)).is_err());
    assert_eq!(saves.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_save_keeps_mutation_and_marks_dirty() {
    let failing = Arc::new(AtomicBool::new(true));
    let saved: Arc<Mutex<Vec<String>>> = Arc::default();

    let store = GeoStore::default();
    store.upsert_layer(&poles()).unwrap();

    let fail = failing.clone();
    let log = saved.clone();
    store
        .end_initial(FnPersistence::new(
            |_| Ok(()),
            |_| Ok(()),
            move |element| {
                if fail.load(Ordering::SeqCst) {
                    anyhow::bail!("disk full");
                }
                log.lock().unwrap().push(format!("{}@{}", element.code, element.version));
                Ok(())
            },
        ))
        .unwrap();

    let err = store
        .upsert_element("POLE", &ElementUpdate::new("P1", 4).at(1.0, 1.0))
        .unwrap_err();
    match &err {
        StoreError::Persistence { kind, key, message } => {
            assert_eq!(*kind, EntityKind::Element);
            assert_eq!(key, "P1");
            assert!(message.contains("disk full"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!err.is_fatal());

    // Applied in memory all the same
    assert_eq!(store.element("P1").unwrap().unwrap().version, 4);
    assert_eq!(store.version().unwrap(), 4);
    assert_eq!(
        store.dirty_entities().unwrap(),
        vec![DirtyEntity {
            kind: EntityKind::Element,
            key: "P1".to_string()
        }]
    );

    failing.store(false, Ordering::SeqCst);
    store
        .upsert_element("POLE", &ElementUpdate::new("P1", 4).at(1.0, 1.0))
        .expect("resend saves");
    assert!(store.dirty_entities().unwrap().is_empty());
    assert_eq!(*saved.lock().unwrap(), vec!["P1@4".to_string()]);
}

#[test]
fn test_domain_value_save_failure() {
    let store = GeoStore::default();
    store
        .end_initial(FnPersistence::new(
            |_| Ok(()),
            |_| anyhow::bail!("offline"),
            |_| Ok(()),
        ))
        .unwrap();

    let err = store
        .upsert_domain_value(&DomainValue::new("pole", "owner", 3, "Utility", 1))
        .unwrap_err();
    assert_eq!(err.to_string(), "persisting domain value POLE.OWNER#3 failed: offline");
    assert_eq!(store.domain("POLE.OWNER").unwrap().unwrap().text_of(3), Some("Utility"));

    store.begin_initial().unwrap();
    assert!(store.dirty_entities().unwrap().is_empty());
}

#[test]
fn test_layer_saves_on_every_upsert() {
    let saves = Arc::new(AtomicUsize::new(0));
    let counter = saves.clone();
    let store = GeoStore::default();
    store
        .end_initial(FnPersistence::new(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |_| Ok(()),
            |_| Ok(()),
        ))
        .unwrap();

    store.upsert_layer(&poles()).unwrap();
    store.upsert_layer(&poles()).unwrap();
    store
        .upsert_layer_field("POLE", &geo_store::LayerField::new("NAME", "Name"))
        .unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 3);
}

#[test]
fn test_bulk_load_counts_failed_saves_as_applied() {
    let store = GeoStore::default();
    store.upsert_layer(&poles()).unwrap();
    store
        .end_initial(FnPersistence::new(
            |_| Ok(()),
            |_| Ok(()),
            |element| {
                if element.code == "BAD" {
                    anyhow::bail!("disk full");
                }
                Ok(())
            },
        ))
        .unwrap();

    let summary = store
        .load_elements(
            "POLE",
            &[
                ElementUpdate::new("OK", 2).at(1.0, 1.0),
                ElementUpdate::new("BAD", 2).at(2.0, 2.0),
                ElementUpdate::new("OK", 1).at(3.0, 3.0),
            ],
        )
        .unwrap();
    assert_eq!((summary.applied, summary.rejected, summary.unsaved), (2, 1, 1));
    assert_eq!(store.element("BAD").unwrap().unwrap().version, 2);
    assert_eq!(
        store.dirty_entities().unwrap(),
        vec![DirtyEntity {
            kind: EntityKind::Element,
            key: "BAD".to_string()
        }]
    );
}
