// Read-side queries: elements by code and version, domains, display names
use geo_store::{DomainValue, ElementUpdate, GeoStore, GeographyType, Layer, LayerField, StoreConfig};

fn store_with_layers() -> GeoStore {
    let store = GeoStore::default();
    for code in ["A", "B"] {
        let mut layer = Layer::new(code, GeographyType::Point);
        layer.is_electrical = true;
        store.upsert_layer(&layer).unwrap();
    }
    store
}

#[test]
fn test_elements_since_walks_layers_in_order() {
    let store = store_with_layers();
    store.upsert_element("A", &ElementUpdate::new("a1", 1).at(0.0, 0.0)).unwrap();
    store.upsert_element("A", &ElementUpdate::new("a2", 3).at(0.0, 1.0)).unwrap();
    store.upsert_element("B", &ElementUpdate::new("b1", 2).at(0.0, 2.0)).unwrap();
    store.upsert_element("B", &ElementUpdate::new("b2", 1).at(0.0, 3.0)).unwrap();

    let codes: Vec<String> = store
        .elements_since(["B", "MISSING", "A"], 2)
        .unwrap()
        .map(|e| e.code)
        .collect();
    assert_eq!(codes, vec!["b1", "a2"]);

    // A fresh call starts over
    assert_eq!(store.elements_since(["A"], 0).unwrap().count(), 2);
    assert_eq!(store.elements_since(Vec::<String>::new(), 0).unwrap().count(), 0);

    store.upsert_element("A", &ElementUpdate::new("a3", 9)).unwrap();
    assert_eq!(store.elements_since(["A"], 9).unwrap().count(), 1);
}

#[test]
fn test_elements_since_allows_store_use_between_steps() {
    let store = store_with_layers();
    for (i, code) in ["a1", "a2", "a3"].iter().enumerate() {
        store
            .upsert_element("A", &ElementUpdate::new(*code, i as i64 + 1).at(0.0, i as f64))
            .unwrap();
    }

    let mut walk = store.elements_since(["A", "B"], 0).unwrap();
    let first = walk.next().expect("first element");
    assert_eq!(first.code, "a1");

    // Reads and writes on the same thread do not wait on the walk
    assert!(store.element("a2").unwrap().is_some());
    store
        .upsert_element("A", &ElementUpdate::new("a2", 10).at(5.0, 5.0))
        .unwrap();
    store
        .upsert_element("B", &ElementUpdate::new("b1", 4).at(6.0, 6.0))
        .unwrap();

    let rest: Vec<(String, i64)> = walk.map(|e| (e.code, e.version)).collect();
    assert_eq!(
        rest,
        vec![("a2".to_string(), 10), ("a3".to_string(), 3), ("b1".to_string(), 4)]
    );
}

#[test]
fn test_elements_since_does_not_block_waiting_writer() {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    let store = store_with_layers();
    store.upsert_element("A", &ElementUpdate::new("a1", 1)).unwrap();
    store.upsert_element("A", &ElementUpdate::new("a2", 1)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    thread::scope(|scope| {
        let mut walk = store.elements_since(["A"], 0).unwrap();
        assert!(walk.next().is_some());

        let writer = &store;
        scope.spawn(move || {
            writer
                .upsert_element("A", &ElementUpdate::new("a1", 2))
                .unwrap();
            done_tx.send(()).unwrap();
        });

        // The writer finishes while the walk is still alive
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("writer was blocked by an open walk");
        assert_eq!(store.element("a1").unwrap().unwrap().version, 2);
        assert_eq!(walk.next().map(|e| e.code), Some("a2".to_string()));
    });
}

#[test]
fn test_element_lookups() {
    let store = store_with_layers();
    store.upsert_element("A", &ElementUpdate::new("a1", 1)).unwrap();
    store.upsert_element("A", &ElementUpdate::new("a2", 1)).unwrap();
    store.upsert_element("B", &ElementUpdate::new("b1", 1)).unwrap();

    let found = store.elements_by_codes(["b1", "zz", "a1", "b1"]).unwrap();
    let codes: Vec<&str> = found.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["b1", "a1"]);

    let a1 = store.element("a1").unwrap().unwrap();
    assert_eq!(store.element_by_id(a1.id).unwrap().map(|e| e.code), Some("a1".to_string()));
    assert!(store.element_by_id(uuid::Uuid::new_v4()).unwrap().is_none());

    let of_a: Vec<String> = store.elements_of_layer("A").unwrap().into_iter().map(|e| e.code).collect();
    assert_eq!(of_a, vec!["a1", "a2"]);
    assert!(store.elements_of_layer("MISSING").unwrap().is_empty());

    assert_eq!(store.layer_element_count("A").unwrap(), Some(2));
    assert_eq!(store.layer_element_count("MISSING").unwrap(), None);
    assert_eq!(store.element_count().unwrap(), 3);

    let layers: Vec<String> = store
        .layers_by_codes(["B", "X", "A"])
        .unwrap()
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(layers, vec!["B", "A"]);
    assert_eq!(store.layer_codes().unwrap(), vec!["A", "B"]);
}

#[test]
fn test_colliding_element_id_is_replaced() {
    let store = store_with_layers();
    let mut first = ElementUpdate::new("a1", 1);
    first.id = uuid::Uuid::new_v4();
    store.upsert_element("A", &first).unwrap();

    let mut second = ElementUpdate::new("a2", 1);
    second.id = first.id;
    store.upsert_element("A", &second).unwrap();

    let a1 = store.element("a1").unwrap().unwrap();
    let a2 = store.element("a2").unwrap().unwrap();
    assert_eq!(a1.id, first.id);
    assert_ne!(a2.id, first.id);
}

#[test]
fn test_domain_lookup_with_wildcard() {
    let store = GeoStore::default();
    store
        .load_domain_values(&[
            DomainValue::new("All_Layers", "STATUS", 1, "Closed", 1),
            DomainValue::new("POLE", "OWNER", 7, "Utility", 1),
            DomainValue::new("SWITCH", "STATUS", 1, "Shut", 1),
        ])
        .unwrap();

    assert_eq!(store.domains().unwrap().len(), 3);
    let status = store.domain_for("POLE", "STATUS").unwrap().unwrap();
    assert_eq!(status.key(), "ALL_LAYERS.STATUS");
    let status = store.domain_for("SWITCH", "STATUS").unwrap().unwrap();
    assert_eq!(status.text_of(1), Some("Shut"));
    assert!(store.domain_for("POLE", "HEIGHT").unwrap().is_none());
    assert!(store.domain(" pole.owner ").unwrap().is_some());
}

#[test]
fn test_displayname_follows_fields_and_domains() {
    let store = GeoStore::default();
    store
        .upsert_domain_value(&DomainValue::new("POLE", "KIND", 2, "Concrete", 1))
        .unwrap();

    let mut poles = Layer::new("POLE", GeographyType::Point);
    poles.fields = vec![LayerField::new("NAME", "Name"), LayerField::new("KIND", "Kind")];
    poles.element_displayname_format = "{NAME} / {KIND}".to_string();
    store.upsert_layer(&poles).unwrap();

    store
        .upsert_element("POLE", &ElementUpdate::new("P1", 2).with_fields(r#"["North 4", 2]"#))
        .unwrap();
    assert_eq!(store.element("P1").unwrap().unwrap().displayname, "North 4 / Concrete");

    store
        .upsert_element("POLE", &ElementUpdate::new("P2", 2).with_fields("not json"))
        .unwrap();
    assert_eq!(store.element("P2").unwrap().unwrap().displayname, "P2");
}

#[test]
fn test_config_drives_store() {
    let config = StoreConfig::from_json_str(r#"{ "hit_tolerance": 0.5, "source_layer_code": "FEEDER" }"#)
        .unwrap();
    assert_eq!(config.wildcard_layer_code, "All_Layers");

    let store = GeoStore::new(config);
    let mut feeder = Layer::new("FEEDER", GeographyType::Point);
    feeder.is_electrical = true;
    store.upsert_layer(&feeder).unwrap();
    store.upsert_element("FEEDER", &ElementUpdate::new("F1", 1).at(0.0, 0.0)).unwrap();

    assert_eq!(store.routing_sources().unwrap().len(), 1);
    let mut hits = Vec::new();
    assert_eq!(store.routing_hit_test(0.4, 0.0, &mut hits, false).unwrap(), 1);

    assert!(StoreConfig::from_json_str(r#"{ "hit_tolerance": -1 }"#).is_err());
}
