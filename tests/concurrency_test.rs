// Shared store across threads: readers alongside a writer, and trace sessions excluding writers
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use geo_store::{ElementUpdate, GeoStore, GeographyType, Layer};

const SPOTS: [(f64, f64); 2] = [(0.0, 0.0), (1.0, 1.0)];

fn store_with_poles() -> Arc<GeoStore> {
    let store = GeoStore::default();
    let mut poles = Layer::new("POLE", GeographyType::Point);
    poles.is_electrical = true;
    store.upsert_layer(&poles).unwrap();
    store
        .upsert_element("POLE", &ElementUpdate::new("MOVER", 1).at(SPOTS[0].0, SPOTS[0].1))
        .unwrap();
    Arc::new(store)
}

#[test]
fn test_readers_see_consistent_index_while_writer_moves_element() {
    let store = store_with_poles();
    let writing = Arc::new(AtomicBool::new(true));

    let writer = {
        let store = Arc::clone(&store);
        let writing = Arc::clone(&writing);
        thread::spawn(move || {
            for version in 2..=400i64 {
                let (lat, lon) = SPOTS[(version % 2) as usize];
                store
                    .upsert_element("POLE", &ElementUpdate::new("MOVER", version).at(lat, lon))
                    .unwrap();
            }
            writing.store(false, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let writing = Arc::clone(&writing);
            thread::spawn(move || {
                let mut rounds = 0usize;
                while writing.load(Ordering::SeqCst) || rounds < 50 {
                    for (lat, lon) in SPOTS {
                        let mut hits = Vec::new();
                        let found = store.routing_hit_test(lat, lon, &mut hits, false).unwrap();
                        assert!(found <= 1);
                        // A hit always resolves to data that sits where the index said
                        for hit in &hits {
                            assert_eq!(hit.code, "MOVER");
                            assert_eq!((hit.points[0].latitude, hit.points[0].longitude), (lat, lon));
                        }
                    }
                    let snapshot = store.version_snapshot().unwrap();
                    assert!(snapshot.current <= 400);
                    rounds += 1;
                }
                rounds
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        assert!(reader.join().unwrap() >= 50);
    }

    assert_eq!(store.version().unwrap(), 400);
    let mover = store.element("MOVER").unwrap().unwrap();
    assert_eq!((mover.points[0].latitude, mover.points[0].longitude), SPOTS[0]);
}

#[test]
fn test_parallel_readers_all_complete() {
    let store = store_with_poles();
    let (ready_tx, ready_rx) = mpsc::channel();

    let barrier = Arc::new(std::sync::Barrier::new(4));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let ready_tx = ready_tx.clone();
            thread::spawn(move || {
                let mut hits = Vec::new();
                store.routing_hit_test(0.0, 0.0, &mut hits, false).unwrap();
                barrier.wait();
                assert_eq!(store.element("MOVER").unwrap().map(|e| e.version), Some(1));
                ready_tx.send(hits.len()).unwrap();
            })
        })
        .collect();
    drop(ready_tx);

    for _ in 0..4 {
        let hits = ready_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("reader stalled");
        assert_eq!(hits, 1);
    }
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_trace_session_holds_off_writers() {
    let store = store_with_poles();
    let (done_tx, done_rx) = mpsc::channel();

    let trace = store.begin_trace().unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            store
                .upsert_element("POLE", &ElementUpdate::new("MOVER", 2).at(SPOTS[1].0, SPOTS[1].1))
                .unwrap();
            done_tx.send(()).unwrap();
        })
    };

    // The writer cannot get in while the trace is open
    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
    let mut hits = Vec::new();
    assert_eq!(trace.hit_test(SPOTS[0].0, SPOTS[0].1, &mut hits, false), 1);
    drop(trace);

    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("writer resumes after the trace");
    writer.join().unwrap();

    let mut hits = Vec::new();
    assert_eq!(store.routing_hit_test(SPOTS[1].0, SPOTS[1].1, &mut hits, false).unwrap(), 1);
    assert_eq!(store.routing_hit_test(SPOTS[0].0, SPOTS[0].1, &mut hits, false).unwrap(), 0);
}
