//! Live query delivery

use knock_model::{RecordFields, VisitSymbol};
use knock_store::{CanvassStore, LiveQuery, QueryResult, RecordScope};
use knock_test_utils::{at, failing_store, seeded_store, Recorder};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn streets(result: &QueryResult) -> Vec<String> {
    result
        .as_records()
        .unwrap()
        .iter()
        .map(|r| r.street_name.clone())
        .collect()
}

#[test]
fn initial_result_delivered_on_subscribe() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();

    let _sub = store.subscribe(
        LiveQuery::Records(RecordScope::Territory(seed.territory.id)),
        recorder.observer(),
    );

    assert_eq!(recorder.count(), 1);
    assert_eq!(streets(&recorder.last().unwrap()), vec!["123 Main St"]);
}

#[test]
fn commit_redelivers_full_sorted_listing() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let scope = RecordScope::Territory(seed.territory.id);
    let _sub = store.subscribe(LiveQuery::Records(scope), recorder.observer());

    store
        .create_record(RecordFields::new("1 Alder Rd").in_territory(seed.territory.id))
        .unwrap();

    assert_eq!(recorder.count(), 2);
    assert_eq!(
        streets(&recorder.last().unwrap()),
        vec!["1 Alder Rd", "123 Main St"]
    );
}

#[test]
fn unrelated_commit_is_not_delivered() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let _sub = store.subscribe(
        LiveQuery::Records(RecordScope::Territory(seed.territory.id)),
        recorder.observer(),
    );

    store.create_record(RecordFields::new("9 Elm St")).unwrap();
    store.create_territory("West").unwrap();

    assert_eq!(recorder.count(), 1);
}

#[test]
fn door_sections_follow_visits() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let _sub = store.subscribe(LiveQuery::DoorSections(seed.record.id), recorder.observer());

    store
        .record_visit_at(seed.door.id, VisitSymbol::Busy, at(1))
        .unwrap();
    store
        .record_visit_at(seed.door.id, VisitSymbol::NotAtHome, at(2))
        .unwrap();

    let seen = recorder.all();
    assert_eq!(seen.len(), 3);
    let symbols: Vec<_> = seen
        .iter()
        .map(|r| r.as_door_sections().unwrap().symbol_of(seed.door.id))
        .collect();
    assert_eq!(
        symbols,
        vec![None, Some(VisitSymbol::Busy), Some(VisitSymbol::NotAtHome)]
    );
}

#[test]
fn dropped_subscription_stops_delivery() {
    let store = CanvassStore::in_memory();
    let recorder = Recorder::new();

    let sub = store.subscribe(LiveQuery::Territories, recorder.observer());
    assert_eq!(store.subscription_count(), 1);
    drop(sub);
    assert_eq!(store.subscription_count(), 0);

    store.create_territory("North").unwrap();
    assert_eq!(recorder.count(), 1);
}

#[test]
fn detached_subscription_needs_explicit_unsubscribe() {
    let store = CanvassStore::in_memory();
    let recorder = Recorder::new();

    let id = store
        .subscribe(LiveQuery::Territories, recorder.observer())
        .detach();
    store.create_territory("North").unwrap();
    assert_eq!(recorder.count(), 2);

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.create_territory("South").unwrap();
    assert_eq!(recorder.count(), 2);
}

#[test]
fn failed_commit_delivers_nothing() {
    let (store, backend) = failing_store();
    let recorder = Recorder::new();
    let _sub = store.subscribe(LiveQuery::Territories, recorder.observer());

    backend.fail_commits(true);
    assert!(store.create_territory("North").is_err());
    assert_eq!(recorder.count(), 1);

    backend.fail_commits(false);
    store.create_territory("North").unwrap();
    assert_eq!(recorder.count(), 2);
}

#[test]
fn observer_may_query_store() {
    let store = Arc::new(CanvassStore::in_memory());
    let counts = Arc::new(Mutex::new(Vec::new()));

    let inner = Arc::clone(&store);
    let sink = Arc::clone(&counts);
    let _sub = store.subscribe_territories(move |territories| {
        // re-entrant read while the delivery is running
        sink.lock().push((territories.len(), inner.stats().territories));
    });

    store.create_territory("North").unwrap();
    store.create_territory("South").unwrap();

    assert_eq!(*counts.lock(), vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn typed_record_subscription() {
    let (store, seed) = seeded_store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let _sub = store.subscribe_records(RecordScope::Unassigned, move |records| {
        sink.lock().push(records.len());
    });

    store.assign_record(seed.record.id, None).unwrap();
    assert_eq!(*seen.lock(), vec![0, 1]);
}

#[test]
fn typed_door_section_subscription() {
    let (store, seed) = seeded_store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let door = seed.door.id;

    let _sub = store.subscribe_door_sections(seed.record.id, move |grouping| {
        sink.lock().push(grouping.symbol_of(door));
    });

    store.record_visit(door, VisitSymbol::CallAgain).unwrap();
    assert_eq!(*seen.lock(), vec![None, Some(VisitSymbol::CallAgain)]);
}

#[test]
fn territory_delete_moves_records_between_live_listings() {
    let (store, seed) = seeded_store();
    let assigned = Recorder::new();
    let unassigned = Recorder::new();
    let _a = store.subscribe(
        LiveQuery::Records(RecordScope::Territory(seed.territory.id)),
        assigned.observer(),
    );
    let _u = store.subscribe(
        LiveQuery::Records(RecordScope::Unassigned),
        unassigned.observer(),
    );

    store.delete_territory(seed.territory.id).unwrap();

    assert!(assigned.last().unwrap().is_empty());
    assert_eq!(streets(&unassigned.last().unwrap()), vec!["123 Main St"]);
}

fn numbers(result: &QueryResult) -> Vec<String> {
    result
        .as_doors()
        .unwrap()
        .iter()
        .map(|d| d.number.clone())
        .collect()
}

#[test]
fn rename_resorts_record_listing() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let scope = RecordScope::Territory(seed.territory.id);
    store
        .create_record(RecordFields::new("200 Oak Ave").in_territory(seed.territory.id))
        .unwrap();
    let _sub = store.subscribe(LiveQuery::Records(scope), recorder.observer());
    assert_eq!(
        streets(&recorder.last().unwrap()),
        vec!["123 Main St", "200 Oak Ave"]
    );

    let renamed = RecordFields {
        street_name: "300 Main St".to_string(),
        ..seed.record.fields()
    };
    store.update_record(seed.record.id, renamed).unwrap();

    assert_eq!(recorder.count(), 2);
    assert_eq!(
        streets(&recorder.last().unwrap()),
        vec!["200 Oak Ave", "300 Main St"]
    );
}

#[test]
fn record_delete_is_delivered() {
    let (store, seed) = seeded_store();
    let records = Recorder::new();
    let doors = Recorder::new();
    let _r = store.subscribe(
        LiveQuery::Records(RecordScope::Territory(seed.territory.id)),
        records.observer(),
    );
    let _d = store.subscribe(LiveQuery::Doors(seed.record.id), doors.observer());

    store.delete_record(seed.record.id).unwrap();

    assert_eq!(records.count(), 2);
    assert!(records.last().unwrap().is_empty());
    assert_eq!(doors.count(), 2);
    assert!(doors.last().unwrap().as_doors().unwrap().is_empty());
}

#[test]
fn door_listing_follows_create_rename_delete() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let _sub = store.subscribe(LiveQuery::Doors(seed.record.id), recorder.observer());

    let ten = store.create_door(seed.record.id, "10").unwrap();
    let two = store.create_door(seed.record.id, "2").unwrap();
    assert_eq!(numbers(&recorder.last().unwrap()), vec!["2", "4B", "10"]);

    store.update_door(ten.id, "1").unwrap();
    assert_eq!(numbers(&recorder.last().unwrap()), vec!["1", "2", "4B"]);

    store.delete_door(two.id).unwrap();
    assert_eq!(numbers(&recorder.last().unwrap()), vec!["1", "4B"]);

    let seen: Vec<_> = recorder.all().iter().map(numbers).collect();
    assert_eq!(
        seen,
        vec![
            vec!["4B"],
            vec!["4B", "10"],
            vec!["2", "4B", "10"],
            vec!["1", "2", "4B"],
            vec!["1", "4B"],
        ]
    );
}

#[test]
fn visit_history_follows_visits_and_door_delete() {
    let (store, seed) = seeded_store();
    let recorder = Recorder::new();
    let _sub = store.subscribe(LiveQuery::Visits(seed.door.id), recorder.observer());

    store
        .record_visit_at(seed.door.id, VisitSymbol::NotAtHome, at(20))
        .unwrap();
    store
        .record_visit_at(seed.door.id, VisitSymbol::Busy, at(10))
        .unwrap();

    let symbols: Vec<_> = recorder
        .last()
        .unwrap()
        .as_visits()
        .unwrap()
        .iter()
        .map(|v| (v.symbol, v.timestamp))
        .collect();
    assert_eq!(
        symbols,
        vec![(VisitSymbol::Busy, at(10)), (VisitSymbol::NotAtHome, at(20))]
    );

    store.delete_door(seed.door.id).unwrap();
    assert_eq!(recorder.count(), 4);
    assert!(recorder.last().unwrap().as_visits().unwrap().is_empty());
}

#[test]
fn racing_commits_leave_observers_current() {
    let store = Arc::new(CanvassStore::in_memory());

    // first observer stalls inside its first post-initial delivery
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let gate = Mutex::new((entered_tx, release_rx));
    let calls = AtomicUsize::new(0);
    let first = Arc::new(Mutex::new(Vec::new()));
    let first_sink = Arc::clone(&first);
    let _slow = store.subscribe_territories(move |territories| {
        if calls.fetch_add(1, Ordering::SeqCst) == 1 {
            let gate = gate.lock();
            gate.0.send(()).unwrap();
            gate.1.recv().unwrap();
        }
        first_sink.lock().push(territories.len());
    });

    let second = Arc::new(Mutex::new(Vec::new()));
    let second_sink = Arc::clone(&second);
    let _fast = store.subscribe_territories(move |territories| {
        second_sink.lock().push(territories.len());
    });

    let north = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.create_territory("North").unwrap())
    };
    entered_rx.recv().unwrap();

    let south = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.create_territory("South").unwrap())
    };
    // give the second commit time to reach delivery
    thread::sleep(Duration::from_millis(50));
    release_tx.send(()).unwrap();

    north.join().unwrap();
    south.join().unwrap();

    let committed = store.list_territories().len();
    assert_eq!(committed, 2);
    for seen in [first.lock().clone(), second.lock().clone()] {
        assert_eq!(seen.last().copied(), Some(committed));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "went backwards: {seen:?}");
    }
}
