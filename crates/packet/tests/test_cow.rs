//! Sharing, copy-on-write, and cross-thread behavior.

use dart_packet::{Heap, Packet};

#[test]
fn test_cow_isolates_clones() {
    let mut a = Heap::object_from([("k", Heap::integer(1))]).unwrap();
    let b = a.clone();
    assert_eq!(a.use_count(), Some(2));
    assert_eq!(b.use_count(), Some(2));

    a.insert("k", Heap::integer(2)).unwrap();

    assert_eq!(a.at("k").unwrap().integer_value().unwrap(), 2);
    assert_eq!(b.at("k").unwrap().integer_value().unwrap(), 1);
    // Each side owns its container exclusively after the copy.
    assert_eq!(a.use_count(), Some(1));
    assert_eq!(b.use_count(), Some(1));
}

#[test]
fn test_clones_stay_equal_until_mutation() {
    let a = Heap::object_from([("list", Heap::array_from([Heap::integer(1)]))]).unwrap();
    let b = a.clone();
    assert_eq!(a, b);

    let mut c = b.clone();
    c.insert("extra", Heap::null()).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_shared_subtree_mutation_is_isolated() {
    let inner = Heap::array_from([Heap::integer(1), Heap::integer(2)]);
    let a = Heap::object_from([("xs", inner.clone())]).unwrap();
    let b = Heap::object_from([("xs", inner)]).unwrap();

    // Both objects share the same element vector until one writes.
    let mut a_mut = a.clone();
    let mut xs = a_mut.at("xs").unwrap();
    xs.push_back(Heap::integer(3)).unwrap();
    a_mut.insert("xs", xs).unwrap();

    assert_eq!(a_mut.at("xs").unwrap().size().unwrap(), 3);
    assert_eq!(a.at("xs").unwrap().size().unwrap(), 2);
    assert_eq!(b.at("xs").unwrap().size().unwrap(), 2);
}

#[test]
fn test_erase_after_insert_returns_to_sole_ownership() {
    let mut packet = Packet::object_from([("k", 1_i64)]).unwrap();
    let snapshot = packet.clone();

    packet.insert("extra", 2_i64).unwrap();
    packet.erase("extra").unwrap();
    assert_eq!(packet, snapshot);

    let heap = packet.as_heap().unwrap();
    assert_eq!(heap.use_count(), Some(1));
}

#[test]
fn test_finalized_buffer_crosses_threads() {
    let mut packet = Packet::object_from([("payload", "shared across threads")])
        .unwrap();
    packet.finalize().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let view = packet.clone();
            std::thread::spawn(move || {
                view.get("payload").unwrap().string_copy().unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "shared across threads");
    }
    // The original still owns valid bytes after all readers dropped.
    assert!(packet.get_bytes().unwrap().len() > 8);
}

#[test]
fn test_heap_packet_crosses_threads_by_move() {
    let packet = Packet::object_from([("n", 9_i64)]).unwrap();
    let moved = std::thread::spawn(move || packet.get("n").unwrap().integer_value().unwrap())
        .join()
        .unwrap();
    assert_eq!(moved, 9);
}
