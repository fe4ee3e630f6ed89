//! Merge and projection, on both representations.

use dart_packet::Packet;

#[test]
fn test_inject_overlay() {
    let base = Packet::object_from([("x", 1_i64), ("y", 2_i64)]).unwrap();
    let merged = base.inject([("y", 20_i64), ("z", 30_i64)]).unwrap();

    assert_eq!(merged.get("x").unwrap().integer_value().unwrap(), 1);
    assert_eq!(merged.get("y").unwrap().integer_value().unwrap(), 20);
    assert_eq!(merged.get("z").unwrap().integer_value().unwrap(), 30);
    assert_eq!(merged.size().unwrap(), 3);
}

#[test]
fn test_finalized_inject_matches_from_scratch_bytes() {
    let mut base = Packet::object_from([("x", 1_i64), ("y", 2_i64)]).unwrap();
    base.finalize().unwrap();
    let merged = base.inject([("y", 20_i64), ("z", 30_i64)]).unwrap();
    assert!(merged.is_finalized());

    let mut expected =
        Packet::object_from([("x", 1_i64), ("y", 20_i64), ("z", 30_i64)]).unwrap();
    expected.finalize().unwrap();
    assert_eq!(merged.get_bytes().unwrap(), expected.get_bytes().unwrap());
}

#[test]
fn test_inject_duplicate_incoming_keys_last_wins() {
    for finalized in [false, true] {
        let mut base = Packet::object_from([("k", 1_i64)]).unwrap();
        if finalized {
            base.finalize().unwrap();
        }
        let merged = base
            .inject([("k", 2_i64), ("k", 3_i64), ("other", 4_i64)])
            .unwrap();
        assert_eq!(merged.get("k").unwrap().integer_value().unwrap(), 3);
        assert_eq!(merged.size().unwrap(), 2);
    }
}

#[test]
fn test_inject_composes_for_disjoint_sets() {
    let base = Packet::object_from([("h", 0_i64)]).unwrap();
    let a = [("a1", 1_i64), ("a2", 2_i64)];
    let b = [("b1", 10_i64), ("b2", 20_i64)];

    let chained = base.inject(a).unwrap().inject(b).unwrap();
    let merged_pairs = a.iter().chain(b.iter()).copied();
    let at_once = base.inject(merged_pairs).unwrap();
    assert_eq!(chained, at_once);
}

#[test]
fn test_inject_into_larger_finalized_object() {
    let mut base = Packet::object_from([
        ("alpha", Packet::string("one")),
        ("beta", Packet::array_from([1_i64, 2, 3]).unwrap()),
        ("gamma", Packet::decimal(2.5)),
        ("delta", Packet::object_from([("d", true)]).unwrap()),
    ])
    .unwrap();
    base.finalize().unwrap();

    let merged = base
        .inject([
            ("beta", Packet::string("replaced")),
            ("epsilon", Packet::integer(5)),
        ])
        .unwrap();

    let mut expected = Packet::object_from([
        ("alpha", Packet::string("one")),
        ("beta", Packet::string("replaced")),
        ("gamma", Packet::decimal(2.5)),
        ("delta", Packet::object_from([("d", true)]).unwrap()),
        ("epsilon", Packet::integer(5)),
    ])
    .unwrap();
    expected.finalize().unwrap();
    assert_eq!(merged.get_bytes().unwrap(), expected.get_bytes().unwrap());
}

#[test]
fn test_project_subset() {
    for finalized in [false, true] {
        let mut packet = Packet::object_from([
            ("keep", 1_i64),
            ("drop", 2_i64),
            ("also", 3_i64),
        ])
        .unwrap();
        if finalized {
            packet.finalize().unwrap();
        }
        let projected = packet.project(["keep", "also", "missing", "keep"]).unwrap();
        assert_eq!(projected.size().unwrap(), 2);
        assert_eq!(projected.get("keep").unwrap().integer_value().unwrap(), 1);
        assert_eq!(projected.get("also").unwrap().integer_value().unwrap(), 3);
        assert!(!projected.has_key("drop"));
        assert_eq!(projected.is_finalized(), finalized);
    }
}

#[test]
fn test_finalized_project_matches_from_scratch_bytes() {
    let mut packet = Packet::object_from([
        ("a", Packet::integer(1)),
        ("b", Packet::string("two")),
        ("c", Packet::decimal(3.0)),
    ])
    .unwrap();
    packet.finalize().unwrap();
    let projected = packet.project(["a", "c"]).unwrap();

    let mut expected =
        Packet::object_from([("a", Packet::integer(1)), ("c", Packet::decimal(3.0))]).unwrap();
    expected.finalize().unwrap();
    assert_eq!(
        projected.get_bytes().unwrap(),
        expected.get_bytes().unwrap()
    );
}

#[test]
fn test_inject_on_non_object_fails() {
    let packet = Packet::array_from([1_i64]).unwrap();
    assert!(packet.inject([("k", 1_i64)]).is_err());
    assert!(packet.project(["k"]).is_err());
}
