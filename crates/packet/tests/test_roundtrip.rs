//! Representation round trips and canonical encoding.

use dart_packet::{Heap, LocalPacket, Packet};

fn sample() -> Packet {
    Packet::object_from([
        ("name", Packet::string("dart")),
        ("count", Packet::integer(70_000)),
        ("big", Packet::integer(1_i64 << 40)),
        ("ratio", Packet::decimal(0.125)),
        ("flag", Packet::boolean(false)),
        ("nothing", Packet::null()),
        (
            "items",
            Packet::array_from([
                Packet::integer(1),
                Packet::string("two"),
                Packet::decimal(3.0),
            ])
            .unwrap(),
        ),
        (
            "nested",
            Packet::object_from([("inner", Packet::string("value"))]).unwrap(),
        ),
    ])
    .unwrap()
}

#[test]
fn test_bytes_round_trip_is_byte_identical() {
    let mut packet = sample();
    packet.finalize().unwrap();
    let bytes = packet.dup_bytes().unwrap();

    let adopted = Packet::from_bytes(&bytes).unwrap();
    assert_eq!(adopted.get_bytes().unwrap(), &bytes[..]);
    assert_eq!(adopted, packet);
}

#[test]
fn test_finalize_definalize_preserves_value() {
    let original = sample();
    let mut packet = original.clone();
    packet.finalize().unwrap();
    assert_eq!(packet, original);
    packet.definalize();
    assert_eq!(packet, original);
    // A second cycle stays stable.
    packet.finalize().unwrap();
    assert_eq!(packet, original);
}

#[test]
fn test_equal_heaps_share_one_encoding() {
    // Same logical object assembled in three different orders and ways.
    let mut a = Packet::object_from([("x", 1_i64), ("yy", 2_i64), ("z", 3_i64)]).unwrap();

    let mut b = Packet::object();
    b.insert("z", 3_i64).unwrap();
    b.insert("x", 9_i64).unwrap();
    b.insert("yy", 2_i64).unwrap();
    b.insert("x", 1_i64).unwrap();

    let mut c = Packet::object_from([("x", 1_i64), ("yy", 2_i64)]).unwrap();
    c.insert("z", 3_i64).unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    a.finalize().unwrap();
    b.finalize().unwrap();
    c.finalize().unwrap();
    assert_eq!(a.get_bytes().unwrap(), b.get_bytes().unwrap());
    assert_eq!(b.get_bytes().unwrap(), c.get_bytes().unwrap());
}

#[test]
fn test_insert_then_erase_restores_state() {
    let mut packet = sample();
    let before = packet.clone();
    packet.insert("temporary", "gone soon").unwrap();
    assert_ne!(packet, before);
    packet.erase("temporary").unwrap();
    assert_eq!(packet, before);

    // Same invariant across a finalize boundary.
    let mut packet = sample();
    packet.finalize().unwrap();
    let frozen = packet.clone();
    packet.insert("temporary", 1_i64).unwrap();
    packet.erase("temporary").unwrap();
    assert_eq!(packet, frozen);
}

#[test]
fn test_cross_policy_round_trip() {
    let mut atomic = sample();
    atomic.finalize().unwrap();
    let local = LocalPacket::from_bytes(atomic.get_bytes().unwrap()).unwrap();
    assert_eq!(local, atomic);
    assert_eq!(local.get_bytes().unwrap(), atomic.get_bytes().unwrap());
}

#[test]
fn test_long_strings_round_trip() {
    // Past the u16 length field the writer switches to the wide string
    // layout; both survive the full wire cycle.
    let medium = "m".repeat(u16::MAX as usize);
    let huge = "h".repeat(u16::MAX as usize + 1);
    let mut packet = Packet::object_from([
        ("medium", Packet::string(&medium)),
        ("huge", Packet::string(&huge)),
    ])
    .unwrap();
    packet.finalize().unwrap();

    let adopted = Packet::from_bytes(packet.get_bytes().unwrap()).unwrap();
    assert_eq!(adopted.get("medium").unwrap().string_view().unwrap(), medium);
    assert_eq!(adopted.get("huge").unwrap().string_view().unwrap(), huge);
    assert_eq!(adopted, packet);
}

#[test]
fn test_many_keys_keep_order() {
    let mut packet = Packet::object();
    for i in (0..100).rev() {
        packet.insert(format!("key{i:03}"), i as i64).unwrap();
    }
    packet.finalize().unwrap();

    let keys = packet.keys().unwrap();
    assert_eq!(keys.len(), 100);
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    for i in 0..100 {
        assert_eq!(
            packet
                .get(format!("key{i:03}"))
                .unwrap()
                .integer_value()
                .unwrap(),
            i as i64
        );
    }
}

#[test]
fn test_definalized_heap_matches_source_heap() {
    let mut packet = sample();
    packet.finalize().unwrap();
    packet.definalize();

    let rebuilt: Heap = packet.as_heap().unwrap().clone();
    assert_eq!(rebuilt, sample());
    assert_eq!(
        rebuilt.get_nested("nested.inner").string_copy().unwrap(),
        "value"
    );
}
