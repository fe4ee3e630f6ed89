//! Adoption of untrusted bytes.

use dart_packet::{Error, Packet};

fn wire_bytes() -> Vec<u8> {
    let mut packet = Packet::object_from([
        ("id", Packet::integer(7)),
        ("name", Packet::string("payload")),
        ("xs", Packet::array_from([1_i64, 2]).unwrap()),
    ])
    .unwrap();
    packet.finalize().unwrap();
    packet.dup_bytes().unwrap()
}

#[test]
fn test_valid_bytes_adopt() {
    let bytes = wire_bytes();
    let packet = Packet::from_bytes(&bytes).unwrap();
    assert!(packet.is_finalized());
    assert_eq!(packet.get("id").unwrap().integer_value().unwrap(), 7);
}

#[test]
fn test_rewritten_length_rejected() {
    let mut bytes = wire_bytes();
    bytes[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
    match Packet::from_bytes(&bytes) {
        Err(Error::Validation(msg)) => assert!(msg.contains("length out of bounds")),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_truncated_bytes_rejected() {
    let bytes = wire_bytes();
    for cut in [0, 1, 4, 7, bytes.len() - 1] {
        assert!(
            matches!(Packet::from_bytes(&bytes[..cut]), Err(Error::Validation(_))),
            "cut at {cut} accepted"
        );
    }
}

#[test]
fn test_bad_type_tag_rejected() {
    let mut bytes = wire_bytes();
    // First vtable entry's type byte.
    bytes[12] = 0xEE;
    assert!(matches!(
        Packet::from_bytes(&bytes),
        Err(Error::Validation(msg)) if msg.contains("unknown type tag")
    ));
}

#[test]
fn test_garbage_rejected() {
    let garbage: Vec<u8> = (0..64).map(|i| (i * 37) as u8).collect();
    assert!(matches!(
        Packet::from_bytes(&garbage),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_every_single_byte_flip_is_handled() {
    // Any single-byte corruption must either be rejected or produce a
    // tree that can still be fully walked; it must never break memory
    // safety. (Flips inside string payloads, for instance, remain valid.)
    let bytes = wire_bytes();
    for at in 0..bytes.len() {
        let mut corrupt = bytes.clone();
        corrupt[at] ^= 0xA5;
        if let Ok(packet) = Packet::from_bytes(&corrupt) {
            let _ = packet.to_json();
        }
    }
}

#[test]
fn test_deep_nesting_bounded() {
    let mut packet = Packet::object_from([("leaf", 1_i64)]).unwrap();
    for _ in 0..64 {
        packet = Packet::object_from([("next", packet)]).unwrap();
    }
    packet.finalize().unwrap();
    // 65 levels round-trip fine; the validator only caps hostile depth.
    let adopted = Packet::from_bytes(packet.get_bytes().unwrap()).unwrap();
    assert_eq!(adopted, packet);
}
