#![allow(clippy::unwrap_used, reason = "tests unwrap freely")]

use anchored_filters::{CuckooMap, FilterError};


#[test]
fn constructor_rejects_bad_fingerprint_width() {
    assert!(matches!(
        CuckooMap::new(16, 4, 0, 500),
        Err(FilterError::InvalidFingerprintWidth(0)),
    ));
    assert!(matches!(
        CuckooMap::new(16, 4, 12, 500),
        Err(FilterError::InvalidFingerprintWidth(12)),
    ));
    for bits in 1..=8 {
        assert!(CuckooMap::new(16, 4, bits, 500).is_ok());
    }
}

#[test]
fn empty_map_contains_nothing() {
    let map = CuckooMap::new(16, 4, 8, 500).unwrap();

    assert!(!map.contains(b""));
    assert!(!map.contains(b"foo"));
    assert!(!map.contains(b"bar"));
}

#[test]
fn second_insert_spills_to_the_overflow_chain() {
    // One bucket with one slot: the second insert must exhaust its single
    // kick and spill, and both keys must remain visible.
    let mut map = CuckooMap::new(1, 1, 8, 1).unwrap();

    assert!(map.insert(b"first"));
    assert!(map.insert(b"second"));
    assert!(map.contains(b"first"));
    assert!(map.contains(b"second"));
}

#[test]
fn insert_never_fails_even_with_no_kick_budget() {
    let mut map = CuckooMap::new(2, 1, 4, 0).unwrap();

    for i in 0_u32..200 {
        assert!(map.insert(format!("key-{i}").as_bytes()), "rejected key-{i}");
    }
    for i in 0_u32..200 {
        assert!(map.contains(format!("key-{i}").as_bytes()), "lost key-{i}");
    }
}

#[test]
fn insert_contains_erase_lifecycle() {
    let mut map = CuckooMap::new(64, 4, 8, 500).unwrap();

    assert!(map.insert(b"x"));
    assert!(map.contains(b"x"));
    assert!(map.erase(b"x"));
    assert!(!map.contains(b"x"));
    assert!(!map.erase(b"x"));
}

#[test]
fn supports_empty_key() {
    let mut map = CuckooMap::new(8, 2, 8, 100).unwrap();

    assert!(map.insert(b""));
    assert!(map.contains(b""));
    assert!(map.erase(b""));
    assert!(!map.contains(b""));
}

#[test]
fn erase_reaches_spilled_fingerprints() {
    let mut map = CuckooMap::new(1, 1, 8, 1).unwrap();
    let keys: [&[u8]; 3] = [b"first", b"second", b"third"];

    for key in keys {
        assert!(map.insert(key));
    }

    // Three entries live between the single slot and the chain; each erase
    // removes exactly one matching entry regardless of where it sits.
    for key in keys {
        assert!(map.erase(key), "failed to erase an entry");
    }
    for key in keys {
        assert!(!map.contains(key));
    }
}

#[test]
fn erased_slots_are_reused_before_spilling() {
    let mut map = CuckooMap::new(1, 1, 8, 1).unwrap();

    assert!(map.insert(b"first"));
    let occupied = map.size();

    assert!(map.erase(b"first"));
    assert!(map.insert(b"replacement"));

    // The replacement went into the freed primary slot, not a chain node.
    assert_eq!(map.size(), occupied);
}

#[test]
fn size_reports_bits_and_grows_per_spilled_node() {
    let map = CuckooMap::new(4, 2, 8, 10).unwrap();
    let head_link_bytes = std::mem::size_of::<usize>();
    assert_eq!(map.size(), 4 * (head_link_bytes + 2) * 8);

    let mut map = CuckooMap::new(1, 1, 8, 1).unwrap();
    let empty = map.size();

    assert!(map.insert(b"resident"));
    assert_eq!(map.size(), empty, "primary placement must not grow the footprint");

    assert!(map.insert(b"spilled"));
    let with_one_node = map.size();
    assert!(with_one_node > empty);

    assert!(map.insert(b"spilled-too"));
    let node_bits = with_one_node - empty;
    assert_eq!(map.size(), with_one_node + node_bits, "chain nodes must cost equal bits");
}

#[test]
fn seeded_maps_behave_deterministically() {
    let mut first = CuckooMap::new_seeded(4, 2, 8, 20, 0x5EED).unwrap();
    let mut second = CuckooMap::new_seeded(4, 2, 8, 20, 0x5EED).unwrap();

    for i in 0_u32..64 {
        let key = format!("key-{i}");
        first.insert(key.as_bytes());
        second.insert(key.as_bytes());
    }
    assert_eq!(first.size(), second.size(), "identically seeded maps diverged");
}
