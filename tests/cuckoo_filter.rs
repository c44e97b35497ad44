#![allow(clippy::unwrap_used, reason = "tests unwrap freely")]

use anchored_filters::{CuckooFilter, FilterError};


#[test]
fn constructor_rejects_bad_fingerprint_width() {
    assert!(matches!(
        CuckooFilter::new(16, 4, 0, 500),
        Err(FilterError::InvalidFingerprintWidth(0)),
    ));
    assert!(matches!(
        CuckooFilter::new(16, 4, 9, 500),
        Err(FilterError::InvalidFingerprintWidth(9)),
    ));
    for bits in 1..=8 {
        assert!(CuckooFilter::new(16, 4, bits, 500).is_ok());
    }
}

#[test]
fn empty_filter_contains_nothing() {
    let filter = CuckooFilter::new(16, 4, 8, 500).unwrap();

    assert!(!filter.contains(b""));
    assert!(!filter.contains(b"foo"));
    assert!(!filter.contains(b"bar"));
}

#[test]
fn insert_contains_erase_lifecycle() {
    let mut filter = CuckooFilter::new(16, 4, 8, 500).unwrap();

    assert!(filter.insert(b"x"));
    assert!(filter.contains(b"x"));
    assert!(filter.erase(b"x"));
    assert!(!filter.contains(b"x"));
    assert!(!filter.erase(b"x"));
}

#[test]
fn supports_empty_key() {
    let mut filter = CuckooFilter::new(8, 2, 8, 100).unwrap();

    assert!(filter.insert(b""));
    assert!(filter.contains(b""));
    assert!(filter.erase(b""));
    assert!(!filter.contains(b""));
}

#[test]
fn no_false_negatives_at_moderate_load() {
    let mut filter = CuckooFilter::new(1024, 4, 8, 500).unwrap();

    for i in 0_u32..1000 {
        assert!(filter.insert(format!("key-{i}").as_bytes()), "rejected key-{i}");
    }
    for i in 0_u32..1000 {
        assert!(filter.contains(format!("key-{i}").as_bytes()), "lost key-{i}");
    }
}

#[test]
fn saturated_filter_rejects_inserts() {
    // Four slots total; most of a hundred distinct keys cannot fit.
    let mut filter = CuckooFilter::new(2, 2, 8, 10).unwrap();

    let mut accepted = 0_u32;
    for i in 0_u32..100 {
        if filter.insert(format!("key-{i}").as_bytes()) {
            accepted += 1;
        }
    }

    assert!(accepted < 100, "a four-slot filter accepted every key");
}

#[test]
fn erase_only_removes_one_occurrence() {
    let mut filter = CuckooFilter::new(16, 4, 8, 500).unwrap();

    // The same key inserted twice occupies two slots with the same
    // fingerprint; each erase clears exactly one of them.
    assert!(filter.insert(b"dup"));
    assert!(filter.insert(b"dup"));

    assert!(filter.erase(b"dup"));
    assert!(filter.contains(b"dup"));
    assert!(filter.erase(b"dup"));
    assert!(!filter.contains(b"dup"));
}

#[test]
fn size_reports_table_bytes() {
    let filter = CuckooFilter::new(16, 4, 8, 500).unwrap();
    assert_eq!(filter.size(), 16 * 4);

    let filter = CuckooFilter::new(7, 3, 5, 10).unwrap();
    assert_eq!(filter.size(), 21);
}

#[test]
fn works_with_non_power_of_two_bucket_counts() {
    // Exercises the XOR-then-modulo alternate-bucket derivation, which is
    // not an involution for bucket counts like 13. Kept well below eviction
    // pressure: once kicks start, a displaced fingerprint may legally end up
    // outside its key's candidate pair.
    let mut filter = CuckooFilter::new(13, 4, 8, 500).unwrap();

    for i in 0_u32..8 {
        assert!(filter.insert(format!("np2-{i}").as_bytes()));
    }
    for i in 0_u32..8 {
        assert!(filter.contains(format!("np2-{i}").as_bytes()));
    }
    for i in 0_u32..8 {
        assert!(filter.erase(format!("np2-{i}").as_bytes()));
    }
}

#[test]
fn seeded_filters_evict_deterministically() {
    let mut first = CuckooFilter::new_seeded(4, 2, 8, 20, 0x5EED).unwrap();
    let mut second = CuckooFilter::new_seeded(4, 2, 8, 20, 0x5EED).unwrap();

    for i in 0_u32..64 {
        let key = format!("key-{i}");
        assert_eq!(
            first.insert(key.as_bytes()),
            second.insert(key.as_bytes()),
            "identically seeded filters diverged on key-{i}",
        );
    }
}
