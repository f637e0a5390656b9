use crate::{BASE_LEN, Directory, Isbn13, Prefix, is_valid};
use serde_json::{Value, json};

fn directory(value: Value) -> Directory {
    Directory::from_json_str(&value.to_string()).unwrap()
}

fn block(pub_min: &str, pub_max: &str, pubn: Option<(&str, &str)>) -> Value {
    json!({
        "publisher_range": { "min": pub_min, "max": pub_max },
        "publication_range": {
            "min": pubn.map(|(min, _)| min),
            "max": pubn.map(|(_, max)| max),
        },
        "is_unallocated": false,
    })
}

fn base(s: &str) -> [u8; BASE_LEN] {
    s.as_bytes().try_into().unwrap()
}

/// A cut-down version of the real 978 table.
fn bookland() -> Directory {
    directory(json!({
        "978": {
            "0": {
                "agency": "English language",
                "allocation_blocks": [
                    block("00", "19", Some(("000000", "999999"))),
                    block("200", "699", Some(("00000", "99999"))),
                    block("7000", "8499", Some(("0000", "9999"))),
                ]
            },
            "99937": {
                "agency": "Macau",
                "allocation_blocks": [
                    block("0", "1", Some(("000", "999"))),
                    block("20", "59", Some(("00", "99"))),
                ]
            },
        }
    }))
}

#[test]
fn accepts_published_isbn() {
    let dir = bookland();
    let isbn: Isbn13 = "9780306406157".parse().unwrap();
    assert!(dir.is_valid(&isbn));
    assert!(is_valid(isbn.base(), &dir));
}

#[test]
fn publisher_bounds_are_inclusive() {
    let dir = bookland();
    assert!(dir.is_valid_base(&base("978000000000")));
    assert!(dir.is_valid_base(&base("978019999999")));
    assert!(dir.is_valid_base(&base("978020000000")));
    assert!(dir.is_valid_base(&base("978069999999")));
    assert!(dir.is_valid_base(&base("978084999999")));
    // 85000 and up is not allocated in this cut-down table.
    assert!(!dir.is_valid_base(&base("978085000000")));
    assert!(!dir.is_valid_base(&base("978099999999")));
}

#[test]
fn unknown_prefix_is_rejected() {
    let dir = bookland();
    assert!(!dir.is_valid_base(&base("979000000000")));
    assert!(!dir.is_valid_base(&base("977000000000")));
}

#[test]
fn body_without_matching_group_is_rejected() {
    let dir = bookland();
    assert!(!dir.is_valid_base(&base("978100000000")));
    assert!(!dir.is_valid_base(&base("978999360000")));
}

#[test]
fn longest_group_code_is_tried_first() {
    let dir = bookland();
    assert!(dir.is_valid_base(&base("978999370123")));
    assert!(dir.is_valid_base(&base("978999375912")));
    assert!(!dir.is_valid_base(&base("978999376012")));
}

#[test]
fn empty_group_code_with_full_publisher_range_accepts_everything() {
    let dir = directory(json!({
        "123": { "": { "agency": "catch-all", "allocation_blocks": [block("00", "99", None)] } }
    }));

    for body in [0_u64, 1, 42, 99_999_999, 500_000_000, 999_999_999] {
        let b = base(&format!("123{body:09}"));
        assert!(dir.is_valid_base(&b), "body {body:09} should be accepted");
    }
    assert!(!dir.is_valid_base(&base("124000000000")));
}

#[test]
fn first_matching_group_ends_the_search() {
    // "00" rejects everything it sees; "0" would accept. Bodies starting with
    // "00" must be rejected because "00" is tried first and commits.
    let dir = directory(json!({
        "123": {
            "00": { "agency": "strict", "allocation_blocks": [block("9", "9", None)] },
            "0": { "agency": "loose", "allocation_blocks": [block("00", "99", None)] },
        }
    }));

    let groups = dir.groups("123".parse::<Prefix>().unwrap()).unwrap();
    assert_eq!(groups[0].code(), b"00");

    assert!(!dir.is_valid_base(&base("123001234567")));
    assert!(!dir.is_valid_base(&base("123000000000")));
    // "009..." is accepted by the strict group itself.
    assert!(dir.is_valid_base(&base("123009000000")));
    // Bodies that only match "0" go to the loose group.
    assert!(dir.is_valid_base(&base("123012345678")));
}

#[test]
fn group_order_does_not_depend_on_file_order() {
    let dir = directory(json!({
        "123": {
            "0": { "agency": "loose", "allocation_blocks": [block("00", "99", None)] },
            "00": { "agency": "strict", "allocation_blocks": [block("9", "9", None)] },
        }
    }));
    assert!(!dir.is_valid_base(&base("123001234567")));
}

#[test]
fn publication_width_mismatch_is_rejected() {
    // The remainder after "0" + 2-digit publisher is 6 digits, but the block
    // declares 5-digit publication bounds.
    let dir = directory(json!({
        "978": { "0": { "agency": "odd", "allocation_blocks": [block("00", "99", Some(("00000", "99999")))] } }
    }));
    assert!(!dir.is_valid_base(&base("978012345678")));
}

#[test]
fn publisher_longer_than_remainder_is_rejected() {
    let dir = directory(json!({
        "978": { "12345678": { "agency": "deep", "allocation_blocks": [block("00", "99", None)] } }
    }));
    assert!(!dir.is_valid_base(&base("978123456789")));
}

#[test]
fn publication_bounds_are_inclusive() {
    let dir = directory(json!({
        "979": { "8": { "agency": "US", "allocation_blocks": [block("200", "229", Some(("10000", "19999")))] } }
    }));
    assert!(dir.is_valid_base(&base("979820010000")));
    assert!(dir.is_valid_base(&base("979822919999")));
    assert!(!dir.is_valid_base(&base("979820009999")));
    assert!(!dir.is_valid_base(&base("979820020000")));
}

#[test]
fn any_accepting_block_is_enough() {
    let dir = directory(json!({
        "978": {
            "1": {
                "agency": "English",
                "allocation_blocks": [
                    block("00", "09", Some(("000000", "999999"))),
                    block("100", "399", Some(("00000", "99999"))),
                ]
            }
        }
    }));
    assert!(dir.is_valid_base(&base("978105000000")));
    assert!(dir.is_valid_base(&base("978139912345")));
    assert!(!dir.is_valid_base(&base("978140000000")));
}
