use chrono::{Duration, Utc};

use super::test_db;

#[test]
fn test_kv_set_get_delete() {
    let db = test_db();
    assert!(db.kv_get("missing").unwrap().is_none());

    db.kv_set("a", "1").unwrap();
    db.kv_set("a", "2").unwrap();
    assert_eq!(db.kv_get("a").unwrap().as_deref(), Some("2"));

    assert!(db.kv_delete("a").unwrap());
    assert!(!db.kv_delete("a").unwrap());
    assert!(db.kv_get("a").unwrap().is_none());
}

#[test]
fn test_kv_expired_entries_are_invisible() {
    let db = test_db();
    db.kv_set_with_ttl("short", "v", Duration::seconds(60)).unwrap();

    let now = Utc::now().timestamp();
    assert_eq!(db.kv_get_at("short", now).unwrap().as_deref(), Some("v"));
    assert!(db.kv_get_at("short", now + 61).unwrap().is_none());
    assert!(db.kv_take_at("short", now + 61).unwrap().is_none());
    // take deletes even when expired
    assert!(db.kv_get_at("short", now).unwrap().is_none());
}

#[test]
fn test_kv_take_is_single_use() {
    let db = test_db();
    db.kv_set_with_ttl("once", "secret", Duration::minutes(10)).unwrap();
    assert_eq!(db.kv_take("once").unwrap().as_deref(), Some("secret"));
    assert!(db.kv_take("once").unwrap().is_none());
}

#[test]
fn test_kv_incr_with_ttl() {
    let db = test_db();
    let ttl = Duration::hours(1);
    assert_eq!(db.kv_incr_with_ttl("counter", ttl).unwrap(), 1);
    assert_eq!(db.kv_incr_with_ttl("counter", ttl).unwrap(), 2);
    assert_eq!(db.kv_incr_with_ttl("counter", ttl).unwrap(), 3);
    assert_eq!(db.kv_get("counter").unwrap().as_deref(), Some("3"));
}

#[test]
fn test_kv_incr_restarts_expired_counter() {
    let db = test_db();
    db.kv_set_with_ttl("counter", "41", Duration::seconds(-1)).unwrap();
    assert_eq!(db.kv_incr_with_ttl("counter", Duration::hours(1)).unwrap(), 1);
}

#[test]
fn test_kv_purge_expired() {
    let db = test_db();
    db.kv_set_with_ttl("old", "x", Duration::seconds(-5)).unwrap();
    db.kv_set_with_ttl("fresh", "y", Duration::hours(1)).unwrap();
    db.kv_set("forever", "z").unwrap();

    assert_eq!(db.kv_purge_expired().unwrap(), 1);
    assert!(db.kv_get("fresh").unwrap().is_some());
    assert!(db.kv_get("forever").unwrap().is_some());
}

#[test]
fn test_daily_message_counter() {
    let db = test_db();
    let now = Utc::now();
    assert_eq!(db.message_count_on("u1", now).unwrap(), 0);
    assert_eq!(db.increment_message_count("u1", now).unwrap(), 1);
    assert_eq!(db.increment_message_count("u1", now).unwrap(), 2);
    assert_eq!(db.message_count_on("u1", now).unwrap(), 2);
    assert_eq!(db.message_count_on("u2", now).unwrap(), 0);

    let tomorrow = now + Duration::days(1);
    assert_eq!(db.message_count_on("u1", tomorrow).unwrap(), 0);
}

#[test]
fn test_message_counter_key_format() {
    let day = chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    assert_eq!(
        crate::usage::message_counter_key("abc", day),
        "messages:abc:2025-03-07"
    );
}

#[test]
fn test_reserve_message_slot_stops_at_limit() {
    let db = test_db();
    let now = Utc::now();
    for expected in 1..=3 {
        assert_eq!(db.reserve_message_slot("u1", 3, now).unwrap(), Some(expected));
    }
    assert_eq!(db.reserve_message_slot("u1", 3, now).unwrap(), None);
    assert_eq!(db.message_count_on("u1", now).unwrap(), 3);

    db.release_message_slot("u1", now).unwrap();
    assert_eq!(db.message_count_on("u1", now).unwrap(), 2);
    assert_eq!(db.reserve_message_slot("u1", 3, now).unwrap(), Some(3));

    let tomorrow = now + Duration::days(1);
    assert_eq!(db.reserve_message_slot("u1", 3, tomorrow).unwrap(), Some(1));
}

#[test]
fn test_release_message_slot_floors_at_zero() {
    let db = test_db();
    let now = Utc::now();
    db.release_message_slot("nobody", now).unwrap();
    assert_eq!(db.message_count_on("nobody", now).unwrap(), 0);

    assert_eq!(db.reserve_message_slot("u1", 1, now).unwrap(), Some(1));
    db.release_message_slot("u1", now).unwrap();
    db.release_message_slot("u1", now).unwrap();
    assert_eq!(db.message_count_on("u1", now).unwrap(), 0);
}
