use super::*;

// ---- Source ----

#[test]
fn source_parses_both_tags() {
    assert_eq!("TEXT".parse::<Source>().unwrap(), Source::Text);
    assert_eq!("AUDIO".parse::<Source>().unwrap(), Source::Audio);
}

#[test]
fn source_rejects_unknown_tag() {
    let err = "VIDEO".parse::<Source>().unwrap_err();
    assert_eq!(err.found, "VIDEO");

    // Tags are case-sensitive on the wire.
    assert!("text".parse::<Source>().is_err());
    assert!("".parse::<Source>().is_err());
}

#[test]
fn source_display_round_trips() {
    for source in [Source::Text, Source::Audio] {
        assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
    }
}

#[test]
fn source_tags_fit_the_index_field() {
    assert!(Source::Text.as_str().len() <= 5);
    assert!(Source::Audio.as_str().len() <= 5);
}

// ---- RecordKey ordering ----

#[test]
fn keys_order_by_language_then_text_id() {
    let key = |language: &str, text_id: &str| RecordKey {
        language: language.to_string(),
        text_id: text_id.to_string(),
    };

    assert!(key("en", "0") < key("en", "1"));
    assert!(key("en", "9") < key("fr", "0"));
    // Byte-wise, not locale-aware: uppercase sorts before lowercase.
    assert!(key("Z", "0") < key("a", "0"));
    // "zh-Hans" < "zh-Hant" on the final byte.
    assert!(key("zh-Hans", "5") < key("zh-Hant", "0"));
}

// ---- RecordSet ----

#[test]
fn set_insert_and_get() {
    let mut set = RecordSet::new();
    assert!(set.is_empty());

    assert!(set
        .insert(Record::new("en", "0", Source::Text, "Hello, world!"))
        .is_none());
    assert!(set
        .insert(Record::new("ja", "6", Source::Audio, "こんにちは、世界！"))
        .is_none());

    assert_eq!(set.len(), 2);
    assert!(!set.is_empty());

    let entry = set.get("en", "0").unwrap();
    assert_eq!(entry.source, Source::Text);
    assert_eq!(entry.content, "Hello, world!");

    assert!(set.get("en", "1").is_none());
    assert!(set.get("fr", "0").is_none());
}

#[test]
fn set_insert_returns_displaced_record() {
    let mut set = RecordSet::new();
    set.insert(Record::new("en", "0", Source::Text, "first"));

    let displaced = set
        .insert(Record::new("en", "0", Source::Audio, "second"))
        .unwrap();
    assert_eq!(displaced.language, "en");
    assert_eq!(displaced.text_id, "0");
    assert_eq!(displaced.source, Source::Text);
    assert_eq!(displaced.content, "first");

    // The later insert wins.
    assert_eq!(set.len(), 1);
    assert_eq!(set.get("en", "0").unwrap().content, "second");
}

#[test]
fn set_iterates_in_key_order() {
    let mut set = RecordSet::new();
    set.insert(Record::new("zh-Hans", "2", Source::Text, "你好，世界！"));
    set.insert(Record::new("en", "1", Source::Audio, "This is a test."));
    set.insert(Record::new("en", "0", Source::Text, "Hello, world!"));
    set.insert(Record::new("ja", "6", Source::Text, "こんにちは、世界！"));

    let keys: Vec<(String, String)> = set
        .iter()
        .map(|(k, _)| (k.language.clone(), k.text_id.clone()))
        .collect();
    let expect = [("en", "0"), ("en", "1"), ("ja", "6"), ("zh-Hans", "2")];
    let expect: Vec<(String, String)> = expect
        .iter()
        .map(|(l, t)| (l.to_string(), t.to_string()))
        .collect();
    assert_eq!(keys, expect);
}

#[test]
fn set_tracks_content_bytes() {
    let mut set = RecordSet::new();
    assert_eq!(set.content_bytes(), 0);

    set.insert(Record::new("en", "0", Source::Text, "Hello"));
    assert_eq!(set.content_bytes(), 5);

    // Multibyte content counts bytes, not chars.
    set.insert(Record::new("ja", "6", Source::Text, "こんにちは"));
    assert_eq!(set.content_bytes(), 5 + 15);

    // Displacement swaps the old payload for the new one.
    set.insert(Record::new("en", "0", Source::Text, "Hi"));
    assert_eq!(set.content_bytes(), 2 + 15);
}

#[test]
fn record_key_accessor_matches_fields() {
    let record = Record::new("en", "42", Source::Audio, "x");
    let key = record.key();
    assert_eq!(key.language, "en");
    assert_eq!(key.text_id, "42");
}
