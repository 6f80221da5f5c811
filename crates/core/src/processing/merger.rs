//! Key-based merging of media lists.

use std::collections::HashMap;

use super::classifier::ORIGINAL_PREFIX;
use crate::content::MediaEntry;

/// Merge `incoming` into `existing` by key.
///
/// Existing keys keep their position and take the incoming value; new keys are
/// appended in incoming order. Duplicate keys collapse to the last value.
pub fn merge_media(existing: &[MediaEntry], incoming: &[MediaEntry]) -> Vec<MediaEntry> {
    if incoming.is_empty() {
        return dedupe(existing);
    }
    if existing.is_empty() {
        return dedupe(incoming);
    }

    let mut merged = dedupe(existing);
    for entry in incoming {
        set_media(&mut merged, &entry.key, &entry.value);
    }
    merged
}

/// Set one key in place, appending when absent.
pub fn set_media(list: &mut Vec<MediaEntry>, key: &str, value: &str) {
    match list.iter_mut().find(|e| e.key == key) {
        Some(entry) => entry.value = value.to_string(),
        None => list.push(MediaEntry::new(key, value)),
    }
}

/// Original entries in `incoming` that are new or carry a different URL than
/// in `existing`.
pub fn changed_originals(existing: &[MediaEntry], incoming: &[MediaEntry]) -> Vec<MediaEntry> {
    let known: HashMap<&str, &str> = existing
        .iter()
        .filter(|e| e.key.starts_with(ORIGINAL_PREFIX))
        .map(|e| (e.key.as_str(), e.value.as_str()))
        .collect();

    let mut changed: Vec<MediaEntry> = Vec::new();
    for entry in incoming.iter().filter(|e| e.key.starts_with(ORIGINAL_PREFIX)) {
        if known.get(entry.key.as_str()) != Some(&entry.value.as_str()) {
            set_media(&mut changed, &entry.key, &entry.value);
        }
    }
    changed
}

fn dedupe(list: &[MediaEntry]) -> Vec<MediaEntry> {
    let mut result = Vec::with_capacity(list.len());
    for entry in list {
        set_media(&mut result, &entry.key, &entry.value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<MediaEntry> {
        pairs.iter().map(|(k, v)| MediaEntry::new(*k, *v)).collect()
    }

    #[test]
    fn test_merge_appends_new_keys() {
        let merged = merge_media(&entries(&[("original", "a")]), &entries(&[("compressed", "b")]));
        assert_eq!(merged, entries(&[("original", "a"), ("compressed", "b")]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_media(&entries(&[("original", "a")]), &entries(&[("compressed", "b")]));
        let twice = merge_media(&once, &entries(&[("compressed", "b")]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_new_value_wins_in_place() {
        let merged = merge_media(
            &entries(&[("original", "a"), ("compressed", "old")]),
            &entries(&[("compressed", "new")]),
        );
        assert_eq!(merged, entries(&[("original", "a"), ("compressed", "new")]));
    }

    #[test]
    fn test_empty_sides() {
        let list = entries(&[("original", "a")]);
        assert_eq!(merge_media(&[], &list), list);
        assert_eq!(merge_media(&list, &[]), list);
        assert!(merge_media(&[], &[]).is_empty());
    }

    #[test]
    fn test_duplicate_incoming_keys_collapse() {
        let merged = merge_media(&[], &entries(&[("hls", "1"), ("hls", "2")]));
        assert_eq!(merged, entries(&[("hls", "2")]));
    }

    #[test]
    fn test_changed_originals_detects_new_and_modified() {
        let existing = entries(&[("original", "a"), ("original_2", "b"), ("compressed", "c")]);
        let incoming = entries(&[
            ("original", "a"),
            ("original_2", "b2"),
            ("original_3", "d"),
            ("compressed", "z"),
        ]);

        let changed = changed_originals(&existing, &incoming);
        assert_eq!(changed, entries(&[("original_2", "b2"), ("original_3", "d")]));
    }

    #[test]
    fn test_changed_originals_empty_when_unchanged() {
        let existing = entries(&[("original", "a")]);
        assert!(changed_originals(&existing, &existing).is_empty());
    }
}
