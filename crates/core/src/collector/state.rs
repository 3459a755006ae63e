//! Session state and the record merge rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::{completeness, CatalogRecord, TitleId};

/// Accumulated state of one browsing session.
///
/// Serializable so it can be stored between navigations and restored
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorState {
    /// Records in first-seen order, unique by id.
    pub records: Vec<CatalogRecord>,
    /// Next page to request (1-indexed).
    pub next_page: u32,
    /// Whether another page is expected.
    pub has_more: bool,
    /// Whether a page fetch is currently running.
    #[serde(default)]
    pub fetch_in_flight: bool,
}

impl Default for CollectorState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_page: 1,
            has_more: true,
            fetch_in_flight: false,
        }
    }
}

impl CollectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &TitleId) -> Option<&CatalogRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Fold one fetched page into the state.
    ///
    /// Returns the number of records the page carried. The cursor only
    /// advances past non-empty pages, so an empty page is requested again
    /// on the next call.
    pub fn apply_page(&mut self, incoming: Vec<CatalogRecord>, max_records: usize) -> usize {
        let received = incoming.len();
        merge_records(&mut self.records, incoming, max_records);
        self.has_more = received > 0 && self.records.len() < max_records;
        if received > 0 {
            self.next_page += 1;
        }
        received
    }

    /// Attach platforms to a stored record that has none yet.
    ///
    /// Returns whether the record was updated.
    pub fn attach_platforms(&mut self, id: &TitleId, platforms: Vec<String>) -> bool {
        match self.records.iter_mut().find(|r| &r.id == id) {
            Some(record) if record.platforms.is_none() => {
                record.platforms = Some(platforms);
                true
            }
            _ => false,
        }
    }
}

/// Merge incoming records into an accumulated list.
///
/// New ids are appended in incoming order. A record whose id is already
/// present replaces the stored one in place only when it is strictly more
/// complete. The list is truncated to `cap` afterwards.
pub fn merge_records(records: &mut Vec<CatalogRecord>, incoming: Vec<CatalogRecord>, cap: usize) {
    let mut index: HashMap<TitleId, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();

    for record in incoming {
        match index.get(&record.id) {
            Some(&i) => {
                if completeness(&record) > completeness(&records[i]) {
                    records[i] = record;
                }
            }
            None => {
                index.insert(record.id.clone(), records.len());
                records.push(record);
            }
        }
    }

    records.truncate(cap);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn ids(records: &[CatalogRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_new_state() {
        let state = CollectorState::new();
        assert!(state.is_empty());
        assert_eq!(state.next_page, 1);
        assert!(state.has_more);
        assert!(!state.fetch_in_flight);
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut records = fixtures::records(1, 2);
        merge_records(&mut records, fixtures::records(3, 2), 100);
        assert_eq!(ids(&records), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_merge_upgrades_in_place() {
        let mut records = vec![
            fixtures::record_with_fields(1, "A", 2),
            fixtures::record(2, "B"),
        ];
        let better = fixtures::record_with_fields(1, "A", 5);
        merge_records(&mut records, vec![better.clone()], 100);

        assert_eq!(ids(&records), vec!["1", "2"]);
        assert_eq!(records[0], better);
    }

    #[test]
    fn test_merge_keeps_existing_on_equal_or_lower() {
        let original = fixtures::record_with_fields(1, "A", 3);
        let mut records = vec![original.clone()];

        merge_records(&mut records, vec![fixtures::record_with_fields(1, "Other", 3)], 100);
        assert_eq!(records[0], original);

        merge_records(&mut records, vec![fixtures::record_with_fields(1, "A", 1)], 100);
        assert_eq!(records[0], original);
    }

    #[test]
    fn test_merge_dedups_within_incoming_page() {
        let mut records = Vec::new();
        merge_records(
            &mut records,
            vec![
                fixtures::record(1, "A"),
                fixtures::record_with_fields(1, "A", 4),
                fixtures::record(2, "B"),
            ],
            100,
        );
        assert_eq!(ids(&records), vec!["1", "2"]);
        assert_eq!(completeness(&records[0]), 5);
    }

    #[test]
    fn test_merge_truncates_to_cap() {
        let mut records = fixtures::records(1, 95);
        merge_records(&mut records, fixtures::records(96, 15), 102);
        assert_eq!(records.len(), 102);
        assert_eq!(records.last().unwrap().id, TitleId::from(102u64));
    }

    #[test]
    fn test_completeness_never_decreases() {
        let mut records = vec![fixtures::record_with_fields(1, "A", 2)];
        for extra in [0, 4, 1, 6, 3, 5] {
            let before = completeness(&records[0]);
            merge_records(
                &mut records,
                vec![fixtures::record_with_fields(1, "A", extra)],
                10,
            );
            assert!(completeness(&records[0]) >= before);
        }
        assert_eq!(completeness(&records[0]), 7);
    }

    #[test]
    fn test_apply_page_advances_cursor() {
        let mut state = CollectorState::new();
        assert_eq!(state.apply_page(fixtures::records(1, 15), 102), 15);
        assert_eq!(state.next_page, 2);
        assert!(state.has_more);
    }

    #[test]
    fn test_apply_empty_page_stops_without_advancing() {
        let mut state = CollectorState {
            next_page: 4,
            ..CollectorState::new()
        };
        assert_eq!(state.apply_page(vec![], 102), 0);
        assert_eq!(state.next_page, 4);
        assert!(!state.has_more);
    }

    #[test]
    fn test_apply_page_reaching_cap_stops() {
        let mut state = CollectorState::new();
        state.apply_page(fixtures::records(1, 100), 102);
        assert!(state.has_more);

        state.apply_page(fixtures::records(101, 15), 102);
        assert_eq!(state.len(), 102);
        assert!(!state.has_more);
        assert_eq!(state.next_page, 3);
    }

    #[test]
    fn test_attach_platforms_only_once() {
        let mut state = CollectorState::new();
        state.apply_page(fixtures::records(1, 1), 102);
        let id = TitleId::from(1u64);

        assert!(state.attach_platforms(&id, vec!["Netflix".to_string()]));
        assert!(!state.attach_platforms(&id, vec!["Hulu".to_string()]));
        assert_eq!(
            state.record(&id).unwrap().platforms,
            Some(vec!["Netflix".to_string()])
        );
        assert!(!state.attach_platforms(&TitleId::from(9u64), vec![]));
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let mut state = CollectorState::new();
        state.apply_page(fixtures::records(1, 1), 102);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["nextPage"], 2);
        assert_eq!(json["hasMore"], true);
        assert_eq!(json["fetchInFlight"], false);

        let back: CollectorState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
