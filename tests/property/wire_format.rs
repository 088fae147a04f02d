//! Property tests for lenient decoding of server payloads.
//!
//! Uses proptest to verify:
//! 1. Integer and string ids decode to the same `TaskId`.
//! 2. Due dates decode from plain dates and from timestamps at any time of day.
//! 3. Status labels decode regardless of case, spacing or punctuation.
//! 4. Field errors keep the first message of each list.
//! 5. Arbitrary bytes never panic the envelope decoders.
//! 6. Filter patches reset the page unless they change only the page.

use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::json;
use taskdeck_proto::envelope::{ApiEnvelope, ErrorBody};
use taskdeck_proto::filter::{FilterPatch, FilterSet, SortBy, SortDirection};
use taskdeck_proto::task::{Task, TaskId, TaskStatus};

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1970i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn task_with(id: serde_json::Value, due: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "name": "n",
        "status": "To Do",
        "due_date": due,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
    })
}

/// Scrambles a label the ways servers and users tend to: case, separators,
/// surrounding whitespace.
fn scramble(label: &str, upper: Vec<bool>, separator: &str, padding: usize) -> String {
    let body: String = label
        .chars()
        .zip(upper.into_iter().chain(std::iter::repeat(false)))
        .map(|(c, up)| {
            if c == ' ' {
                separator.to_string()
            } else if up {
                c.to_uppercase().to_string()
            } else {
                c.to_lowercase().to_string()
            }
        })
        .collect();
    format!("{}{body}{}", " ".repeat(padding), " ".repeat(padding))
}

fn arb_patch() -> impl Strategy<Value = FilterPatch> {
    (
        prop::option::of(prop::option::of(arb_status())),
        prop::option::of(prop::option::of("[a-z ]{0,12}")),
        prop::option::of(prop::option::of(arb_date())),
        prop::option::of(prop::sample::select(SortBy::ALL.to_vec())),
        prop::option::of(prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]),
        prop::option::of(0u32..50),
        prop::option::of(1u32..100),
    )
        .prop_map(|(status, search, due_date_from, sort_by, sort_direction, page, per_page)| FilterPatch {
            status,
            search,
            due_date_from,
            due_date_to: None,
            sort_by,
            sort_direction,
            page,
            per_page,
        })
}

proptest! {
    /// A numeric id and its decimal string decode to the same TaskId.
    #[test]
    fn numeric_ids_normalize_to_strings(n in any::<u64>()) {
        let numeric: Task = serde_json::from_value(task_with(json!(n), json!(null))).expect("decode numeric id");
        let textual: Task = serde_json::from_value(task_with(json!(n.to_string()), json!(null))).expect("decode string id");
        prop_assert_eq!(&numeric.id, &TaskId::new(n.to_string()));
        prop_assert_eq!(numeric.id, textual.id);
    }

    /// A timestamp's date part is the due date, whatever the time of day.
    #[test]
    fn due_date_ignores_time_of_day(date in arb_date(), h in 0u32..24, m in 0u32..60, micros in 0u32..1_000_000) {
        let plain = date.format("%Y-%m-%d").to_string();
        let stamped = format!("{plain}T{h:02}:{m:02}:00.{micros:06}Z");

        let from_plain: Task = serde_json::from_value(task_with(json!("1"), json!(plain))).expect("plain date");
        let from_stamp: Task = serde_json::from_value(task_with(json!("1"), json!(stamped))).expect("timestamp");
        prop_assert_eq!(from_plain.due_date, Some(date));
        prop_assert_eq!(from_stamp.due_date, Some(date));
    }

    /// Status labels decode case- and separator-insensitively.
    #[test]
    fn status_labels_are_lenient(
        status in arb_status(),
        upper in prop::collection::vec(any::<bool>(), 0..12),
        separator in prop_oneof![Just(""), Just(" "), Just("_"), Just("-")],
        padding in 0usize..3,
    ) {
        let raw = scramble(status.label(), upper, separator, padding);
        prop_assert_eq!(raw.parse::<TaskStatus>().ok(), Some(status));
    }

    /// Only the first message of each field's list survives.
    #[test]
    fn first_field_message_wins(
        fields in prop::collection::btree_map("[a-z_]{1,10}", prop::collection::vec("[A-Za-z .]{1,20}", 1..4), 0..5)
    ) {
        let body = json!({"message": "invalid", "errors": &fields});
        let parsed: ErrorBody = serde_json::from_value(body).expect("decode error body");
        prop_assert_eq!(parsed.errors.len(), fields.len());
        for (field, messages) in &fields {
            prop_assert_eq!(&parsed.errors[field], &messages[0]);
        }
    }

    /// Random bytes never cause a panic in the response decoders.
    #[test]
    fn random_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = serde_json::from_slice::<ApiEnvelope<Task>>(&data);
        let _ = serde_json::from_slice::<ErrorBody>(&data);
    }

    /// Any change other than the page sends the list back to page 1; a
    /// page-only change lands on that page (at least 1).
    #[test]
    fn page_resets_unless_only_page_changes(start_page in 1u32..20, patch in arb_patch()) {
        let mut filters = FilterSet { page: start_page, ..FilterSet::default() };
        let only_page = patch.page.filter(|_| !patch.changes_beyond_page());
        let touches_more = patch.changes_beyond_page();
        filters.apply(patch);

        if touches_more {
            prop_assert_eq!(filters.page, 1);
        } else if let Some(page) = only_page {
            prop_assert_eq!(filters.page, page.max(1));
        } else {
            prop_assert_eq!(filters.page, start_page);
        }
        prop_assert!(filters.per_page >= 1);
        prop_assert!(filters.search.as_deref().is_none_or(|s| !s.trim().is_empty()));
    }

    /// The list query always carries sort and paging keys.
    #[test]
    fn query_always_has_sort_and_paging(patch in arb_patch()) {
        let mut filters = FilterSet::default();
        filters.apply(patch);
        let keys: Vec<&str> = filters.to_query().into_iter().map(|(k, _)| k).collect();
        for required in ["sort_by", "sort_direction", "page", "per_page"] {
            prop_assert!(keys.contains(&required));
        }
        prop_assert_eq!(keys.contains(&"status"), filters.status.is_some());
    }
}
