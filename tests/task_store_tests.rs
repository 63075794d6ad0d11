use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use day_planner::{
    FixedClock, ImportFailure, PlannerError, Priority, TaskDraft, TaskId, TaskPatch, TaskStore,
};
use proptest::prelude::*;
use serde_json::json;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(),
    ))
}

fn store_with(clock: &Arc<FixedClock>) -> TaskStore {
    TaskStore::new(clock.clone())
}

#[test]
fn add_assigns_id_and_timestamps() {
    let clock = clock();
    let mut store = store_with(&clock);
    let task = store
        .add(
            TaskDraft::new("  Standup  ", "09:00", "09:15")
                .with_description("daily sync")
                .with_priority(Priority::High),
            d(2025, 6, 2),
        )
        .unwrap();

    assert_eq!(task.title, "Standup");
    assert_eq!(task.id.as_str(), "1748851200000");
    assert_eq!(task.created_at, Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap());
    assert_eq!(task.updated_at, task.created_at);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.description.as_deref(), Some("daily sync"));
    assert!(!task.completed);
    assert_eq!(task.completed_at, None);
    assert_eq!(store.len(), 1);
}

#[test]
fn add_rejects_empty_title_and_inverted_window() {
    let mut store = store_with(&clock());
    let err = store
        .add(TaskDraft::new("   ", "09:00", "10:00"), d(2025, 6, 2))
        .unwrap_err();
    assert!(matches!(err, PlannerError::Validation(_)));

    let err = store
        .add(TaskDraft::new("Late", "10:00", "10:00"), d(2025, 6, 2))
        .unwrap_err();
    assert_eq!(err.to_string(), "End time must be after start time");

    let err = store
        .add(TaskDraft::new("Bad", "9am", "10:00"), d(2025, 6, 2))
        .unwrap_err();
    assert!(matches!(err, PlannerError::Format { .. }));
    assert!(store.is_empty());
}

#[test]
fn half_open_overlap_rules() {
    let mut store = store_with(&clock());
    let day = d(2025, 6, 2);
    store.add(TaskDraft::new("A", "09:00", "10:00"), day).unwrap();

    assert!(store.has_conflict(day, "09:30", "09:45", None).unwrap());
    assert!(store.has_conflict(day, "08:30", "09:01", None).unwrap());
    assert!(!store.has_conflict(day, "10:00", "11:00", None).unwrap());
    assert!(!store.has_conflict(day, "08:00", "09:00", None).unwrap());
}

#[test]
fn completed_tasks_free_their_slot() {
    let mut store = store_with(&clock());
    let day = d(2025, 6, 2);
    let done = store.add(TaskDraft::new("A", "09:00", "10:00"), day).unwrap();
    store.toggle_complete(&done.id).unwrap();
    assert!(!store.has_conflict(day, "09:00", "10:00", None).unwrap());
}

#[test]
fn conflict_check_skips_excluded_task() {
    let mut store = store_with(&clock());
    let day = d(2025, 6, 2);
    let task = store.add(TaskDraft::new("A", "09:00", "10:00"), day).unwrap();
    assert!(!store.has_conflict(day, "09:30", "10:30", Some(&task.id)).unwrap());
    assert!(store.has_conflict(day, "09:30", "10:30", None).unwrap());

    let start = "09:30".parse().unwrap();
    let end = "10:30".parse().unwrap();
    let hits = store.conflicts(day, start, end, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, task.id);
}

#[test]
fn update_merges_and_refreshes_updated_at() {
    let clock = clock();
    let mut store = store_with(&clock);
    let task = store
        .add(TaskDraft::new("Write", "13:00", "14:00"), d(2025, 6, 2))
        .unwrap();
    clock.advance(Duration::minutes(5));

    let updated = store
        .update(
            &task.id,
            TaskPatch {
                title: Some("Write report".into()),
                end_time: Some("15:00".into()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "Write report");
    assert_eq!(updated.start_time.to_string(), "13:00");
    assert_eq!(updated.end_time.to_string(), "15:00");
    assert_eq!(updated.created_at, task.created_at);
    assert_eq!(updated.updated_at, task.created_at + Duration::minutes(5));
}

#[test]
fn update_of_missing_task_is_not_found() {
    let mut store = store_with(&clock());
    let err = store
        .update(&TaskId::new("nope"), TaskPatch::times("09:00", "10:00"))
        .unwrap_err();
    assert!(matches!(err, PlannerError::NotFound(id) if id.as_str() == "nope"));
}

#[test]
fn toggle_sets_and_clears_completed_at() {
    let clock = clock();
    let mut store = store_with(&clock);
    let task = store
        .add(TaskDraft::new("Gym", "18:00", "19:00"), d(2025, 6, 2))
        .unwrap();
    clock.advance(Duration::hours(1));

    let done = store.toggle_complete(&task.id).unwrap();
    assert!(done.completed);
    assert_eq!(done.completed_at, Some(task.created_at + Duration::hours(1)));

    let undone = store.toggle_complete(&task.id).unwrap();
    assert!(!undone.completed);
    assert_eq!(undone.completed_at, None);

    assert!(matches!(
        store.toggle_complete(&TaskId::new("missing")),
        Err(PlannerError::NotFound(_))
    ));
}

#[test]
fn delete_is_idempotent() {
    let mut store = store_with(&clock());
    let task = store
        .add(TaskDraft::new("A", "09:00", "10:00"), d(2025, 6, 2))
        .unwrap();
    assert!(store.delete(&task.id).is_some());
    assert!(store.delete(&task.id).is_none());
    assert!(store.get(&task.id).is_none());
}

#[test]
fn replace_all_rejects_non_array() {
    let mut store = store_with(&clock());
    let err = store.replace_all(&json!({"tasks": []})).unwrap_err();
    assert!(matches!(err, PlannerError::Import(ImportFailure::NotAnArray)));
}

#[test]
fn replace_all_is_all_or_nothing() {
    let mut store = store_with(&clock());
    let existing = store
        .add(TaskDraft::new("Keep me", "07:00", "08:00"), d(2025, 6, 2))
        .unwrap();

    let payload = json!([
        {
            "id": "1", "title": "Fine", "startTime": "09:00", "endTime": "10:00",
            "priority": "low", "completed": false, "date": "2025-06-02",
            "createdAt": "2025-06-01T10:00:00Z"
        },
        {
            "id": "2", "title": "Broken", "startTime": "11:00", "endTime": "10:00",
            "priority": "low", "completed": false, "date": "2025-06-02",
            "createdAt": "2025-06-01T10:00:00Z"
        },
        {
            "id": "3", "title": "Unknown priority", "startTime": "12:00", "endTime": "13:00",
            "priority": "urgent", "completed": false, "date": "2025-06-02",
            "createdAt": "2025-06-01T10:00:00Z"
        }
    ]);
    let err = store.replace_all(&payload).unwrap_err();
    let PlannerError::Import(ImportFailure::Rejected(rejected)) = err else {
        panic!("expected rejected entries, got {err:?}");
    };
    let indexes: Vec<usize> = rejected.iter().map(|r| r.index).collect();
    assert_eq!(indexes, vec![1, 2]);

    assert_eq!(store.len(), 1);
    assert!(store.get(&existing.id).is_some());
}

#[test]
fn replace_all_rejects_duplicate_ids() {
    let mut store = store_with(&clock());
    let record = json!({
        "id": "7", "title": "Twice", "startTime": "09:00", "endTime": "10:00",
        "priority": "medium", "completed": false, "date": "2025-06-02",
        "createdAt": "2025-06-01T10:00:00Z"
    });
    let err = store.replace_all(&json!([record.clone(), record])).unwrap_err();
    assert!(matches!(err, PlannerError::Import(ImportFailure::Rejected(ref r)) if r.len() == 1));
    assert!(store.is_empty());
}

#[test]
fn replace_all_accepts_overlapping_snapshot() {
    let mut store = store_with(&clock());
    let payload = json!([
        {
            "id": "1", "title": "A", "startTime": "09:00", "endTime": "10:00",
            "priority": "low", "completed": false, "date": "2025-06-02",
            "createdAt": "2025-06-01T10:00:00Z"
        },
        {
            "id": "2", "title": "B", "startTime": "09:30", "endTime": "10:30",
            "priority": "high", "completed": false, "date": "2025-06-02",
            "createdAt": "2025-06-01T10:00:00Z"
        }
    ]);
    assert_eq!(store.replace_all(&payload).unwrap(), 2);
    assert!(store.has_conflict(d(2025, 6, 2), "09:45", "09:50", None).unwrap());
}

#[test]
fn new_ids_skip_imported_ones() {
    let mut store = store_with(&clock());
    let payload = json!([{
        "id": "1748851200000", "title": "Imported", "startTime": "06:00", "endTime": "07:00",
        "priority": "low", "completed": false, "date": "2025-06-02",
        "createdAt": "2025-06-01T10:00:00Z"
    }]);
    store.replace_all(&payload).unwrap();
    let task = store
        .add(TaskDraft::new("Fresh", "09:00", "10:00"), d(2025, 6, 2))
        .unwrap();
    assert_eq!(task.id.as_str(), "1748851200001");
}

proptest! {
    #[test]
    fn prop_conflict_matches_numeric_overlap(
        a_start in 0i64..1439, a_len in 1i64..240,
        b_start in 0i64..1439, b_len in 1i64..240,
    ) {
        let a_end = (a_start + a_len).min(1439);
        let b_end = (b_start + b_len).min(1439);
        prop_assume!(a_start < a_end && b_start < b_end);

        let fmt = |m: i64| format!("{:02}:{:02}", m / 60, m % 60);
        let mut store = store_with(&clock());
        let day = d(2025, 6, 2);
        store.add(TaskDraft::new("A", fmt(a_start), fmt(a_end)), day).unwrap();

        let expected = b_start < a_end && b_end > a_start;
        prop_assert_eq!(
            store.has_conflict(day, &fmt(b_start), &fmt(b_end), None).unwrap(),
            expected
        );
    }
}
