use chrono::{NaiveDate, TimeZone, Utc};
use todust::backup::{Backup, APP_VERSION};
use todust::clock::{Clock, ManualClock};
use todust::export::{ical_priority, to_csv, to_ical, to_json, to_text, JsonExport, CSV_HEADER};
use todust::models::{Frequency, Priority, Recurrence, TaskFields, Template};
use todust::storage::MemoryStore;
use todust::{TaskStore, TodoError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_at(kv: &MemoryStore, today: NaiveDate) -> TaskStore<MemoryStore, ManualClock> {
    TaskStore::open(kv.clone(), ManualClock::at_date(today)).unwrap()
}

fn sample(kv: &MemoryStore) -> TaskStore<MemoryStore, ManualClock> {
    let mut store = open_at(kv, date(2024, 2, 1));

    let mut f = TaskFields::new("Say \"hi\", then leave");
    f.description = Some("Line one".into());
    f.due_date = Some(date(2024, 2, 14));
    f.categories = vec!["social".into(), "fun".into()];
    f.priority = Priority::High;
    f.progress = 50;
    store.create(f).unwrap();

    let mut f = TaskFields::new("File taxes");
    f.priority = Priority::Low;
    f.progress = 100;
    store.create(f).unwrap();

    store
}

#[test]
fn test_csv_export() {
    let kv = MemoryStore::new();
    let store = sample(&kv);
    let csv = to_csv(store.tasks()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER);
    assert_eq!(
        lines[1],
        r#""Say ""hi"", then leave","Line one","2024-02-14","social; fun","high","50","No","2024-02-01""#
    );
    assert_eq!(lines[2], r#""File taxes","","","","low","100","Yes","2024-02-01""#);
    assert!(csv.ends_with('\n'));
}

#[test]
fn test_csv_export_empty() {
    assert_eq!(to_csv(&[]).unwrap(), format!("{}\n", CSV_HEADER));
}

#[test]
fn test_text_export_sections() {
    let kv = MemoryStore::new();
    let store = sample(&kv);
    let text = to_text(store.tasks(), store.clock().now());

    assert!(text.contains("Total Tasks: 2"));
    assert!(text.contains("Completed: 1"));
    assert!(text.contains("In Progress: 1"));
    let open_at_pos = text.find("IN PROGRESS TASKS:").unwrap();
    let done_at = text.find("COMPLETED TASKS:").unwrap();
    assert!(open_at_pos < done_at);
    assert!(text[open_at_pos..done_at].contains("1. Say \"hi\", then leave"));
    assert!(text[open_at_pos..done_at].contains("Priority: HIGH"));
    assert!(text[done_at..].contains("1. File taxes"));
}

#[test]
fn test_text_export_omits_empty_sections() {
    let text = to_text(&[], Utc::now());
    assert!(text.contains("Total Tasks: 0"));
    assert!(!text.contains("IN PROGRESS TASKS:"));
    assert!(!text.contains("COMPLETED TASKS:"));
}

#[test]
fn test_json_export() {
    let kv = MemoryStore::new();
    let store = sample(&kv);
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
    let raw = to_json(store.tasks(), now).unwrap();

    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["totalTasks"], 2);
    assert_eq!(value["completedTasks"], 1);
    assert_eq!(value["todos"][0]["dueDate"], "2024-02-14");
    assert_eq!(value["todos"][0]["createdDate"], "2024-02-01");

    let parsed: JsonExport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.export_date, now);
    assert_eq!(parsed.todos.as_slice(), store.tasks());
}

#[test]
fn test_ical_export() {
    let kv = MemoryStore::new();
    let store = sample(&kv);
    let task = &store.tasks()[0];
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap();
    let ics = to_ical(task, now);

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(ics.contains(&format!("UID:{}\r\n", task.id)));
    assert!(ics.contains("DTSTAMP:20240201T083000Z\r\n"));
    assert!(ics.contains("DTSTART;VALUE=DATE:20240214\r\n"));
    assert!(ics.contains("DTEND;VALUE=DATE:20240215\r\n"));
    assert!(ics.contains("SUMMARY:TODO: Say \"hi\"\\, then leave\r\n"));
    assert!(ics.contains("PRIORITY:1\r\n"));
    assert!(ics.contains("CATEGORIES:social,fun\r\n"));
    assert!(ics.contains("DESCRIPTION:Line one\\nPriority: HIGH\\nProgress: 50%"));
}

#[test]
fn test_ical_folds_long_lines() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 2, 1));
    let id = store.create(TaskFields::new("x".repeat(200))).unwrap();
    let ics = to_ical(store.get(id).unwrap(), Utc::now());

    for line in ics.split("\r\n") {
        assert!(line.len() <= 75, "{}", line);
    }
    assert!(ics.contains("\r\n x"));
    assert!(ics.contains("DTSTART;VALUE=DATE:20240201\r\n"));
}

#[test]
fn test_ical_priority_scale() {
    assert_eq!(ical_priority(Priority::High), 1);
    assert_eq!(ical_priority(Priority::Medium), 5);
    assert_eq!(ical_priority(Priority::Low), 9);
}

#[test]
fn test_backup_round_trip() {
    let kv = MemoryStore::new();
    let mut store = sample(&kv);
    store
        .add_template(Template {
            name: "Gym".into(),
            icon: "🏋".into(),
            title: "Workout".into(),
            description: None,
            categories: vec!["health".into()],
            priority: Priority::Medium,
            is_recurring: true,
            frequency: Some(Frequency::Daily),
            interval: 2,
        })
        .unwrap();

    let backup = store.backup();
    assert_eq!(backup.total_tasks, 2);
    assert_eq!(backup.completed_tasks, 1);
    assert_eq!(backup.app_version, APP_VERSION);
    let raw = backup.to_json().unwrap();

    let other = MemoryStore::new();
    let mut restored = open_at(&other, date(2024, 2, 1));
    restored.create(TaskFields::new("to be replaced")).unwrap();
    restored.restore_from_str(&raw).unwrap();

    assert_eq!(restored.tasks(), store.tasks());
    assert_eq!(restored.templates(), store.templates());

    let reopened = open_at(&other, date(2024, 2, 1));
    assert_eq!(reopened.tasks(), store.tasks());
    assert_eq!(reopened.templates().len(), 1);
}

#[test]
fn test_backup_parse_rejects_bad_shapes() {
    for raw in [
        "not json",
        "[]",
        "{}",
        r#"{"todos": {}}"#,
        r#"{"todos": [], "templates": 3}"#,
        r#"{"todos": [{"id": 1}]}"#,
    ] {
        assert!(matches!(Backup::parse(raw), Err(TodoError::Format(_))), "{}", raw);
    }
}

#[test]
fn test_failed_restore_leaves_store_untouched() {
    let kv = MemoryStore::new();
    let mut store = sample(&kv);
    let before = store.tasks().to_vec();

    assert!(store.restore_from_str(r#"{"todos": "nope"}"#).is_err());
    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(open_at(&kv, date(2024, 2, 1)).tasks(), before.as_slice());
}

#[test]
fn test_backup_parse_accepts_minimal_document() {
    let raw = r#"{
        "todos": [{
            "id": 7,
            "title": "Old task",
            "createdDate": "2023-12-01",
            "completed": true,
            "progress": 100
        }]
    }"#;
    let backup = Backup::parse(raw).unwrap();
    assert_eq!(backup.todos.len(), 1);
    assert!(backup.templates.is_empty());
    assert_eq!(backup.completed_tasks, 1);

    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 2, 1));
    store.restore(backup).unwrap();
    assert_eq!(store.get(7).unwrap().title, "Old task");

    // New ids never collide with restored ones.
    let fresh = store.create(TaskFields::new("New")).unwrap();
    assert_ne!(fresh, 7);
}

#[test]
fn test_restore_keeps_recurrence() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 2, 1));
    let mut f = TaskFields::new("Standup");
    f.due_date = Some(date(2024, 2, 2));
    f.recurrence = Some(Recurrence::new(Frequency::Daily, 1));
    store.create(f).unwrap();
    let raw = store.backup().to_json().unwrap();

    let other = MemoryStore::new();
    let mut restored = open_at(&other, date(2024, 2, 1));
    restored.restore_from_str(&raw).unwrap();
    let task = &restored.tasks()[0];
    assert!(task.is_recurring);
    assert_eq!(task.recurrence, Some(Recurrence::new(Frequency::Daily, 1)));
}

#[test]
fn test_restore_rejects_duplicate_task_ids() {
    let kv = MemoryStore::new();
    let mut store = sample(&kv);
    let before = store.tasks().to_vec();
    let raw = r#"{
        "todos": [
            {"id": 5, "title": "A", "createdDate": "2024-01-01"},
            {"id": 5, "title": "B", "createdDate": "2024-01-01"}
        ]
    }"#;

    assert!(matches!(Backup::parse(raw), Err(TodoError::Format(_))));
    assert!(matches!(store.restore_from_str(raw), Err(TodoError::Format(_))));
    assert_eq!(store.tasks(), before.as_slice());
    assert_eq!(open_at(&kv, date(2024, 2, 1)).tasks(), before.as_slice());

    let mut backup = store.backup();
    let mut twin = backup.todos[0].clone();
    twin.title = "Twin".into();
    backup.todos.push(twin);
    assert!(matches!(store.restore(backup), Err(TodoError::Format(_))));
    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn test_backup_export_date_is_optional() {
    let raw = r#"{"todos": []}"#;
    assert_eq!(Backup::parse(raw).unwrap().export_date, None);

    let kv = MemoryStore::new();
    let store = sample(&kv);
    let parsed = Backup::parse(&store.backup().to_json().unwrap()).unwrap();
    assert_eq!(parsed.export_date, Some(store.clock().now()));
}
