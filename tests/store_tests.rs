use chrono::NaiveDate;
use todust::clock::{Clock, ManualClock};
use todust::models::{AttachmentKind, Frequency, NotificationKind, Priority, Recurrence, TaskFields, TaskStatus, Template, Theme};
use todust::storage::{KeyValueStore, MemoryStore, TASKS_KEY, TEMPLATES_KEY};
use todust::view::StatusFilter;
use todust::{TaskStore, TodoError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_at(kv: &MemoryStore, today: NaiveDate) -> TaskStore<MemoryStore, ManualClock> {
    TaskStore::open(kv.clone(), ManualClock::at_date(today)).unwrap()
}

fn fields(title: &str) -> TaskFields {
    TaskFields::new(title)
}

#[test]
fn test_create_sets_defaults() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));

    let mut f = fields("  Pay bills  ");
    f.categories = vec![" Home ".into(), "FINANCE".into(), "".into()];
    f.description = Some("   ".into());
    let id = store.create(f).unwrap();

    let task = store.get(id).unwrap();
    assert_eq!(task.title, "Pay bills");
    assert_eq!(task.description, None);
    assert_eq!(task.categories, vec!["home", "finance"]);
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.progress, 0);
    assert!(!task.completed);
    assert_eq!(task.created_date, date(2024, 3, 1));
    assert!(!task.is_recurring);
    assert!(task.recurrence.is_none());
    assert_eq!(task.time_tracking.total_time, 0);
    assert!(task.sub_tasks.is_empty());
    assert!(task.attachments.is_empty());
}

#[test]
fn test_create_rejects_empty_title() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));

    let err = store.create(fields("   ")).unwrap_err();
    assert!(matches!(err, TodoError::Validation(_)));
    assert!(store.tasks().is_empty());
    assert!(kv.get(TASKS_KEY).unwrap().is_none());
}

#[test]
fn test_create_rejects_bad_progress_and_interval() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));

    let mut f = fields("Odd");
    f.progress = 30;
    assert!(matches!(store.create(f).unwrap_err(), TodoError::Validation(_)));

    let mut f = fields("Never");
    f.recurrence = Some(Recurrence::new(Frequency::Daily, 0));
    assert!(matches!(store.create(f).unwrap_err(), TodoError::Validation(_)));
    assert!(store.tasks().is_empty());
}

#[test]
fn test_create_at_100_is_completed() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let mut f = fields("Already done");
    f.progress = 100;
    let id = store.create(f).unwrap();
    assert!(store.get(id).unwrap().completed);
}

#[test]
fn test_recurring_create_sets_flag() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let mut f = fields("Standup");
    f.due_date = Some(date(2024, 3, 2));
    f.recurrence = Some(Recurrence::new(Frequency::Daily, 1));
    let id = store.create(f).unwrap();
    let task = store.get(id).unwrap();
    assert!(task.is_recurring);
    assert_eq!(task.recurrence, Some(Recurrence::new(Frequency::Daily, 1)));
}

#[test]
fn test_ids_unique_in_rapid_succession() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let ids: Vec<u64> = (0..50).map(|i| store.create(fields(&format!("T{}", i))).unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 50);
}

#[test]
fn test_update_preserves_identity() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Draft")).unwrap();
    store.add_sub_task(id, "step").unwrap();

    store.clock().advance(chrono::Duration::days(3));
    let mut f = fields("Final");
    f.priority = Priority::High;
    f.progress = 100;
    assert!(store.update(id, f).unwrap());

    let task = store.get(id).unwrap();
    assert_eq!(task.id, id);
    assert_eq!(task.title, "Final");
    assert_eq!(task.created_date, date(2024, 3, 1));
    assert_eq!(task.priority, Priority::High);
    assert!(task.completed);
    assert_eq!(task.sub_tasks.len(), 1);
}

#[test]
fn test_update_unknown_id_is_noop() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    store.create(fields("Only")).unwrap();
    assert!(!store.update(42, fields("Ghost")).unwrap());
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].title, "Only");
}

#[test]
fn test_update_validates_before_lookup() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Keep")).unwrap();
    assert!(store.update(id, fields("")).is_err());
    assert_eq!(store.get(id).unwrap().title, "Keep");
}

#[test]
fn test_progress_completion_consistency() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Pay bills")).unwrap();

    for p in [25, 100, 50, 0, 75, 100] {
        store.update_progress(id, p).unwrap();
        let t = store.get(id).unwrap();
        assert_eq!(t.completed, t.progress == 100);
    }
    assert!(matches!(store.update_progress(id, 10).unwrap_err(), TodoError::Validation(_)));
    assert!(!store.update_progress(999, 50).unwrap());
}

#[test]
fn test_pay_bills_moves_between_filters() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Pay bills")).unwrap();

    store.set_filter(StatusFilter::InProgress);
    assert!(store.visible().iter().any(|t| t.id == id));

    store.update_progress(id, 100).unwrap();
    assert!(store.get(id).unwrap().completed);
    assert!(!store.visible().iter().any(|t| t.id == id));

    store.set_filter(StatusFilter::Completed);
    assert!(store.visible().iter().any(|t| t.id == id));
}

#[test]
fn test_delete_is_idempotent() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let a = store.create(fields("A")).unwrap();
    let b = store.create(fields("B")).unwrap();

    assert!(store.delete(a).unwrap());
    let snapshot = store.tasks().to_vec();
    assert!(!store.delete(a).unwrap());
    assert!(!store.delete(12345).unwrap());
    assert_eq!(store.tasks(), snapshot.as_slice());
    assert_eq!(store.tasks()[0].id, b);
}

#[test]
fn test_reorder_takes_target_slot() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let a = store.create(fields("A")).unwrap();
    let b = store.create(fields("B")).unwrap();
    let c = store.create(fields("C")).unwrap();

    assert!(store.reorder(c, a).unwrap());
    let order: Vec<u64> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(order, vec![c, a, b]);

    // Moving forward lands after the target: it takes the target's old slot.
    assert!(store.reorder(c, b).unwrap());
    let order: Vec<u64> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(order, vec![a, b, c]);

    assert!(!store.reorder(a, a).unwrap());
    assert!(!store.reorder(a, 999).unwrap());
    assert!(!store.reorder(999, a).unwrap());
}

#[test]
fn test_bulk_completion() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let a = store.create(fields("A")).unwrap();
    let mut f = fields("B");
    f.progress = 50;
    let b = store.create(f).unwrap();
    let c = store.create(fields("C")).unwrap();

    assert_eq!(store.bulk_set_completion(&[a, b, 999], true).unwrap(), 2);
    assert!(store.get(a).unwrap().completed);
    assert_eq!(store.get(b).unwrap().progress, 100);
    assert!(!store.get(c).unwrap().completed);

    store.update_progress(c, 25).unwrap();
    assert_eq!(store.bulk_set_completion(&[a, c], false).unwrap(), 2);
    assert!(!store.get(a).unwrap().completed);
    assert_eq!(store.get(a).unwrap().progress, 75);
    assert_eq!(store.get(c).unwrap().progress, 25);
}

#[test]
fn test_toggle_completion() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Flip")).unwrap();

    assert!(store.toggle_completion(id).unwrap());
    assert_eq!(store.get(id).unwrap().progress, 100);
    assert!(store.toggle_completion(id).unwrap());
    assert!(!store.get(id).unwrap().completed);
    assert_eq!(store.get(id).unwrap().progress, 75);
    assert!(!store.toggle_completion(4242).unwrap());
}

#[test]
fn test_bulk_delete() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let a = store.create(fields("A")).unwrap();
    let b = store.create(fields("B")).unwrap();
    let c = store.create(fields("C")).unwrap();

    assert_eq!(store.bulk_delete(&[a, c, 77]).unwrap(), 2);
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].id, b);
    assert_eq!(store.bulk_delete(&[a, c]).unwrap(), 0);
}

#[test]
fn test_mutations_are_written_through() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Persist me")).unwrap();
    store.update_progress(id, 50).unwrap();

    let reopened = open_at(&kv, date(2024, 3, 1));
    assert_eq!(reopened.tasks(), store.tasks());
    assert_eq!(reopened.get(id).unwrap().progress, 50);
}

#[test]
fn test_open_rejects_corrupt_tasks() {
    let mut kv = MemoryStore::new();
    kv.set(TASKS_KEY, "{not json").unwrap();
    let err = TaskStore::open(kv.clone(), ManualClock::at_date(date(2024, 1, 1))).err().unwrap();
    assert!(matches!(err, TodoError::Format(_)));
    assert_eq!(kv.get(TASKS_KEY).unwrap().as_deref(), Some("{not json"));
}

#[test]
fn test_open_reads_legacy_records() {
    let mut kv = MemoryStore::new();
    let legacy = r#"[
        {"id": 1700000000000, "title": "Old", "description": "", "dueDate": "",
         "categories": ["work"], "priority": "high", "progress": 50, "completed": false,
         "createdDate": "2023-11-14"},
        {"id": 1700000000000, "title": "Twin", "createdDate": "2023-11-14"}
    ]"#;
    kv.set(TASKS_KEY, legacy).unwrap();

    let store = open_at(&kv, date(2024, 1, 1));
    assert_eq!(store.tasks().len(), 2);
    let old = &store.tasks()[0];
    assert_eq!(old.due_date, None);
    assert_eq!(old.priority, Priority::High);
    assert_eq!(old.time_tracking.sessions.len(), 0);
    assert_ne!(store.tasks()[0].id, store.tasks()[1].id);
}

#[test]
fn test_open_upgrades_legacy_missed_sentinel() {
    let mut kv = MemoryStore::new();
    let legacy = r#"[
        {"id": 5, "title": "Gym", "dueDate": "2024-01-01", "progress": 0, "completed": true,
         "createdDate": "2024-01-01", "isRecurring": true,
         "recurrence": {"frequency": "daily", "interval": 1}}
    ]"#;
    kv.set(TASKS_KEY, legacy).unwrap();
    let store = open_at(&kv, date(2024, 1, 1));
    assert_eq!(store.get(5).unwrap().status(), TaskStatus::Missed);
}

#[test]
fn test_attachments() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Research")).unwrap();

    let link = store
        .add_attachment(id, AttachmentKind::Url, "Docs", Some("https://example.com".into()), None)
        .unwrap()
        .unwrap();
    let note = store
        .add_attachment(id, AttachmentKind::Note, "Idea", None, Some("try caching".into()))
        .unwrap()
        .unwrap();
    assert_ne!(link, note);
    assert_eq!(store.get(id).unwrap().attachments.len(), 2);

    assert!(store.add_attachment(id, AttachmentKind::Url, "Broken", None, None).is_err());
    assert!(store.add_attachment(id, AttachmentKind::File, " ", None, None).is_err());
    assert_eq!(store.add_attachment(999, AttachmentKind::File, "x.pdf", None, None).unwrap(), None);

    assert!(store.remove_attachment(id, link).unwrap());
    assert!(!store.remove_attachment(id, link).unwrap());
    assert_eq!(store.get(id).unwrap().attachments[0].id, note);
}

#[test]
fn test_templates_crud_and_apply() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));

    store
        .add_template(Template {
            name: "study".into(),
            icon: "📚".into(),
            title: "Study".into(),
            description: None,
            categories: vec!["School".into()],
            priority: Priority::High,
            is_recurring: false,
            frequency: None,
            interval: 1,
        })
        .unwrap();
    assert!(kv.get(TEMPLATES_KEY).unwrap().is_some());

    let form = TaskFields::from_template(store.template("study").unwrap());
    let id = store.create(form).unwrap();
    let task = store.get(id).unwrap();
    assert_eq!(task.title, "Study");
    assert_eq!(task.priority, Priority::High);
    assert!(!task.is_recurring);
    assert_eq!(task.categories, vec!["school"]);

    assert!(store.remove_template("study").unwrap());
    assert!(!store.remove_template("study").unwrap());
    assert!(store.templates().is_empty());
}

#[test]
fn test_template_validation_and_replace() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let base = Template {
        name: "weekly".into(),
        icon: String::new(),
        title: "Review".into(),
        description: None,
        categories: vec![],
        priority: Priority::Low,
        is_recurring: true,
        frequency: Some(Frequency::Weekly),
        interval: 2,
    };
    store.add_template(base.clone()).unwrap();

    let mut renamed = base.clone();
    renamed.title = "Weekly review".into();
    store.add_template(renamed).unwrap();
    assert_eq!(store.templates().len(), 1);
    assert_eq!(store.templates()[0].title, "Weekly review");

    let form = TaskFields::from_template(&store.templates()[0]);
    assert_eq!(form.recurrence, Some(Recurrence::new(Frequency::Weekly, 2)));

    let mut bad = base.clone();
    bad.frequency = None;
    assert!(store.add_template(bad).is_err());
    let mut bad = base;
    bad.name = " ".into();
    assert!(store.add_template(bad).is_err());
}

#[test]
fn test_theme_round_trip() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    assert_eq!(store.theme().unwrap(), Theme::Light);
    assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
    assert_eq!(kv.get("theme").unwrap().as_deref(), Some("dark"));
    store.set_theme(Theme::Light).unwrap();
    assert_eq!(store.theme().unwrap(), Theme::Light);
}

#[test]
fn test_notification_bookkeeping() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let id = store.create(fields("Remind me")).unwrap();

    assert_eq!(store.last_notified(id, NotificationKind::DueSoon).unwrap(), None);
    store.mark_notified(id, NotificationKind::DueSoon).unwrap();
    assert_eq!(
        store.last_notified(id, NotificationKind::DueSoon).unwrap(),
        Some(store.clock().now())
    );
    assert_eq!(store.last_notified(id, NotificationKind::Overdue).unwrap(), None);
}

#[test]
fn test_search_and_category_filter_on_store() {
    let kv = MemoryStore::new();
    let mut store = open_at(&kv, date(2024, 3, 1));
    let mut f = fields("Groceries");
    f.categories = vec!["home".into()];
    let a = store.create(f).unwrap();
    store.create(fields("Write report")).unwrap();

    store.filter_by_category("HOME");
    let visible: Vec<u64> = store.visible().iter().map(|t| t.id).collect();
    assert_eq!(visible, vec![a]);

    store.clear_search();
    assert_eq!(store.visible().len(), 2);
}
