use chrono::Duration;
use storage::repository::{
    NoteRepository, PomodoroRepository, StorageError, SubjectRepository, TaskRepository,
    TopicRepository,
};
use storage::sqlite::SqliteRepository;
use study_core::SubjectProgress;
use study_core::model::{
    CreateNote, CreatePomodoroSession, CreateSubject, CreateTask, CreateTopic, Note, NoteId,
    PomodoroSession, PomodoroSessionId, SessionKind, Subject, SubjectId, Task, TaskId,
    TaskStatus, Topic, TopicId, UpdateSubject, UpdateTask, UpdateTopic, UserId,
};
use study_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn user(raw: &str) -> UserId {
    UserId::new(raw).unwrap()
}

fn build_subject(owner: &UserId, name: &str) -> Subject {
    Subject::new(
        SubjectId::generate(),
        owner.clone(),
        CreateSubject {
            name: name.into(),
            color: "#3b82f6".into(),
            icon: Some("book".into()),
            professor: None,
            schedule: Some("Mon 9:00".into()),
        },
        fixed_now(),
    )
    .unwrap()
}

fn build_topic(owner: &UserId, subject: SubjectId, order: u32, done: bool) -> Topic {
    Topic::new(
        TopicId::generate(),
        owner.clone(),
        CreateTopic {
            subject_id: subject,
            name: format!("Topic {order}"),
            description: None,
            is_completed: Some(done),
            order: None,
            resources: Some(vec!["https://example.org/notes.pdf".into()]),
        },
        order,
        fixed_now() + Duration::seconds(i64::from(order)),
    )
    .unwrap()
}

#[tokio::test]
async fn topic_round_trip_updates_subject_aggregate() {
    let repo = connect("memdb_topic_roundtrip").await;
    let owner = user("u1");
    let subject = build_subject(&owner, "Calculus");
    repo.insert_subject(&subject).await.unwrap();

    let fresh = repo.get_subject(&owner, subject.id()).await.unwrap();
    assert_eq!(fresh.progress(), SubjectProgress::EMPTY);

    let first = build_topic(&owner, subject.id(), 0, true);
    let progress = repo.insert_topic(&first).await.unwrap();
    assert_eq!(progress.total_topics(), 1);

    let stored = repo.get_subject(&owner, subject.id()).await.unwrap();
    assert_eq!(stored.progress().total_topics(), 1);
    assert_eq!(stored.progress().percent(), 100);

    let second = build_topic(&owner, subject.id(), 1, true);
    let third = build_topic(&owner, subject.id(), 2, false);
    repo.insert_topic(&second).await.unwrap();
    let progress = repo.insert_topic(&third).await.unwrap();
    assert_eq!(progress, SubjectProgress::from_counts(3, 2));
    assert_eq!(progress.percent(), 67);

    let topics = repo.list_topics(&owner, Some(subject.id())).await.unwrap();
    let ids: Vec<TopicId> = topics.iter().map(Topic::id).collect();
    assert_eq!(ids, vec![first.id(), second.id(), third.id()]);
    assert_eq!(topics[0].resources().len(), 1);
}

#[tokio::test]
async fn deleting_the_completed_topic_recomputes_progress() {
    let repo = connect("memdb_topic_delete").await;
    let owner = user("u1");
    let subject = build_subject(&owner, "Physics");
    repo.insert_subject(&subject).await.unwrap();

    let done = build_topic(&owner, subject.id(), 0, true);
    let open = build_topic(&owner, subject.id(), 1, false);
    repo.insert_topic(&done).await.unwrap();
    repo.insert_topic(&open).await.unwrap();

    let (parent, progress) = repo.delete_topic(&owner, done.id()).await.unwrap();
    assert_eq!(parent, subject.id());
    assert_eq!(progress, SubjectProgress::from_counts(1, 0));
    assert_eq!(progress.percent(), 0);

    let mut finished = open.clone();
    finished
        .apply_update(&UpdateTopic::completion(true), fixed_now())
        .unwrap();
    let progress = repo.update_topic(&finished).await.unwrap();
    assert_eq!(progress.percent(), 100);

    let refreshed = repo
        .refresh_subject_progress(&owner, subject.id())
        .await
        .unwrap();
    assert_eq!(refreshed.progress(), progress);
}

#[tokio::test]
async fn subject_delete_cascades_to_topics() {
    let repo = connect("memdb_subject_cascade").await;
    let owner = user("u1");
    let subject = build_subject(&owner, "History");
    repo.insert_subject(&subject).await.unwrap();
    repo.insert_topic(&build_topic(&owner, subject.id(), 0, false))
        .await
        .unwrap();

    repo.delete_subject(&owner, subject.id()).await.unwrap();

    assert!(repo.list_topics(&owner, None).await.unwrap().is_empty());
    let err = repo.get_subject(&owner, subject.id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn subject_update_leaves_progress_columns_alone() {
    let repo = connect("memdb_subject_update").await;
    let owner = user("u1");
    let mut subject = build_subject(&owner, "Biology");
    repo.insert_subject(&subject).await.unwrap();
    repo.insert_topic(&build_topic(&owner, subject.id(), 0, true))
        .await
        .unwrap();

    subject
        .apply_update(
            &UpdateSubject {
                name: Some("Cell Biology".into()),
                ..UpdateSubject::default()
            },
            fixed_now() + Duration::minutes(5),
        )
        .unwrap();
    repo.update_subject(&subject).await.unwrap();

    let stored = repo.get_subject(&owner, subject.id()).await.unwrap();
    assert_eq!(stored.name(), "Cell Biology");
    assert_eq!(stored.progress().percent(), 100);
    assert_eq!(stored.schedule(), Some("Mon 9:00"));
}

#[tokio::test]
async fn records_are_invisible_to_other_owners() {
    let repo = connect("memdb_owner_isolation").await;
    let alice = user("alice");
    let bob = user("bob");
    let subject = build_subject(&alice, "Algebra");
    repo.insert_subject(&subject).await.unwrap();

    assert!(repo.list_subjects(&bob).await.unwrap().is_empty());
    let err = repo.get_subject(&bob, subject.id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let stolen = build_topic(&bob, subject.id(), 0, false);
    let err = repo.insert_topic(&stolen).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo.delete_subject(&bob, subject.id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(repo.list_subjects(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn tasks_round_trip_and_sort_newest_first() {
    let repo = connect("memdb_tasks").await;
    let owner = user("u1");

    let mut input = CreateTask::titled("Read chapter 4");
    input.due_date = Some(fixed_now() + Duration::days(2));
    input.tags = Some(vec!["reading".into()]);
    let older = Task::new(TaskId::generate(), owner.clone(), input, fixed_now()).unwrap();
    let newer = Task::new(
        TaskId::generate(),
        owner.clone(),
        CreateTask::titled("Lab report"),
        fixed_now() + Duration::hours(1),
    )
    .unwrap();
    repo.insert_task(&older).await.unwrap();
    repo.insert_task(&newer).await.unwrap();

    let err = repo.insert_task(&older).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let mut done = older.clone();
    done.apply_update(
        &UpdateTask::status(TaskStatus::Completed),
        fixed_now() + Duration::hours(2),
    )
    .unwrap();
    repo.update_task(&done).await.unwrap();

    let tasks = repo.list_tasks(&owner).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id(), newer.id());
    assert_eq!(tasks[1], done);
    assert_eq!(tasks[1].completed_at(), Some(fixed_now() + Duration::hours(2)));

    repo.delete_task(&owner, newer.id()).await.unwrap();
    let err = repo.delete_task(&owner, newer.id()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn notes_sort_by_last_edit() {
    let repo = connect("memdb_notes").await;
    let owner = user("u1");
    let make = |title: &str, minutes: i64| {
        Note::new(
            NoteId::generate(),
            owner.clone(),
            CreateNote {
                title: title.into(),
                content: "body".into(),
                subject_id: None,
                tags: None,
                is_favorite: None,
            },
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
    };
    let a = make("a", 0);
    let b = make("b", 1);
    repo.insert_note(&a).await.unwrap();
    repo.insert_note(&b).await.unwrap();

    let mut edited = a.clone();
    edited
        .apply_update(
            &study_core::model::UpdateNote {
                is_favorite: Some(true),
                ..Default::default()
            },
            fixed_now() + Duration::minutes(10),
        )
        .unwrap();
    repo.update_note(&edited).await.unwrap();

    let notes = repo.list_notes(&owner).await.unwrap();
    assert_eq!(notes[0], edited);
    assert_eq!(notes[1].id(), b.id());
}

#[tokio::test]
async fn sessions_list_respects_limit() {
    let repo = connect("memdb_sessions").await;
    let owner = user("u1");
    let mut ids = Vec::new();
    for minutes in 0..4_i64 {
        let at = fixed_now() + Duration::minutes(minutes * 30);
        let session = PomodoroSession::new(
            PomodoroSessionId::generate(),
            owner.clone(),
            CreatePomodoroSession {
                kind: SessionKind::Work,
                duration: 1500,
                completed_at: at,
                was_completed: true,
                task_id: None,
                subject_id: None,
            },
            at,
        )
        .unwrap();
        repo.insert_session(&session).await.unwrap();
        ids.push(session.id());
    }

    let latest = repo.list_sessions(&owner, Some(2)).await.unwrap();
    let got: Vec<PomodoroSessionId> = latest.iter().map(PomodoroSession::id).collect();
    assert_eq!(got, vec![ids[3], ids[2]]);

    let all = repo.list_sessions(&owner, None).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].kind(), SessionKind::Work);
}
