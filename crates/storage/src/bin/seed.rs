use std::fmt;

use chrono::{DateTime, Duration, Utc};
use study_core::model::{
    CreateNote, CreatePomodoroSession, CreateSubject, CreateTask, CreateTopic, Note, NoteId,
    PomodoroSession, PomodoroSessionId, SessionKind, Subject, SubjectId, Task, TaskId,
    TaskPriority, Topic, TopicId, UserId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user: UserId,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    UserId::new(raw.clone()).map_err(|_| ArgsError::InvalidUser { raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| "sqlite:study.sqlite3?mode=rwc".into());
        let mut user = parse_user(std::env::var("STUDY_SEED_USER").unwrap_or_else(|_| "demo".into()))?;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    user = parse_user(require_value(&mut args, "--user")?)?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, user, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:study.sqlite3?mode=rwc)");
    eprintln!("  --user <id>               Owner of the seeded records (default: demo)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_SEED_USER");
}

fn subject_input(name: &str, color: &str, professor: &str) -> CreateSubject {
    CreateSubject {
        name: name.into(),
        color: color.into(),
        icon: None,
        professor: Some(professor.into()),
        schedule: None,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let user = &args.user;

    let subjects = [
        ("Calculus", "#3b82f6", "Dr. Riemann", ["Limits", "Derivatives", "Integrals"]),
        ("Chemistry", "#10b981", "Dr. Curie", ["Atoms", "Bonds", "Reactions"]),
    ];
    let mut topic_count = 0;
    for (offset, (name, color, professor, topics)) in (0_i64..).zip(subjects) {
        let subject = Subject::new(
            SubjectId::generate(),
            user.clone(),
            subject_input(name, color, professor),
            now - Duration::minutes(offset),
        )?;
        storage.subjects.insert_subject(&subject).await?;

        for (order, topic_name) in (0_u32..).zip(topics) {
            let topic = Topic::new(
                TopicId::generate(),
                user.clone(),
                CreateTopic {
                    subject_id: subject.id(),
                    name: topic_name.into(),
                    description: None,
                    is_completed: Some(order == 0),
                    order: None,
                    resources: None,
                },
                order,
                now,
            )?;
            storage.topics.insert_topic(&topic).await?;
            topic_count += 1;
        }
    }

    let mut task = CreateTask::titled("Finish problem set 3");
    task.due_date = Some(now + Duration::days(1));
    task.priority = Some(TaskPriority::High);
    task.estimated_pomodoros = Some(4);
    let task = Task::new(TaskId::generate(), user.clone(), task, now)?;
    storage.tasks.insert_task(&task).await?;

    let note = Note::new(
        NoteId::generate(),
        user.clone(),
        CreateNote {
            title: "Chain rule".into(),
            content: "(f o g)'(x) = f'(g(x)) g'(x)".into(),
            subject_id: None,
            tags: Some(vec!["calculus".into()]),
            is_favorite: Some(true),
        },
        now,
    )?;
    storage.notes.insert_note(&note).await?;

    for hours_ago in [1_i64, 3, 26] {
        let completed_at = now - Duration::hours(hours_ago);
        let session = PomodoroSession::new(
            PomodoroSessionId::generate(),
            user.clone(),
            CreatePomodoroSession {
                kind: SessionKind::Work,
                duration: 25 * 60,
                completed_at,
                was_completed: true,
                task_id: Some(task.id()),
                subject_id: None,
            },
            completed_at,
        )?;
        storage.pomodoro.insert_session(&session).await?;
    }

    println!(
        "Seeded {} subjects, {topic_count} topics, 1 task, 1 note and 3 sessions for {} into {}",
        subjects.len(),
        user,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
