use std::fmt;
use std::net::SocketAddr;

use api::{AppState, StaticTokens, TokenConfigError};
use chrono::Duration;
use services::{AppServices, Clock};
use storage::repository::Storage;
use study_core::model::{
    CreateNote, CreatePomodoroSession, CreateSubject, CreateTask, CreateTopic, SessionKind,
    TaskPriority, UserId,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidBind { raw: String },
    InvalidUser { raw: String },
    InvalidToken(TokenConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBind { raw } => write!(f, "invalid --bind value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidToken(e) => write!(f, "invalid --token value: {e}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--db <sqlite_url>] [--bind <addr>] [--token <token>=<user>]... [--log-json]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>] [--user <id>] [--log-json]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --bind {DEFAULT_BIND}");
    eprintln!("  --user demo");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_BIND_ADDR, STUDY_API_TOKENS (comma-separated), STUDY_LOG_JSON, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    bind: SocketAddr,
    tokens: StaticTokens,
    seed_user: UserId,
    log_json: bool,
}

fn parse_bind(raw: String) -> Result<SocketAddr, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidBind { raw })
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    UserId::new(raw.clone()).map_err(|_| ArgsError::InvalidUser { raw })
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "yes" | "on")
}

impl Args {
    /// Environment first, then flags on top.
    fn parse(
        env: impl Fn(&str) -> Option<String>,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("STUDY_DB_URL").map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut bind = parse_bind(env("STUDY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.into()))?;
        let mut tokens = match env("STUDY_API_TOKENS") {
            Some(raw) => StaticTokens::parse_list(&raw).map_err(ArgsError::InvalidToken)?,
            None => StaticTokens::new(),
        };
        let mut seed_user = parse_user(env("STUDY_SEED_USER").unwrap_or_else(|| "demo".into()))?;
        let mut log_json = env("STUDY_LOG_JSON").is_some_and(|v| truthy(&v));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bind" => bind = parse_bind(require_value(args, "--bind")?)?,
                "--token" => {
                    let value = require_value(args, "--token")?;
                    tokens
                        .insert_pair(&value)
                        .map_err(ArgsError::InvalidToken)?;
                }
                "--user" => seed_user = parse_user(require_value(args, "--user")?)?,
                "--log-json" => log_json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bind,
            tokens,
            seed_user,
            log_json,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn serve(args: Args, services: AppServices) -> Result<(), Box<dyn std::error::Error>> {
    if args.tokens.is_empty() {
        warn!("no API tokens configured; every authenticated route will answer 401");
    }
    let listener = TcpListener::bind(args.bind).await?;
    let state = AppState::new(services, args.tokens);
    api::serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

/// Populate a small, realistic data set for one user through the services.
async fn seed(services: &AppServices, owner: &UserId) -> Result<(), Box<dyn std::error::Error>> {
    let now = Clock::default_clock().now();

    let plans = [
        (
            "Calculus II",
            "#3b82f6",
            Some("Mon/Wed 9:00"),
            [("Integration by parts", true), ("Series", true), ("Polar coordinates", false)],
        ),
        (
            "Organic Chemistry",
            "#10b981",
            Some("Tue/Thu 13:00"),
            [("Alkanes", true), ("Stereochemistry", false), ("Reaction mechanisms", false)],
        ),
    ];

    let mut first_subject = None;
    for (name, color, schedule, topics) in plans {
        let subject = services
            .subjects()
            .create(
                owner,
                CreateSubject {
                    name: name.into(),
                    color: color.into(),
                    icon: Some("book".into()),
                    professor: None,
                    schedule: schedule.map(Into::into),
                },
            )
            .await?;
        first_subject.get_or_insert(subject.id());
        for (topic, done) in topics {
            services
                .topics()
                .create(
                    owner,
                    CreateTopic {
                        subject_id: subject.id(),
                        name: topic.into(),
                        description: None,
                        is_completed: Some(done),
                        order: None,
                        resources: None,
                    },
                )
                .await?;
        }
    }

    let mut task = CreateTask::titled("Finish problem set 7");
    task.subject_id = first_subject;
    task.priority = Some(TaskPriority::High);
    task.due_date = Some(now + Duration::days(1));
    task.estimated_pomodoros = Some(4);
    services.tasks().create(owner, task).await?;

    services
        .notes()
        .create(
            owner,
            CreateNote {
                title: "Series convergence tests".into(),
                content: "Ratio, root, comparison, integral.".into(),
                subject_id: first_subject,
                tags: Some(vec!["calculus".into()]),
                is_favorite: Some(true),
            },
        )
        .await?;

    for (kind, minutes, ago) in [
        (SessionKind::Work, 25, 90),
        (SessionKind::Break, 5, 60),
        (SessionKind::Work, 25, 30),
    ] {
        services
            .pomodoro()
            .create(
                owner,
                CreatePomodoroSession {
                    kind,
                    duration: minutes * 60,
                    completed_at: now - Duration::minutes(ago),
                    was_completed: true,
                    task_id: None,
                    subject_id: first_subject,
                },
            )
            .await?;
    }

    info!(user = %owner, "demo data seeded");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(|key| std::env::var(key).ok(), &mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(parsed.log_json);

    // One store for the whole process, handed down explicitly.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let services = AppServices::from_storage(&storage, Clock::default_clock());
    info!(db = %parsed.db_url, command = ?cmd, "store ready");

    match cmd {
        Command::Serve => serve(parsed, services).await,
        Command::Seed => seed(&services, &parsed.seed_user).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
