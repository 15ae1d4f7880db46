mod shell;

use std::fmt;
use std::path::PathBuf;

use exam_core::model::{ExamId, UserId};
use services::{AppServices, Clock, SessionConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const DEFAULT_EXAM_ID: &str = "exam_demo";
const DEFAULT_USER_ID: &str = "student";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFile,
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFile => write!(f, "import requires --file <path>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw:?}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
    eprintln!("  cargo run -p app -- run     [--db <sqlite_url>] [--exam-id <id>] [--user <id>]");
    eprintln!("  cargo run -p app -- list    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--exam-id <id>] [--user <id>]");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- import  --file <catalog.json> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:exams.sqlite3");
    eprintln!("  --exam-id {DEFAULT_EXAM_ID}");
    eprintln!("  --user {DEFAULT_USER_ID}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_USER_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    List,
    History,
    Seed,
    Import,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "list" => Some(Self::List),
            "history" => Some(Self::History),
            "seed" => Some(Self::Seed),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    exam_id: ExamId,
    user_id: UserId,
    file: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exams.sqlite3".into(), normalize_sqlite_url);
        let mut exam_id = ExamId::new(DEFAULT_EXAM_ID);
        let mut user_id = std::env::var("EXAM_USER_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| UserId::new(DEFAULT_USER_ID), |value| UserId::new(value.trim()));
        let mut file = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--exam-id" => {
                    let value = require_value(args, "--exam-id")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidExamId { raw: value });
                    }
                    exam_id = ExamId::new(value.trim());
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidUserId { raw: value });
                    }
                    user_id = UserId::new(value.trim());
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(args, "--file")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            exam_id,
            user_id,
            file,
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means taking the default exam.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so core and services never see URLs.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(
        &parsed.db_url,
        Clock::default(),
        SessionConfig::default(),
    )
    .await?;

    match cmd {
        Command::Run => {
            let running = app
                .sessions()
                .start_session(&parsed.exam_id, parsed.user_id.clone())
                .await?;
            if let Some(outcome) = shell::run_session(running).await? {
                if outcome.attempt_id.is_none() {
                    eprintln!("warning: the attempt could not be saved");
                }
                if outcome.reward_granted {
                    let config = app.sessions().config().clone();
                    let total = app.xp_total(&parsed.user_id).await?;
                    println!(
                        "+{} XP ({}). Total: {total} XP",
                        config.pass_reward_xp, config.pass_reward_reason
                    );
                }
            }
            Ok(())
        }
        Command::List => {
            let exams = app.sessions().list_exams().await?;
            if exams.is_empty() {
                println!("No exams stored. Try `seed` or `import --file <path>`.");
            }
            for exam in exams {
                let duration = if exam.is_timed() {
                    format!("{} min", exam.duration_minutes())
                } else {
                    "untimed".to_owned()
                };
                println!(
                    "{:<16} {:<40} {:>3} questions  {:>8}  pass {}%",
                    exam.id().as_str(),
                    exam.title(),
                    exam.question_count(),
                    duration,
                    exam.pass_score_percent()
                );
            }
            Ok(())
        }
        Command::History => {
            let rows = app
                .sessions()
                .history(&parsed.exam_id, &parsed.user_id)
                .await?;
            if rows.is_empty() {
                println!(
                    "No attempts at {} by {}.",
                    parsed.exam_id, parsed.user_id
                );
            }
            for row in rows {
                let attempt = &row.attempt;
                let result = attempt.result();
                println!(
                    "#{:<5} {}  {:>3}%  {:<6}  {}",
                    row.id,
                    attempt.submitted_at().format("%Y-%m-%d %H:%M"),
                    result.percent,
                    if result.passed { "passed" } else { "failed" },
                    attempt.trigger().as_str()
                );
            }
            Ok(())
        }
        Command::Seed => {
            let count = app.seed_demo().await?;
            println!("Seeded {count} exams into {}", parsed.db_url);
            Ok(())
        }
        Command::Import => {
            let path = parsed.file.ok_or(ArgsError::MissingFile)?;
            let count = app.import_catalog(&path).await?;
            println!("Imported {count} exams from {}", path.display());
            Ok(())
        }
    }
}

/// Builds the log filter from `RUST_LOG` directives, falling back to `info`
/// when none are given.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

#[tokio::main]
async fn main() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(&directives))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
