use std::fmt;

use campus_core::model::{
    Badge, BadgeCategory, BadgeId, GamificationState, LearnerId, ProgressPercent, Subject,
    SubjectId, Topic, TopicId,
};
use chrono::{DateTime, Utc};
use storage::repository::{ProgressWrite, Storage};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    learner: Option<LearnerId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLearner { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLearner { raw } => {
                write!(f, "invalid --learner value (expected UUID): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("CAMPUS_DB_URL").unwrap_or_else(|_| "sqlite:campus.sqlite3?mode=rwc".into());
        let mut learner = None;
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
                "--learner" => {
                    let value = require_value(&mut args, "--learner")?;
                    let parsed = value
                        .parse::<LearnerId>()
                        .map_err(|_| ArgsError::InvalidLearner { raw: value.clone() })?;
                    learner = Some(parsed);
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

        Ok(Self {
            db_url,
            learner,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:campus.sqlite3?mode=rwc)");
    eprintln!("  --learner <uuid>          Also seed demo progress for this learner");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CAMPUS_DB_URL (same as --db), RUST_LOG (default: info)");
}

/// (subject, [(topic title, estimated minutes)])
const CATALOG: &[(&str, &[(&str, u32)])] = &[
    (
        "Mathematics",
        &[
            ("Numbers and Place Value", 20),
            ("Fractions", 30),
            ("Linear Equations", 35),
            ("Geometry Basics", 30),
        ],
    ),
    (
        "Science",
        &[
            ("The Scientific Method", 20),
            ("Cells and Organisms", 30),
            ("Forces and Motion", 35),
        ],
    ),
    (
        "English",
        &[
            ("Parts of Speech", 20),
            ("Reading Comprehension", 30),
            ("Essay Structure", 40),
        ],
    ),
];

fn badge_catalog() -> Vec<Badge> {
    vec![
        Badge::new(BadgeId::new(1), "First Steps", 10, BadgeCategory::Milestone)
            .with_description("Earn your first 10 XP")
            .with_icon("star"),
        Badge::new(BadgeId::new(2), "Quick Learner", 50, BadgeCategory::Milestone)
            .with_description("Reach 50 XP")
            .with_icon("zap"),
        Badge::new(BadgeId::new(3), "Centurion", 100, BadgeCategory::Milestone)
            .with_description("Reach 100 XP")
            .with_icon("trophy"),
        Badge::new(BadgeId::new(4), "Dedicated", 250, BadgeCategory::Streak)
            .with_description("Reach 250 XP")
            .with_icon("flame"),
        Badge::new(BadgeId::new(5), "Scholar", 500, BadgeCategory::Mastery)
            .with_description("Reach 500 XP")
            .with_icon("graduation-cap"),
        Badge::new(BadgeId::new(6), "Founding Learner", 0, BadgeCategory::Special)
            .with_description("Joined during the pilot")
            .with_icon("award"),
    ]
}

async fn seed_catalog(storage: &Storage) -> Result<usize, Box<dyn std::error::Error>> {
    let mut topic_count = 0_u64;
    for (subject_idx, (name, topics)) in CATALOG.iter().enumerate() {
        let subject_id = SubjectId::new(subject_idx as u64 + 1);
        storage
            .catalog
            .upsert_subject(&Subject::new(subject_id, *name)?)
            .await?;
        for (order, (title, minutes)) in topics.iter().enumerate() {
            topic_count += 1;
            let topic = Topic::new(TopicId::new(topic_count), subject_id, *title, order as u32)?
                .with_estimated_duration(*minutes);
            storage.catalog.upsert_topic(&topic).await?;
        }
    }
    for badge in badge_catalog() {
        storage.catalog.upsert_badge(&badge).await?;
    }
    Ok(topic_count as usize)
}

async fn seed_learner(
    storage: &Storage,
    learner: LearnerId,
    now: DateTime<Utc>,
) -> Result<GamificationState, Box<dyn std::error::Error>> {
    // First math topic done, second half way.
    for (topic, percent, minutes) in [(1, 100, 25), (2, 50, 15)] {
        storage
            .progress
            .record_progress(ProgressWrite {
                learner_id: learner,
                topic_id: TopicId::new(topic),
                percent: ProgressPercent::new(percent)?,
                additional_minutes: minutes,
                at: now,
            })
            .await?;
    }
    Ok(storage.gamification.increment_xp(learner, 30).await?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let topics = seed_catalog(&storage).await?;
    tracing::info!(subjects = CATALOG.len(), topics, "catalog seeded");

    if let Some(learner) = args.learner {
        let state = seed_learner(&storage, learner, now).await?;
        tracing::info!(%learner, total_xp = state.total_xp(), "demo learner seeded");
    }

    println!(
        "Seeded {} subjects and {} topics into {}",
        CATALOG.len(),
        topics,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
