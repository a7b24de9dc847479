//! Operator tooling for the debate tournament store.
//!
//! Applies schema migrations, prints a stored tournament, or runs a
//! self-contained duo registration walkthrough against in-memory storage.

use std::sync::Arc;

use anyhow::{Context, Error, bail};
use chrono::{Duration, Utc};
use debate_tournaments::{
    db::{Database, DatabaseConfig, InMemoryTournamentRepository, TournamentRepository as _},
    tournament::{
        Dependant, RecordingEventEmitter, TournamentProps, TournamentService, TournamentType,
        UuidIdGenerator,
    },
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Administer debate tournaments

USAGE:
  dt_admin [OPTIONS] <COMMAND>

COMMANDS:
  migrate              Apply database migrations
  show <TOURNAMENT>    Print a tournament and its registrations as JSON
  demo                 Run a duo registration walkthrough in memory

OPTIONS:
  --db-url     URL     Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help           Print help information

ENVIRONMENT:
  DATABASE_URL         PostgreSQL connection string
  DB_MAX_CONNECTIONS   Maximum pool size (default: 20)
  RUST_LOG             Log filter (default: info)
";

enum Command {
    Migrate,
    Show(String),
    Demo,
}

struct Args {
    database_url: Option<String>,
    command: Command,
}

fn parse_args() -> Result<Args, Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let database_url = pargs.opt_value_from_str("--db-url")?;
    let command = match pargs.subcommand()?.as_deref() {
        Some("migrate") => Command::Migrate,
        Some("show") => Command::Show(
            pargs
                .free_from_str()
                .context("show requires a tournament id")?,
        ),
        Some("demo") => Command::Demo,
        Some(other) => bail!("unknown command '{other}'\n\n{HELP}"),
        None => bail!("missing command\n\n{HELP}"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    Ok(Args {
        database_url,
        command,
    })
}

async fn connect(database_url: Option<String>) -> Result<Database, Error> {
    let config = match database_url {
        Some(url) => DatabaseConfig::from_env_with_url(url)?,
        None => DatabaseConfig::from_env()?,
    };

    let db = Database::new(&config)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");
    Ok(db)
}

async fn migrate(database_url: Option<String>) -> Result<(), Error> {
    let db = connect(database_url).await?;
    db.run_migrations().await?;
    db.close().await;
    Ok(())
}

async fn show(database_url: Option<String>, tournament_id: &str) -> Result<(), Error> {
    let db = connect(database_url).await?;
    db.health_check().await?;

    let tournament = db
        .tournaments()
        .find_by_id(tournament_id)
        .await?
        .with_context(|| format!("Tournament with ID {tournament_id} not found."))?;
    println!("{}", serde_json::to_string_pretty(&tournament)?);

    db.close().await;
    Ok(())
}

async fn demo() -> Result<(), Error> {
    let emitter = Arc::new(RecordingEventEmitter::new());
    let service = TournamentService::new(
        Arc::new(InMemoryTournamentRepository::new()),
        emitter.clone(),
        Arc::new(UuidIdGenerator),
    );

    let now = Utc::now();
    let tournament = service
        .create_tournament(TournamentProps {
            name: "Spring Duo Cup".to_string(),
            description: "Parliamentary-style pairs tournament for club members".to_string(),
            tournament_type: TournamentType::Duo,
            registration_start_date: now - Duration::days(1),
            registration_end_date: now + Duration::days(6),
            start_date: now + Duration::days(7),
        })
        .await?;

    let accepted = service
        .request_duo_registration(
            tournament.id(),
            &Dependant::new("competitor-ana"),
            &Dependant::new("competitor-ben"),
        )
        .await?;
    service.approve_duo_registration(accepted.id()).await?;

    let rejected = service
        .request_duo_registration(
            tournament.id(),
            &Dependant::new("competitor-cai"),
            &Dependant::new("competitor-dee"),
        )
        .await?;
    service
        .reject_duo_registration(rejected.id(), Some("Partner membership has lapsed"))
        .await?;

    for event in emitter.take() {
        println!("{}", serde_json::to_string(&event)?);
    }

    let tournament = service.get_tournament(tournament.id()).await?;
    println!("{}", serde_json::to_string_pretty(&tournament)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args = parse_args()?;
    match args.command {
        Command::Migrate => migrate(args.database_url).await,
        Command::Show(tournament_id) => show(args.database_url, &tournament_id).await,
        Command::Demo => demo().await,
    }
}
