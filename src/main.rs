mod api;
mod cli;
mod config;
mod db;
mod itinerary;
mod planner;
mod session;
mod trip;
mod validation;
mod vault;

use crate::api::{ApiClient, ApiError, HttpTransport, LoginCredentials, RegisterCredentials};
use crate::cli::{
    ActivityCommands, Cli, Commands, ConfigCommands, DocCommands, TripCommands, prompt,
};
use crate::config::Config;
use crate::db::Database;
use crate::itinerary::format::{format_currency, format_date_range};
use crate::itinerary::route::place_pins;
use crate::itinerary::{DayBucket, trip_buckets};
use crate::planner::{SubmitError, submit_activity, submit_trip};
use crate::session::Session;
use crate::trip::Trip;
use crate::validation::{ActivityForm, TripForm};
use crate::vault::{DocumentVault, UploadFile};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => handle_config_command(command),
        Commands::Doctor => handle_doctor(),
        command => {
            let config = Config::load_or_default()?;
            let database = Database::open(&config.db_path)?;
            let mut session = Session::load(&database)?;
            run_command(command, &config, &database, &mut session).await
        }
    }
}

async fn run_command(
    command: Commands,
    config: &Config,
    database: &Database,
    session: &mut Session<'_>,
) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = prompt::password(password, false)?;
            let client = api_client(config, session)?;
            let result = client
                .login(&LoginCredentials {
                    email,
                    password: Some(password),
                })
                .await;
            let user = settle(&client, session, result)?;
            println!("Signed in as {} <{}>", user.name, user.email);
            session.set_user(user)
        }
        Commands::Register {
            email,
            name,
            password,
        } => {
            let password = prompt::password(password, true)?;
            let client = api_client(config, session)?;
            let result = client
                .register(&RegisterCredentials {
                    email,
                    password: Some(password),
                    name,
                })
                .await;
            let user = settle(&client, session, result)?;
            println!("Account created for {} <{}>", user.name, user.email);
            session.set_user(user)
        }
        Commands::Logout => {
            let client = api_client(config, session)?;
            if let Err(error) = client.logout().await {
                warn!(error = %error, "logout request failed; clearing local session anyway");
            }
            session.logout()?;
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            match session.user() {
                Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
                None => println!("Not signed in. Run `wanderlog login --email <EMAIL>`."),
            }
            Ok(())
        }
        Commands::Trips { command } => handle_trip_command(command, config, session).await,
        Commands::Activity { command } => {
            handle_activity_command(command, config, session).await
        }
        Commands::Docs { command } => handle_doc_command(command, database, session),
        Commands::Config { .. } | Commands::Doctor => Ok(()),
    }
}

async fn handle_trip_command(
    command: TripCommands,
    config: &Config,
    session: &mut Session<'_>,
) -> Result<()> {
    let client = api_client(config, session)?;

    match command {
        TripCommands::List => {
            let result = client.trips().await;
            let trips = settle(&client, session, result)?;

            if trips.is_empty() {
                println!("No trips yet. Create one with `wanderlog trips new`.");
            }
            for trip in &trips {
                let (start, end) = trip.day_range(&Local);
                println!(
                    "#{:<4} {} | {} | {}{}",
                    trip.id,
                    trip.name,
                    trip.destination,
                    format_date_range(start, end),
                    if trip.is_completed { " | completed" } else { "" }
                );
            }
            Ok(())
        }
        TripCommands::Show { id, day, json } => {
            let result = client.trip(id).await;
            let trip = settle(&client, session, result)?;
            let buckets = selected_buckets(&trip, day)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else {
                print_itinerary(&trip, &buckets);
            }
            Ok(())
        }
        TripCommands::New {
            name,
            destination,
            start,
            end,
        } => {
            let form = TripForm {
                name,
                destination,
                start_date: parse_optional_date(start.as_deref())?,
                end_date: parse_optional_date(end.as_deref())?,
            };
            let result = submit_trip(&client, &form, &Local).await;
            let trip = settle_submit(&client, session, result)?;
            println!("Trip #{} created: {}", trip.id, trip.name);
            Ok(())
        }
        TripCommands::Map { id, day, json } => {
            let result = client.trip(id).await;
            let trip = settle(&client, session, result)?;
            let buckets = selected_buckets(&trip, day)?;
            let pins = place_pins(
                buckets
                    .iter()
                    .flat_map(|bucket| bucket.activities.iter().copied())
                    .collect::<Vec<_>>(),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&pins)?);
            } else if pins.is_empty() {
                println!("No map data yet. Add activities to see them appear on your route.");
            } else {
                for pin in &pins {
                    println!(
                        "t={:.2}  left={:>5.1}%  top={:>5.1}%  [{}] {}",
                        pin.t, pin.position.left, pin.position.top, pin.activity_type, pin.name
                    );
                }
            }
            Ok(())
        }
    }
}

async fn handle_activity_command(
    command: ActivityCommands,
    config: &Config,
    session: &mut Session<'_>,
) -> Result<()> {
    let client = api_client(config, session)?;

    match command {
        ActivityCommands::Add {
            trip,
            day,
            name,
            activity_type,
            location,
            start,
            end,
            cost,
            currency,
            notes,
        } => {
            let result = client.trip(trip).await;
            let trip = settle(&client, session, result)?;
            let form = ActivityForm {
                trip_id: trip.id,
                name,
                location,
                activity_type,
                start_time: start,
                end_time: end,
                cost,
                currency,
                notes,
                is_completed: false,
            };

            let result = submit_activity(&client, &trip, day, &form, &Local).await;
            let activity = settle_submit(&client, session, result)?;
            println!(
                "Activity #{} added to day {day} of {}: {}",
                activity.id, trip.name, activity.name
            );
            Ok(())
        }
        ActivityCommands::Delete { id, trip } => {
            let result = client.delete_activity(id, trip).await;
            settle(&client, session, result)?;
            println!("Activity #{id} deleted");
            Ok(())
        }
    }
}

fn handle_doc_command(
    command: DocCommands,
    database: &Database,
    session: &Session<'_>,
) -> Result<()> {
    let vault = DocumentVault::new(database);

    match command {
        DocCommands::Upload { trip, path, mime } => {
            let file = UploadFile::from_path(&path, mime.as_deref())?;
            let saved = vault.upload(session, trip, file)?;
            println!("Document saved to vault: {} ({})", saved.name, saved.id);
            Ok(())
        }
        DocCommands::List { trip } => {
            if session.user().is_none() {
                let stored = database.documents_for_trip(trip)?.len();
                println!(
                    "Not signed in. {stored} document(s) stored locally for trip #{trip}; sign in to list yours."
                );
                return Ok(());
            }

            let documents = vault.list(session, trip)?;
            if documents.is_empty() {
                println!("No documents for trip #{trip}");
            }
            for document in &documents {
                println!(
                    "{}  {:<32} {:<16} {:>9} bytes",
                    document.id, document.name, document.mime_type, document.size
                );
            }
            Ok(())
        }
        DocCommands::Delete { id, yes } => {
            if !yes && !prompt::confirm(&format!("Delete document {id}?"))? {
                println!("Cancelled");
                return Ok(());
            }
            vault.delete(&id)?;
            println!("Document deleted");
            Ok(())
        }
        DocCommands::Export { id, destination } => {
            let written = vault.export(&id, &destination)?;
            println!("Document written to {}", written.display());
            Ok(())
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_or_default()?;
            config.set_value(&key, &value)?;
            config.save()?;
            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_or_default()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[OK] config.json not found, using defaults: {}", config_path.display());
    }

    let config = Config::load_or_default()?;
    println!("[OK] API base URL: {}", config.resolve_api_base_url());

    match Database::open(&config.db_path) {
        Ok(database) => {
            println!("[OK] SQLite reachable: {}", config.db_path.display());
            match Session::load(&database) {
                Ok(session) => match session.user() {
                    Some(user) => println!("[OK] signed in as {}", user.email),
                    None => println!("[WARN] not signed in"),
                },
                Err(error) => {
                    println!("[WARN] stored session unreadable: {error}");
                    issues.push("session unreadable".to_string());
                }
            }
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn api_client(config: &Config, session: &Session<'_>) -> Result<ApiClient> {
    let cookies = session.cookies()?;
    let transport = HttpTransport::new(
        &config.resolve_api_base_url(),
        Duration::from_secs(config.request_timeout_seconds),
        cookies.as_deref(),
    )?;

    Ok(ApiClient::new(transport))
}

/// Saves the cookie jar and, on an unrecoverable 401, signs the user out.
///
/// The jar is saved on other failures too: a refresh may have rotated the
/// cookies before the replayed request failed.
fn settle<T>(
    client: &ApiClient,
    session: &mut Session<'_>,
    result: Result<T, ApiError>,
) -> Result<T> {
    match result {
        Err(error) if error.is_unauthorized() => {
            info!("session expired; clearing stored credentials");
            session.logout()?;
            Err(anyhow!(error).context("Not signed in. Run `wanderlog login --email <EMAIL>`."))
        }
        result => {
            session.store_cookies(client.transport().saved_cookies().as_deref())?;
            result.map_err(Into::into)
        }
    }
}

fn settle_submit<T>(
    client: &ApiClient,
    session: &mut Session<'_>,
    result: Result<T, SubmitError>,
) -> Result<T> {
    match result {
        Ok(value) => settle(client, session, Ok(value)),
        Err(SubmitError::Api(error)) => settle(client, session, Err(error)),
        Err(SubmitError::Invalid(errors)) => {
            errors
                .errors()
                .iter()
                .for_each(|error| eprintln!("  {}: {}", error.field, error.message));
            Err(anyhow!("Form is invalid; nothing was sent"))
        }
        Err(error) => Err(error.into()),
    }
}

fn selected_buckets(trip: &Trip, day: Option<usize>) -> Result<Vec<DayBucket<'_>>> {
    let buckets = trip_buckets(trip, &Local);

    match day {
        None => Ok(buckets),
        Some(day) => {
            let total = buckets.len();
            let selected = buckets
                .into_iter()
                .filter(|bucket| bucket.day == day)
                .collect::<Vec<_>>();
            if selected.is_empty() {
                return Err(anyhow!("Day {day} is outside the trip ({total} day(s))"));
            }
            Ok(selected)
        }
    }
}

fn print_itinerary(trip: &Trip, buckets: &[DayBucket<'_>]) {
    let (start, end) = trip.day_range(&Local);
    println!("{}", trip.name);
    println!("  {} | {}", trip.destination, format_date_range(start, end));

    for bucket in buckets {
        println!(
            "\nDay {}  {}  ({} places)",
            bucket.day,
            bucket.label(),
            bucket.place_count()
        );

        if bucket.activities.is_empty() {
            println!(
                "  No activities yet. Add the first one with `wanderlog activity add --trip {} --day {}`.",
                trip.id, bucket.day
            );
            continue;
        }

        for activity in &bucket.activities {
            let start_time = activity.start_time.with_timezone(&Local).format("%H:%M");
            let end_time = activity.end_time.with_timezone(&Local).format("%H:%M");
            println!(
                "  {start_time}-{end_time}  [{}] {} @ {}  {}{}",
                activity.activity_type,
                activity.name,
                activity.location,
                format_currency(activity.cost, &activity.currency),
                if activity.is_completed { "  (done)" } else { "" }
            );
            if !activity.notes.trim().is_empty() {
                println!("      {}", activity.notes.trim());
            }
        }
    }
}

fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>> {
    input
        .filter(|value| !value.trim().is_empty())
        .map(|date| {
            NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-12-22"))
        })
        .transpose()
}
