//! Jobly command-line client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobly_client::{ClientConfig, FileCredentialStore, JoblyClient, SessionManager};
use jobly_models::{JobCategory, JobFilters, JobId, JobType};

#[derive(Parser)]
#[command(name = "jobly", version, about = "Browse and manage Jobly from the terminal")]
struct Cli {
    /// Credential file (defaults to JOBLY_CREDENTIALS_PATH or ~/.jobly/credentials.json)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBLY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    #[command(subcommand)]
    Jobs(JobsCommand),
    #[command(subcommand)]
    Applications(ApplicationsCommand),
    #[command(subcommand)]
    Reviews(ReviewsCommand),
}

#[derive(Subcommand)]
enum JobsCommand {
    /// List open jobs
    List(JobListArgs),
    /// Show one job
    Show { id: JobId },
}

#[derive(Args)]
struct JobListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long, value_parser = parse_snake_case::<JobCategory>)]
    category: Option<JobCategory>,
    #[arg(long, value_parser = parse_snake_case::<JobType>)]
    job_type: Option<JobType>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// e.g. -created_at or salary
    #[arg(long)]
    ordering: Option<String>,
}

impl From<JobListArgs> for JobFilters {
    fn from(args: JobListArgs) -> Self {
        JobFilters {
            page: args.page,
            page_size: args.page_size,
            category: args.category,
            job_type: args.job_type,
            location: args.location,
            search: args.search,
            ordering: args.ordering,
        }
    }
}

#[derive(Subcommand)]
enum ApplicationsCommand {
    /// Applications you have submitted
    Mine,
    /// Counts by status
    Summary,
}

#[derive(Subcommand)]
enum ReviewsCommand {
    /// Best rated recruiters
    Top {
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Parse a snake_case API value (e.g. `full_time`) into its enum.
fn parse_snake_case<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown value: {raw}"))
}

fn default_credentials_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".jobly")
        .join("credentials.json")
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Stdout carries the JSON results; logs go to stderr.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let store = match cli.credentials {
        Some(path) => FileCredentialStore::open(path),
        None => FileCredentialStore::from_env(default_credentials_path()),
    }
    .context("Failed to open credential store")?;
    info!(path = %store.path().display(), "Using credential file");

    let config = ClientConfig::from_env().context("Invalid client configuration")?;
    let client = JoblyClient::builder(config, Arc::new(store))
        .on_session_expired(|| warn!("Session expired, run `jobly login` to sign in again"))
        .build()?;
    let session = SessionManager::new(client.clone());

    match cli.command {
        Command::Login { email, password } => {
            let user = session
                .login(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("Login failed: {}", e.api_message()))?;
            print_json(&user)?;
        }
        Command::Logout => {
            session.logout().await?;
            print_json(&serde_json::json!({ "message": "Signed out" }))?;
        }
        Command::Whoami => match session.refresh_user().await? {
            Some(user) => print_json(&user)?,
            None => anyhow::bail!("Not signed in"),
        },
        Command::Jobs(JobsCommand::List(args)) => {
            print_json(&client.jobs().list(&args.into()).await?)?;
        }
        Command::Jobs(JobsCommand::Show { id }) => {
            print_json(&client.jobs().get(id).await?)?;
        }
        Command::Applications(ApplicationsCommand::Mine) => {
            print_json(&client.applications().my_applications().await?)?;
        }
        Command::Applications(ApplicationsCommand::Summary) => {
            print_json(&client.applications().status_summary().await?)?;
        }
        Command::Reviews(ReviewsCommand::Top { limit }) => {
            print_json(&client.reviews().top_recruiters(limit).await?)?;
        }
    }

    Ok(())
}
