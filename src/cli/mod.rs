//! Command-line interface for workflow-outbox.
//!
//! Provides commands for translating record transitions into the outbox,
//! inspecting pending events, acknowledging delivered ones, and decoding payloads.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::core::{codec, JsonlOutbox, OutboxStore, TopicNamer};
use crate::domain::{RunState, WireRecord};

/// workflow-outbox - Transactional outbox for workflow record transitions
#[derive(Parser, Debug)]
#[command(name = "workflow-outbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a record transition and store it in the outbox
    Translate {
        /// Record JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Run state the record is transitioning from (0 for a first transition)
        #[arg(short, long, default_value = "0")]
        previous_run_state: i32,

        /// Print the encoded payload instead of storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Decode a hex-encoded payload
    Decode {
        /// Payload bytes as hex
        payload: String,
    },

    /// List events waiting to be published
    Pending {
        /// Maximum number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Remove a delivered event from the outbox
    Ack {
        /// Outbox event ID
        id: i64,
    },

    /// Show the topic for a workflow status
    Topic {
        workflow_name: String,
        status: i32,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Translate {
                input,
                previous_run_state,
                dry_run,
            } => translate(input, previous_run_state, dry_run).await,
            Commands::Decode { payload } => decode_payload(&payload),
            Commands::Pending { limit } => list_pending(limit).await,
            Commands::Ack { id } => ack(id).await,
            Commands::Topic {
                workflow_name,
                status,
            } => show_topic(&workflow_name, status),
            Commands::Config => show_config(),
        }
    }
}

/// Read the record JSON from a file or piped stdin
fn read_record(input_file: Option<PathBuf>) -> Result<WireRecord> {
    let raw = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe a record to stdin");
    };

    let record: WireRecord =
        serde_json::from_str(&raw).context("Failed to parse record JSON")?;
    record.validate()?;
    Ok(record)
}

/// Translate a record and store (or print) the result
async fn translate(input: Option<PathBuf>, previous_run_state: i32, dry_run: bool) -> Result<()> {
    let record = read_record(input)?;
    let previous_run_state = RunState::try_from(previous_run_state)?;

    let translator = crate::config::config()?.translator();
    let data = translator.translate(&record, previous_run_state)?;

    if dry_run {
        println!("{}", hex::encode(&data.data));
        return Ok(());
    }

    let store = JsonlOutbox::open_default().await?;
    let event = store.insert(data).await?;

    info!(
        id = event.id,
        foreign_id = %record.foreign_id,
        status = record.status,
        "Transition queued"
    );
    println!("{}", event.id);

    Ok(())
}

/// Print a decoded payload as JSON
fn decode_payload(payload: &str) -> Result<()> {
    let bytes = hex::decode(payload.trim()).context("Payload is not valid hex")?;
    let record = codec::decode(&bytes)?;

    let json = serde_json::json!({
        "foreign_id": record.foreign_id,
        "type": record.r#type,
        "headers": record.headers,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}

/// List pending events as connector events, one JSON object per line
async fn list_pending(limit: usize) -> Result<()> {
    let store = JsonlOutbox::open_default().await?;
    let events = store.list(limit).await?;

    if events.is_empty() {
        eprintln!("No pending events");
        return Ok(());
    }

    for event in events {
        let connector_event = event
            .to_connector_event()
            .with_context(|| format!("Failed to decode outbox event {}", event.id))?;
        println!("{}", serde_json::to_string(&connector_event)?);
    }

    Ok(())
}

/// Acknowledge a delivered event
async fn ack(id: i64) -> Result<()> {
    let store = JsonlOutbox::open_default().await?;

    if !store.delete(id).await? {
        anyhow::bail!("Outbox event not found: {}", id);
    }

    eprintln!("Acknowledged {}", id);
    Ok(())
}

fn show_topic(workflow_name: &str, status: i32) -> Result<()> {
    let translator = crate::config::config()?.translator();
    println!("{}", translator.topics().topic(workflow_name, status));
    Ok(())
}

fn show_config() -> Result<()> {
    let config = crate::config::config()?;

    println!("Home: {}", config.home.display());
    println!("Outbox log: {}", config.home.join("outbox.jsonl").display());
    println!("Topic separator: {:?}", config.topic_separator);
    println!("Max payload bytes: {}", config.max_payload_bytes);
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none)"),
    }

    Ok(())
}
