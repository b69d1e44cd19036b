//! Command-line interface.
//!
//! `dispatch` is the scheduled entry point, invoked by an external trigger
//! (cron); the remaining commands are operator diagnostics. Reports print
//! as JSON on stdout with exit code 0; failures print `{"error": ...}` and
//! exit non-zero.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::adapters::{CapiClient, EventSink, MetabaseClient, RowSource};
use crate::config;
use crate::core::dispatcher::Dispatcher;
use crate::core::identity::hash_identity;
use crate::domain::{ConversionEvent, DedupKey};
use crate::ledger;

/// capi-relay - idempotent conversion-event dispatcher
#[derive(Parser, Debug)]
#[command(name = "capi-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one dispatch pass (the scheduled entry point)
    Dispatch,

    /// Send one synthetic event, bypassing the ledger and eligibility filter
    ///
    /// Endpoint verification only; never part of the scheduled path.
    Fire {
        /// E.164 identity to hash into the event
        #[arg(long)]
        e164: String,

        /// Session identifier seeding the event id
        #[arg(long)]
        session_id: String,

        /// Experiment label
        #[arg(long, default_value = "default")]
        experiment_label: String,

        /// Source URL attached to the event
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Fetch and print the current candidate rows from the analytics source
    Fetch,

    /// Show resolved configuration with secrets redacted (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Dispatch => dispatch().await,
            Commands::Fire {
                e164,
                session_id,
                experiment_label,
                source_url,
            } => fire(&e164, &session_id, &experiment_label, source_url).await,
            Commands::Fetch => fetch().await,
            Commands::Config => show_config(),
        }
    }
}

/// Run one dispatch pass and report the outcome as JSON
async fn dispatch() -> Result<()> {
    let cfg = config::config()?;

    let source = MetabaseClient::new(cfg.metabase.clone());
    let sink = CapiClient::new(cfg.meta.clone());
    let ledger = match ledger::acquire(&cfg.redis_url).await {
        Ok(ledger) => ledger,
        Err(e) => return fail(&e.to_string()),
    };

    let dispatcher = Dispatcher::new(
        &source,
        ledger,
        &sink,
        cfg.test_numbers.clone(),
        cfg.meta.action_source.clone(),
    );

    match dispatcher.run().await {
        Ok(report) => {
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
        Err(e) => fail(&e.to_string()),
    }
}

/// Send a single synthetic event for endpoint verification
async fn fire(
    e164: &str,
    session_id: &str,
    experiment_label: &str,
    source_url: Option<String>,
) -> Result<()> {
    let cfg = config::config()?;
    let sink = CapiClient::new(cfg.meta.clone());

    let key = DedupKey::new(session_id, Some(experiment_label));
    let event = ConversionEvent::build(
        &key,
        hash_identity(e164),
        6, // one past the activity threshold
        source_url,
        &cfg.meta.action_source,
        Utc::now().timestamp(),
    );

    let batch = vec![event];
    match sink.send(&batch).await {
        Ok(out) => {
            println!(
                "{}",
                json!({ "ok": true, "out": out, "sent": { "data": batch } })
            );
            Ok(())
        }
        Err(e) => fail(&format!("{:#}", e)),
    }
}

/// Fetch and print candidate rows without filtering or dispatching
async fn fetch() -> Result<()> {
    let cfg = config::config()?;
    let source = MetabaseClient::new(cfg.metabase.clone());

    match source.fetch_rows().await {
        Ok(rows) => {
            println!("{}", json!({ "rows": rows }));
            Ok(())
        }
        Err(e) => fail(&format!("{:#}", e)),
    }
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Analytics source:");
    println!("  Site:        {}", cfg.metabase.site_url);
    println!("  Question:    {}", cfg.metabase.question_id);
    println!("  Token:       {}", redact(&cfg.metabase.token));
    println!(
        "  Date range:  {} .. {}",
        display_opt(&cfg.metabase.date_start),
        display_opt(&cfg.metabase.date_end)
    );
    println!("  Bot id:      {}", display_opt(&cfg.metabase.bot_id));
    println!();
    println!("Attribution endpoint:");
    println!("  Pixel:          {}", cfg.meta.pixel_id);
    println!("  Access token:   {}", redact(&cfg.meta.access_token));
    println!("  Test mode:      {}", cfg.meta.test_event_code.is_some());
    println!("  Action source:  {}", cfg.meta.action_source);
    println!();
    println!("Ledger:");
    println!("  Store:            {}", host_part(&cfg.redis_url));
    println!("  Excluded numbers: {}", cfg.test_numbers.len());

    Ok(())
}

/// Print an error report and exit with a failing status
fn fail(message: &str) -> Result<()> {
    println!("{}", json!({ "error": message }));
    std::process::exit(1);
}

fn display_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}

fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Strip any credentials from a connection URL for display
fn host_part(url: &str) -> &str {
    url.rsplit('@').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_keeps_prefix_only() {
        assert_eq!(redact("supersecrettoken"), "supe****");
        assert_eq!(redact("ab"), "ab****");
    }

    #[test]
    fn test_host_part_drops_credentials() {
        assert_eq!(host_part("redis://user:pw@cache:6379"), "cache:6379");
        assert_eq!(host_part("redis://cache:6379"), "redis://cache:6379");
    }
}
