mod config;
mod db;
mod error;
mod metrics;
mod models;
mod narrative;
mod report;
mod state;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use config::Thresholds;
use db::Store;
use models::{OutreachKind, ResponseKind};
use state::ChannelSignal;

#[derive(Parser)]
#[command(name = "asa")]
#[command(about = "Job search analyzer - log applications and outreach, read back behavioral signals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the event store
    Init,

    /// Record a new application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Role title
        #[arg(short, long)]
        role: String,

        /// Application date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Record an outreach attempt for an application
    Outreach {
        /// Application ID
        application_id: i64,

        /// Channel used (email, linkedin, referral, ...)
        #[arg(short, long)]
        channel: String,

        /// Mark as a follow-up rather than initial contact
        #[arg(long)]
        follow_up: bool,

        /// Event date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a market response for an application
    Response {
        /// Application ID
        application_id: i64,

        /// Response kind (acknowledgement, rejection, interview, offer)
        #[arg(short, long)]
        kind: String,

        /// Channel the response arrived through, if known
        #[arg(short, long)]
        channel: Option<String>,

        /// Event date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// List applications with their current state
    List,

    /// Show state and narrative for one application
    Show {
        /// Application ID
        application_id: i64,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Portfolio-wide report: state distribution, channel signals, narrative
    Report {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = Store::open()?;
    let thresholds = Thresholds::default();
    // One clock per invocation; every snapshot in a pass sees the same T.
    let eval_at = Utc::now();

    match cli.command {
        Commands::Init => {
            store.init()?;
            println!("Event store initialized at {}", store.path().display());
        }

        Commands::Add { company, role, date } => {
            store.ensure_initialized()?;
            let at = event_time(date.as_deref(), eval_at)?;
            let id = store.add_application(&company, &role, at)?;
            println!("Added application #{id} ({company} - {role})");
        }

        Commands::Outreach {
            application_id,
            channel,
            follow_up,
            date,
        } => {
            store.ensure_initialized()?;
            let at = event_time(date.as_deref(), eval_at)?;
            let kind = if follow_up {
                OutreachKind::FollowUp
            } else {
                OutreachKind::Initial
            };
            store.add_outreach(application_id, &channel, kind, at)?;
            println!(
                "Logged {} outreach on '{}' for application #{}",
                kind.as_str(),
                channel,
                application_id
            );
        }

        Commands::Response {
            application_id,
            kind,
            channel,
            date,
        } => {
            store.ensure_initialized()?;
            let at = event_time(date.as_deref(), eval_at)?;
            let kind = ResponseKind::parse(&kind)
                .ok_or_else(|| anyhow!("Unknown response kind: {kind}"))?;
            store.add_response(application_id, channel.as_deref(), kind, at)?;
            println!(
                "Logged {} response for application #{}",
                kind.as_str(),
                application_id
            );
        }

        Commands::List => {
            store.ensure_initialized()?;
            let ids = store.list_application_ids()?;
            if ids.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<20} {:<24} {:<12} {:<10}",
                    "ID", "COMPANY", "ROLE", "APPLIED", "STATE"
                );
                println!("{}", "-".repeat(76));
                for id in ids {
                    let events = store.get_events(id)?;
                    let app = &events.application;
                    match report::application_report(&store, id, &thresholds, eval_at) {
                        Ok(r) => println!(
                            "{:<6} {:<20} {:<24} {:<12} {:<10}",
                            id,
                            truncate(&app.company, 18),
                            truncate(&app.role, 22),
                            app.applied_at.format("%Y-%m-%d"),
                            r.state
                        ),
                        Err(e) => println!(
                            "{:<6} {:<20} {:<24} {:<12} error: {}",
                            id,
                            truncate(&app.company, 18),
                            truncate(&app.role, 22),
                            app.applied_at.format("%Y-%m-%d"),
                            e
                        ),
                    }
                }
            }
        }

        Commands::Show {
            application_id,
            json,
        } => {
            store.ensure_initialized()?;
            let r = report::application_report(&store, application_id, &thresholds, eval_at)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&r)?);
            } else {
                let events = store.get_events(application_id)?;
                let app = &events.application;
                println!("Application #{} - {} ({})", r.application_id, app.company, app.role);
                println!("Applied: {}", app.applied_at.format("%Y-%m-%d"));
                println!("State: {}", r.state);
                println!();
                for sentence in &r.narrative {
                    println!("{}", textwrap::fill(sentence, 72));
                }
                println!("\nHistory:");
                for event in events.timeline() {
                    match event {
                        models::Event::Application(a) => {
                            println!("  {}  applied", a.applied_at.format("%Y-%m-%d"))
                        }
                        models::Event::Outreach(o) => println!(
                            "  {}  {} outreach via {}",
                            o.at.format("%Y-%m-%d"),
                            o.kind.as_str(),
                            o.channel
                        ),
                        models::Event::Response(resp) => {
                            let via = resp
                                .channel
                                .as_deref()
                                .map(|c| format!(" via {c}"))
                                .unwrap_or_default();
                            println!(
                                "  {}  {} response{}",
                                resp.at.format("%Y-%m-%d"),
                                resp.kind.as_str(),
                                via
                            )
                        }
                    }
                }
            }
        }

        Commands::Report { json } => {
            store.ensure_initialized()?;
            let r = report::portfolio_report(&store, &thresholds, eval_at)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&r)?);
            } else {
                if let Some(pattern) = r.pattern {
                    println!("Portfolio pattern: {pattern}\n");
                }
                println!("Applications by state:");
                if r.state_distribution.is_empty() {
                    println!("  (none)");
                }
                for (state, count) in &r.state_distribution {
                    println!("  {:<10} {}", state, count);
                }

                println!("\nChannel signals:");
                if r.channel_signal_distribution.is_empty() {
                    println!("  (none)");
                }
                for (channel, signal) in &r.channel_signal_distribution {
                    println!("  {:<16} {}", channel, signal);
                }

                // Channels with nothing to say stay quiet.
                let speaking: Vec<_> = r
                    .channel_signal_distribution
                    .iter()
                    .filter(|(_, signal)| **signal != ChannelSignal::NoSignal)
                    .collect();
                if !speaking.is_empty() {
                    println!();
                    for (channel, signal) in speaking {
                        println!(
                            "{}: {}",
                            channel,
                            textwrap::fill(narrative::channel_sentence(*signal), 72)
                        );
                    }
                }

                if !r.narrative.is_empty() {
                    println!();
                    for sentence in &r.narrative {
                        println!("{}", textwrap::fill(sentence, 72));
                    }
                }

                if !r.skipped.is_empty() {
                    println!("\nSkipped:");
                    for s in &r.skipped {
                        println!("  {}: {}", s.entity, s.reason);
                    }
                }
            }
        }
    }

    Ok(())
}

fn event_time(date: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match date {
        None => Ok(now),
        Some(raw) => {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))?;
            let midday = day
                .and_hms_opt(12, 0, 0)
                .ok_or_else(|| anyhow!("Invalid time of day"))?;
            Ok(DateTime::from_naive_utc_and_offset(midday, Utc))
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Müller Straße GmbH", 10), "Müller ...");
        // Cutting mid-name must never split a multi-byte character.
        assert_eq!(truncate("日本語のテスト会社", 5), "日本...");
    }
}
