//! Publish a PDF to a Slack channel: join the channel, upload the file, and
//! post a link to it.
//!
//! Uploads go through `files.uploadV2` where it's available and otherwise
//! through Slack's external upload flow. See [upload] for the sequencing and
//! [config] for where the token and channel come from.

use clap::Parser;
use cli::Cli;
use dotenvy::dotenv;
use error::Failure;
use slack::{api::SlackClient, audit::Auditor};
use std::{env, process::ExitCode};
use tracing::{debug, Level};
use upload::{Job, Report};

mod cli;
mod config;
mod console;
mod de;
mod error;
mod slack;
mod target;
mod upload;

/// Application entrypoint. Initialises tracing, loads any `.env`, and runs a
/// single upload. Every remote call happens in sequence, so one thread will
/// do.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.debug { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let has_dotenv = dotenv().is_ok();
    if !has_dotenv {
        debug!("No .env found");
    }

    match publish(&args).await {
        Ok(report) => {
            debug!(
                member = report.member,
                route = ?report.uploaded.route,
                trail = ?report.uploaded.trail,
                posted = report.notification.posted,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            console::error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn publish(args: &Cli) -> Result<Report, Failure> {
    let lookup = |k: &str| env::var(k).ok();

    let creds = config::resolve(&args.config, args.channel.as_deref(), lookup)?;
    debug!(token = ?creds.token, channel = %creds.channel_id, "Resolved credentials");

    let home = dirs::home_dir();
    let job = Job {
        path: target::expand_home(&args.file, home.as_deref()),
        comment: args.comment.clone(),
        label: args.label.clone(),
        style: args.style,
    };

    let client = SlackClient::new(config::endpoints(lookup), creds.token, Auditor::new(args.debug));

    upload::run(&client, &creds.channel_id, &job).await
}
