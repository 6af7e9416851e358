use crate::{config::DEFAULT_CONFIG_PATH, slack::message::LinkStyle};
use clap::Parser;
use std::path::PathBuf;

/// Upload a PDF to a Slack channel and post a link to it.
#[derive(Parser, Debug)]
#[command(name = "upload", version)]
pub struct Cli {
    /// Path to the PDF file to upload
    #[arg(long)]
    pub file: String,

    /// Slack channel ID (overrides config.json/.env)
    #[arg(long)]
    pub channel: Option<String>,

    /// Optional initial comment
    #[arg(long)]
    pub comment: Option<String>,

    /// Link text for the announcement (defaults to the file's title)
    #[arg(long)]
    pub label: Option<String>,

    /// How the announcement renders its link
    #[arg(long, value_enum, default_value_t = LinkStyle::Rich)]
    pub style: LinkStyle,

    /// Config file holding the bot token and channel ID
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print debug HTTP requests
    #[arg(long)]
    pub debug: bool,
}
