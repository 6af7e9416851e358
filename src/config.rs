//! Resolve the bot token and destination channel.
//!
//! A JSON config file wins over the environment, which may itself be seeded
//! from a `.env` file. The channel can additionally be overridden on the
//! command line. Either field missing from the file is looked up in the
//! environment independently.

use crate::slack::{api::Endpoints, auth::SlackAccessToken, channel::ChannelId};
use serde::Deserialize;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const TOKEN_VAR: &str = "SLACK_BOT_TOKEN";
pub const CHANNEL_VAR: &str = "SLACK_CHANNEL_ID";
pub const API_BASE_VAR: &str = "SLACK_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("SLACK_BOT_TOKEN is not set.")]
    MissingToken,
    #[error("Channel ID is missing.")]
    MissingChannel,
}

/// Everything needed to authenticate and aim a run. Never logged unmasked;
/// see [SlackAccessToken].
#[derive(Debug)]
pub struct Credentials {
    pub token: SlackAccessToken,
    pub channel_id: ChannelId,
}

/// The config file's shape. Both casings are accepted, upper case first, and
/// scalar values are read as text.
#[derive(Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "SLACK_BOT_TOKEN", default, deserialize_with = "crate::de::loose_string")]
    token_upper: Option<String>,
    #[serde(rename = "slack_bot_token", default, deserialize_with = "crate::de::loose_string")]
    token_lower: Option<String>,
    #[serde(rename = "SLACK_CHANNEL_ID", default, deserialize_with = "crate::de::loose_string")]
    channel_upper: Option<String>,
    #[serde(rename = "slack_channel_id", default, deserialize_with = "crate::de::loose_string")]
    channel_lower: Option<String>,
}

impl ConfigFile {
    /// A missing file is the same as an empty one.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(x) => x,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.to_owned(),
            source,
        })
    }

    fn token(&self) -> Option<String> {
        present(self.token_upper.clone()).or_else(|| present(self.token_lower.clone()))
    }

    fn channel(&self) -> Option<String> {
        present(self.channel_upper.clone()).or_else(|| present(self.channel_lower.clone()))
    }
}

/// Resolve credentials. `env` looks up an environment variable, and is
/// injected so that resolution can be tested without touching the process
/// environment.
pub fn resolve<F>(
    config_path: &Path,
    channel_override: Option<&str>,
    env: F,
) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = ConfigFile::load(config_path)?;

    let token = file
        .token()
        .or_else(|| present(env(TOKEN_VAR)))
        .ok_or(ConfigError::MissingToken)?;

    let channel = present(channel_override.map(str::to_owned))
        .or_else(|| file.channel())
        .or_else(|| present(env(CHANNEL_VAR)))
        .ok_or(ConfigError::MissingChannel)?;

    Ok(Credentials {
        token: SlackAccessToken(token),
        channel_id: ChannelId(channel),
    })
}

/// The Slack API, unless the environment points us elsewhere.
pub fn endpoints<F>(env: F) -> Endpoints
where
    F: Fn(&str) -> Option<String>,
{
    present(env(API_BASE_VAR))
        .map(Endpoints::new)
        .unwrap_or_default()
}

/// Treat blank values as absent.
fn present(x: Option<String>) -> Option<String> {
    x.filter(|s| !s.trim().is_empty())
}
