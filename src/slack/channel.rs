//! Interact with Slack channels, including the ability to programmatically
//! join them.

use super::{api::*, error::SlackError};
use crate::console;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Channels are referred to by their underlying ID. This can be found in the
/// UI by copying a link to the channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// <https://api.slack.com/methods/conversations.join#args>
#[derive(Serialize)]
struct JoinRequest<'a> {
    channel: &'a ChannelId,
}

/// <https://api.slack.com/methods/conversations.join#examples>
#[derive(Deserialize)]
struct JoinResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
}

/// What an operator can do about a failed join.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinHint {
    AddScope,
    InviteManually,
}

impl JoinHint {
    pub fn from_error(code: &str) -> Option<Self> {
        match code {
            "missing_scope" => Some(JoinHint::AddScope),
            "method_not_supported_for_channel_type" | "channel_not_found" => {
                Some(JoinHint::InviteManually)
            }
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JoinHint::AddScope => "Add 'channels:join' scope to the bot and reinstall the app.",
            JoinHint::InviteManually => "If this is a private channel, invite the bot manually.",
        }
    }
}

impl SlackClient {
    /// Bots must be in a channel before they can share files to it.
    pub async fn join_channel(&self, channel: &ChannelId) -> Result<(), SlackError> {
        let body = JoinRequest { channel };

        self.record(
            &self
                .audited(ApiMethod::Join, "POST")
                .data(serde_json::json!({ "channel": channel })),
        );

        send(self.post(ApiMethod::Join).json(&body))
            .await?
            .decode::<JoinResponse>()
            .map(|_| ())
    }

    /// Best-effort join. Failures are reported with a hint where we have one,
    /// and never stop the caller.
    pub async fn ensure_member(&self, channel: &ChannelId) -> bool {
        match self.join_channel(channel).await {
            Ok(()) => {
                info!(channel = %channel, "Joined channel");
                true
            }
            Err(e) if e.api_error() == Some("already_in_channel") => {
                debug!(channel = %channel, "Already in channel");
                true
            }
            Err(e) => {
                report_join_failure(&e);
                false
            }
        }
    }
}

fn report_join_failure(e: &SlackError) {
    let method = ApiMethod::Join;

    match e {
        SlackError::Api { error, payload } => match JoinHint::from_error(error) {
            Some(hint) => console::hint(hint.message()),
            None => console::warning(&format!("{} failed: {}", method, payload)),
        },
        SlackError::Status { status, body } => {
            console::warning(&format!("{} HTTP {}: {}", method, status, body))
        }
        SlackError::Malformed => {
            console::warning(&format!("{} returned non-JSON response", method))
        }
        SlackError::Request(e) => {
            console::warning(&format!("{} request failed: {}", method, e))
        }
        SlackError::Protocol { payload } => {
            console::warning(&format!("{} failed: {}", method, payload))
        }
    }
}
