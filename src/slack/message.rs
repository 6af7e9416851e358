//! Announce an uploaded file in a channel.

use super::{
    api::*,
    block::*,
    channel::ChannelId,
    error::SlackError,
    file::{FileDescriptor, FileId},
};
use crate::console;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How the notification renders its link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LinkStyle {
    /// A single mrkdwn line.
    Plain,
    /// Block Kit, with the file ID as a secondary reference. The plain line
    /// is still sent for notifications and clients without block support.
    #[default]
    Rich,
}

/// What the notification points at: the permalink where we have one,
/// otherwise the bare file ID.
#[derive(Debug, PartialEq, Eq)]
pub enum ArtifactLink<'a> {
    Permalink { url: &'a str, file_id: &'a FileId },
    FileId(&'a FileId),
}

impl<'a> From<&'a FileDescriptor> for ArtifactLink<'a> {
    fn from(d: &'a FileDescriptor) -> Self {
        match &d.permalink {
            Some(url) => ArtifactLink::Permalink {
                url,
                file_id: &d.file_id,
            },
            None => ArtifactLink::FileId(&d.file_id),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct NotificationResult {
    pub posted: bool,
}

/// <https://api.slack.com/methods/chat.postMessage#args>
#[derive(Serialize)]
struct MessageRequest<'a> {
    channel: &'a ChannelId,
    // Used for notifications in the presence of `blocks`.
    text: String,
    mrkdwn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<Block>>,
}

/// <https://api.slack.com/methods/chat.postMessage#examples>
#[derive(Deserialize)]
struct MessageResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
}

impl SlackClient {
    /// Post a message linking to an uploaded file. Failure is reported but
    /// never fatal; the file exists either way.
    pub async fn notify(
        &self,
        channel: &ChannelId,
        link: &ArtifactLink<'_>,
        label: &str,
        style: LinkStyle,
    ) -> NotificationResult {
        match self.post_message(channel, link, label, style).await {
            Ok(()) => {
                info!(channel = %channel, "Posted file link");
                console::status("Message with file link posted successfully.");
                NotificationResult { posted: true }
            }
            Err(e) => {
                console::warning(&format!("Failed to post message: {}", e));
                NotificationResult { posted: false }
            }
        }
    }

    async fn post_message(
        &self,
        channel: &ChannelId,
        link: &ArtifactLink<'_>,
        label: &str,
        style: LinkStyle,
    ) -> Result<(), SlackError> {
        let method = ApiMethod::PostMessage;
        let body = MessageRequest {
            channel,
            text: build_text(link, label),
            mrkdwn: true,
            blocks: match style {
                LinkStyle::Plain => None,
                LinkStyle::Rich => Some(build_blocks(link, label)),
            },
        };

        self.record(
            &self
                .audited(method, "POST")
                .header("Content-Type", "application/json")
                .data(serde_json::to_value(&body).unwrap_or_default()),
        );

        send(self.post(method).json(&body))
            .await?
            .decode::<MessageResponse>()
            .map(|_| ())
    }
}

/// The plain line, also used as the notification text alongside blocks.
fn build_text(link: &ArtifactLink, label: &str) -> String {
    match link {
        ArtifactLink::Permalink { url, .. } => {
            format!("<{}|{}> uploaded successfully!", url, escape(label))
        }
        ArtifactLink::FileId(id) => {
            format!("{} uploaded successfully (file id: {}).", escape(label), id)
        }
    }
}

fn build_blocks(link: &ArtifactLink, label: &str) -> Vec<Block> {
    match link {
        ArtifactLink::Permalink { url, file_id } => vec![
            Block::Section(TextBlock::Mrkdwn(format!(
                "*<{}|{}>* uploaded successfully!",
                url,
                escape(label)
            ))),
            Block::Context(vec![TextBlock::Mrkdwn(format!("File ID: `{}`", file_id))]),
        ],
        ArtifactLink::FileId(id) => vec![
            Block::Section(TextBlock::Plaintext(format!("{} uploaded successfully.", label))),
            Block::Context(vec![TextBlock::Mrkdwn(format!(
                "File ID: `{}` (permalink unavailable)",
                id
            ))]),
        ],
    }
}

/// Slack only requires these three to be escaped in mrkdwn.
///
/// <https://api.slack.com/reference/surfaces/formatting#escaping>
fn escape(x: &str) -> String {
    x.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::{audit::Auditor, auth::SlackAccessToken};
    use mockito::Matcher;
    use serde_json::json;

    async fn server() -> mockito::ServerGuard {
        mockito::Server::new_async().await
    }

    fn client(base: String) -> SlackClient {
        SlackClient::new(
            Endpoints::new(base),
            SlackAccessToken("xoxb-foobar".into()),
            Auditor::default(),
        )
    }

    fn descriptor(permalink: Option<&str>) -> FileDescriptor {
        FileDescriptor {
            file_id: FileId("F123".into()),
            permalink: permalink.map(str::to_owned),
            title: "report.pdf".into(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("Q&A <draft>"), "Q&amp;A &lt;draft&gt;");
    }

    #[test]
    fn test_build_text() {
        let with = descriptor(Some("https://example.slack.com/files/F123"));
        assert_eq!(
            build_text(&ArtifactLink::from(&with), "report.pdf"),
            "<https://example.slack.com/files/F123|report.pdf> uploaded successfully!"
        );

        let without = descriptor(None);
        assert_eq!(
            build_text(&ArtifactLink::from(&without), "report.pdf"),
            "report.pdf uploaded successfully (file id: F123)."
        );
    }

    #[test]
    fn test_build_blocks_carries_file_id() {
        let d = descriptor(Some("https://example.slack.com/files/F123"));
        let blocks = serde_json::to_value(build_blocks(&ArtifactLink::from(&d), "report.pdf")).unwrap();

        assert_eq!(
            blocks,
            json!([
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": "*<https://example.slack.com/files/F123|report.pdf>* uploaded successfully!"
                    }
                },
                {
                    "type": "context",
                    "elements": [{ "type": "mrkdwn", "text": "File ID: `F123`" }]
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_notify_plain() {
        let mut srv = server().await;
        let d = descriptor(Some("https://example.slack.com/files/F123"));

        let msg_mock = srv
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::Json(json!({
                "channel": "C1",
                "text": "<https://example.slack.com/files/F123|report.pdf> uploaded successfully!",
                "mrkdwn": true,
            })))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let res = client(srv.url())
            .notify(&ChannelId("C1".into()), &ArtifactLink::from(&d), "report.pdf", LinkStyle::Plain)
            .await;

        msg_mock.assert_async().await;
        assert_eq!(res, NotificationResult { posted: true });
    }

    #[tokio::test]
    async fn test_notify_rich_sends_blocks() {
        let mut srv = server().await;
        let d = descriptor(None);

        let msg_mock = srv
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({
                    "channel": "C1",
                    "text": "report.pdf uploaded successfully (file id: F123).",
                })),
                Matcher::Regex(r#""blocks":\["#.into()),
            ]))
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let res = client(srv.url())
            .notify(&ChannelId("C1".into()), &ArtifactLink::from(&d), "report.pdf", LinkStyle::Rich)
            .await;

        msg_mock.assert_async().await;
        assert!(res.posted);
    }

    #[tokio::test]
    async fn test_notify_failure_is_not_fatal() {
        let mut srv = server().await;
        let d = descriptor(None);

        let msg_mock = srv
            .mock("POST", "/chat.postMessage")
            .with_body(r#"{"ok": false, "error": "not_in_channel"}"#)
            .create_async()
            .await;

        let res = client(srv.url())
            .notify(&ChannelId("C1".into()), &ArtifactLink::from(&d), "report.pdf", LinkStyle::Plain)
            .await;

        msg_mock.assert_async().await;
        assert_eq!(res, NotificationResult { posted: false });
    }
}
