//! Upload files to Slack, by either of the two routes Slack offers, and look
//! them up afterwards.
//!
//! The single-call `files.uploadV2` route is tried first. Workspaces on which
//! it's unavailable get the external route instead: ask for an upload slot,
//! PUT the bytes to it, then complete the upload into a channel.

use super::{
    api::*,
    audit::{AuditedRequest, FileMeta},
    channel::ChannelId,
    error::SlackError,
};
use crate::{console, target::UploadTarget};
use reqwest::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    multipart::{Form, Part},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use std::fmt;
use tracing::{debug, info};
use url::Url;

/// Slack's opaque identifier for an uploaded file, e.g. `F0123ABCD`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileId(pub String);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The subset of Slack's file object we care about.
///
/// <https://api.slack.com/types/file>
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct FileObject {
    pub id: FileId,
    #[serde(default)]
    pub title: Option<String>,
    // Freshly completed uploads sometimes report an empty permalink.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub permalink: Option<String>,
}

/// An uploaded file, whichever route it took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_id: FileId,
    pub permalink: Option<String>,
    pub title: String,
}

impl FileDescriptor {
    /// Falls back to `title` where Slack didn't echo one.
    pub fn from_object(obj: FileObject, title: &str) -> Self {
        Self {
            file_id: obj.id,
            permalink: obj.permalink,
            title: obj.title.unwrap_or_else(|| title.to_owned()),
        }
    }
}

/// Why the single-call upload was abandoned in favour of the external route.
#[derive(Debug, PartialEq, Eq)]
pub enum FallbackSignal {
    Transport(String),
    Status(u16),
    Rejected(String),
    MissingFile,
}

impl fmt::Display for FallbackSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackSignal::Transport(e) => write!(f, "request failed: {}", e),
            FallbackSignal::Status(s) => write!(f, "HTTP {}", s),
            FallbackSignal::Rejected(e) => write!(f, "rejected: {}", e),
            FallbackSignal::MissingFile => write!(f, "no file in response"),
        }
    }
}

/// The result of [SlackClient::upload_primary] which isn't fatal.
#[derive(Debug)]
pub enum PrimaryOutcome {
    Uploaded(FileDescriptor),
    Fallback(FallbackSignal),
}

/// A capability to upload exactly one file's bytes, consumed by
/// [SlackClient::transfer].
#[derive(Debug)]
pub struct UploadSession {
    pub upload_url: Url,
    pub file_id: FileId,
}

/// <https://api.slack.com/methods/files.uploadV2>
#[derive(Deserialize)]
struct UploadResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    #[serde(default)]
    file: Option<FileObject>,
}

/// <https://api.slack.com/methods/files.getUploadURLExternal#args>
#[derive(Serialize)]
struct UploadUrlRequest<'a> {
    filename: &'a str,
    length: u64,
}

/// <https://api.slack.com/methods/files.getUploadURLExternal#examples>
#[derive(Deserialize)]
struct UploadUrlResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    #[serde(default)]
    upload_url: Option<Url>,
    #[serde(default)]
    file_id: Option<FileId>,
}

/// <https://api.slack.com/methods/files.completeUploadExternal#args>
#[derive(Serialize)]
struct CompleteRequest<'a> {
    files: Vec<FileRef<'a>>,
    channel_id: &'a ChannelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_comment: Option<&'a str>,
}

#[derive(Serialize)]
struct FileRef<'a> {
    id: &'a FileId,
    title: &'a str,
}

/// <https://api.slack.com/methods/files.completeUploadExternal#examples>
#[derive(Deserialize)]
struct CompleteResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    #[serde(default, deserialize_with = "crate::de::one_or_many")]
    files: Vec<FileObject>,
    #[serde(default)]
    file: Option<FileObject>,
}

/// <https://api.slack.com/methods/files.info#examples>
#[derive(Deserialize)]
struct InfoResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_true")]
    ok: bool,
    file: FileObject,
}

impl SlackClient {
    /// Upload in a single call. Only a body that isn't JSON at all is fatal;
    /// any other failure hands over to the external route.
    pub async fn upload_primary(
        &self,
        channel: &ChannelId,
        target: &UploadTarget,
        bytes: &[u8],
        comment: Option<&str>,
    ) -> Result<PrimaryOutcome, SlackError> {
        let method = ApiMethod::UploadV2;
        let filename = target.filename();

        let mut data = serde_json::json!({ "channel_id": channel });
        let mut form = Form::new().text("channel_id", channel.0.clone());
        if let Some(c) = comment {
            data["initial_comment"] = c.into();
            form = form.text("initial_comment", c.to_owned());
        }

        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_owned())
            .mime_str(target.mime)?;
        form = form.part("file", part);

        self.record(&self.audited(method, "POST").data(data).file(FileMeta {
            filename,
            size: target.size,
            content_type: target.mime,
        }));

        let reply = match send(self.post(method).multipart(form)).await {
            Ok(x) => x,
            Err(e) => return Ok(PrimaryOutcome::Fallback(FallbackSignal::Transport(e.to_string()))),
        };

        let outcome = match reply.decode::<UploadResponse>() {
            Ok(UploadResponse { file: Some(obj), .. }) => {
                PrimaryOutcome::Uploaded(FileDescriptor::from_object(obj, filename))
            }
            Ok(UploadResponse { file: None, .. }) | Err(SlackError::Protocol { .. }) => {
                PrimaryOutcome::Fallback(FallbackSignal::MissingFile)
            }
            Err(SlackError::Status { status, .. }) => {
                PrimaryOutcome::Fallback(FallbackSignal::Status(status))
            }
            Err(SlackError::Api { error, .. }) => {
                PrimaryOutcome::Fallback(FallbackSignal::Rejected(error))
            }
            Err(SlackError::Request(e)) => {
                PrimaryOutcome::Fallback(FallbackSignal::Transport(e.to_string()))
            }
            Err(e @ SlackError::Malformed) => return Err(e),
        };

        Ok(outcome)
    }

    /// Step one of the external route: ask for somewhere to put the bytes.
    pub async fn request_upload_slot(
        &self,
        filename: &str,
        length: u64,
    ) -> Result<UploadSession, SlackError> {
        let method = ApiMethod::GetUploadUrl;

        self.record(
            &self
                .audited(method, "POST")
                .data(serde_json::json!({ "filename": filename, "length": length.to_string() })),
        );

        let reply = send(
            self.post(method)
                .form(&UploadUrlRequest { filename, length }),
        )
        .await?;

        match reply.decode::<UploadUrlResponse>()? {
            UploadUrlResponse {
                upload_url: Some(upload_url),
                file_id: Some(file_id),
                ..
            } => {
                debug!(file_id = %file_id, "Received upload slot");
                Ok(UploadSession {
                    upload_url,
                    file_id,
                })
            }
            _ => Err(SlackError::Protocol {
                payload: reply.body,
            }),
        }
    }

    /// Step two of the external route: send the bytes. The session is spent
    /// whatever the outcome.
    pub async fn transfer(&self, session: UploadSession, bytes: &[u8]) -> Result<FileId, SlackError> {
        let length = bytes.len().to_string();

        self.record(
            &AuditedRequest::new("PUT upload bytes", "PUT", session.upload_url.as_str())
                .header("Content-Type", "application/octet-stream")
                .header("Content-Length", length.clone())
                .data(serde_json::json!({ "length": bytes.len() })),
        );

        let reply = send(
            self.put(&session.upload_url)
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_LENGTH, length)
                .body(bytes.to_vec()),
        )
        .await?;

        if reply.status != StatusCode::OK && reply.status != StatusCode::CREATED {
            return Err(SlackError::Status {
                status: reply.status.as_u16(),
                body: reply.body,
            });
        }

        debug!(file_id = %session.file_id, "Transferred file bytes");
        Ok(session.file_id)
    }

    /// Step three of the external route: finalise the upload and share it to
    /// the channel.
    pub async fn complete_upload(
        &self,
        file_id: &FileId,
        title: &str,
        channel: &ChannelId,
        comment: Option<&str>,
    ) -> Result<FileObject, SlackError> {
        let method = ApiMethod::CompleteUpload;
        let body = CompleteRequest {
            files: vec![FileRef { id: file_id, title }],
            channel_id: channel,
            initial_comment: comment,
        };

        self.record(
            &self
                .audited(method, "POST")
                .header("Content-Type", "application/json; charset=utf-8")
                .data(serde_json::to_value(&body).unwrap_or_default()),
        );

        let reply = send(self.post(method).json(&body)).await?;
        let res: CompleteResponse = reply.decode()?;

        res.files
            .into_iter()
            .next()
            .or(res.file)
            .ok_or(SlackError::Protocol {
                payload: reply.body,
            })
    }

    pub async fn file_info(&self, file_id: &FileId) -> Result<FileObject, SlackError> {
        let method = ApiMethod::FileInfo;

        self.record(
            &self
                .audited(method, "GET")
                .data(serde_json::json!({ "file": file_id })),
        );

        send(self.get(method).query(&[("file", &file_id.0)]))
            .await?
            .decode::<InfoResponse>()
            .map(|res| res.file)
    }

    /// Best-effort lookup of a file's permalink. Failures are reported and
    /// become `None`.
    pub async fn resolve_permalink(&self, file_id: &FileId) -> Option<String> {
        match self.file_info(file_id).await {
            Ok(FileObject {
                permalink: Some(link),
                ..
            }) => {
                info!(file_id = %file_id, permalink = %link, "Resolved permalink");
                Some(link)
            }
            Ok(_) => {
                console::warning(&format!("{} returned no permalink for {}", ApiMethod::FileInfo, file_id));
                None
            }
            Err(e) => {
                console::warning(&format!("{} failed for {}: {}", ApiMethod::FileInfo, file_id, e));
                None
            }
        }
    }
}
