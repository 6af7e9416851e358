//! Publish one local file to one channel: join it, upload, find a link, and
//! announce it.
//!
//! The upload itself is a small state machine. The single-call route either
//! finishes or hands over to the external route, whose three steps run
//! strictly in order with nothing retried:
//!
//! ```text
//! Primary ─┬─────────────────────────────────────> Done
//!          └─> Slot ──> Transfer ──> Finalize ──> Done
//! ```

use crate::{
    console,
    error::Failure,
    slack::{
        api::{ApiMethod, SlackClient},
        channel::ChannelId,
        file::{FileDescriptor, FileId, PrimaryOutcome, UploadSession},
        message::{ArtifactLink, LinkStyle, NotificationResult},
    },
    target::UploadTarget,
};
use std::{fmt, path::PathBuf};
use tracing::{debug, info, warn};

/// One step of the upload, used to label failures and record the route taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Primary,
    Slot,
    Transfer,
    Finalize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            Step::Primary => ApiMethod::UploadV2.name(),
            Step::Slot => ApiMethod::GetUploadUrl.name(),
            Step::Transfer => "upload to provided URL",
            Step::Finalize => ApiMethod::CompleteUpload.name(),
        };

        write!(f, "{}", x)
    }
}

/// Which route a file took to get uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Primary,
    External,
}

/// Where an upload is up to, carrying whatever the next step needs.
enum Stage {
    Primary,
    Slot,
    Transfer(UploadSession),
    Finalize(FileId),
}

impl Stage {
    fn step(&self) -> Step {
        match self {
            Stage::Primary => Step::Primary,
            Stage::Slot => Step::Slot,
            Stage::Transfer(_) => Step::Transfer,
            Stage::Finalize(_) => Step::Finalize,
        }
    }
}

enum Transition {
    Next(Stage),
    Done(FileDescriptor, Route),
}

#[derive(Debug)]
pub struct Uploaded {
    pub descriptor: FileDescriptor,
    pub route: Route,
    /// Every step attempted, in order.
    pub trail: Vec<Step>,
}

/// Drives a single file through the upload state machine.
pub struct Uploader<'a> {
    pub client: &'a SlackClient,
    pub channel: &'a ChannelId,
    pub target: &'a UploadTarget,
    pub bytes: &'a [u8],
    pub comment: Option<&'a str>,
}

impl Uploader<'_> {
    pub async fn upload(&self) -> Result<Uploaded, Failure> {
        let mut stage = Stage::Primary;
        let mut trail = Vec::with_capacity(4);

        loop {
            let step = stage.step();
            trail.push(step);
            debug!(%step, "Starting upload step");

            match self.advance(stage).await.map_err(|e| {
                warn!(%step, error = %e, "Upload step failed");
                e
            })? {
                Transition::Next(next) => stage = next,
                Transition::Done(descriptor, route) => {
                    info!(file_id = %descriptor.file_id, ?route, "Uploaded file");
                    break Ok(Uploaded {
                        descriptor,
                        route,
                        trail,
                    });
                }
            }
        }
    }

    async fn advance(&self, stage: Stage) -> Result<Transition, Failure> {
        let client = self.client;
        let name = self.target.filename();
        let at = Failure::at(stage.step());

        match stage {
            Stage::Primary => {
                let outcome = client
                    .upload_primary(self.channel, self.target, self.bytes, self.comment)
                    .await
                    .map_err(at)?;

                match outcome {
                    PrimaryOutcome::Uploaded(d) => Ok(Transition::Done(d, Route::Primary)),
                    PrimaryOutcome::Fallback(signal) => {
                        console::status(&format!(
                            "{} failed ({}), using external upload flow...",
                            ApiMethod::UploadV2,
                            signal
                        ));
                        Ok(Transition::Next(Stage::Slot))
                    }
                }
            }
            Stage::Slot => client
                .request_upload_slot(name, self.target.size)
                .await
                .map(|session| Transition::Next(Stage::Transfer(session)))
                .map_err(at),
            Stage::Transfer(session) => client
                .transfer(session, self.bytes)
                .await
                .map(|id| Transition::Next(Stage::Finalize(id)))
                .map_err(at),
            Stage::Finalize(id) => client
                .complete_upload(&id, name, self.channel, self.comment)
                .await
                .map(|obj| Transition::Done(FileDescriptor::from_object(obj, name), Route::External))
                .map_err(at),
        }
    }
}

/// One invocation's worth of input, beyond credentials.
pub struct Job {
    pub path: PathBuf,
    pub comment: Option<String>,
    /// Link text in the announcement. Defaults to the file's title.
    pub label: Option<String>,
    pub style: LinkStyle,
}

#[derive(Debug)]
pub struct Report {
    pub member: bool,
    pub uploaded: Uploaded,
    pub notification: NotificationResult,
}

/// Publish a file end to end. Only validation and upload failures are fatal;
/// joining, permalink lookup and the announcement are best-effort.
pub async fn run(client: &SlackClient, channel: &ChannelId, job: &Job) -> Result<Report, Failure> {
    let target = UploadTarget::validate(&job.path)?;
    let bytes = target.read().await?;

    info!(file = %target.path.display(), size = target.size, channel = %channel, "Publishing file");

    let member = client.ensure_member(channel).await;

    let mut uploaded = Uploader {
        client,
        channel,
        target: &target,
        bytes: &bytes,
        comment: job.comment.as_deref(),
    }
    .upload()
    .await?;

    if uploaded.descriptor.permalink.is_none() {
        uploaded.descriptor.permalink = client.resolve_permalink(&uploaded.descriptor.file_id).await;
    }

    let label = job.label.as_deref().unwrap_or(&uploaded.descriptor.title);
    let notification = client
        .notify(channel, &ArtifactLink::from(&uploaded.descriptor), label, job.style)
        .await;

    Ok(Report {
        member,
        uploaded,
        notification,
    })
}
