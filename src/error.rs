use crate::{config::ConfigError, slack::error::SlackError, target::ValidationError, upload::Step};
use thiserror::Error;

/// Sum type representing every fatal fail state. Anything which isn't fatal
/// is reported where it happens and never reaches this type.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{step}: {source}")]
    Upload { step: Step, source: SlackError },
}

impl Failure {
    /// Attach the upload step a Slack error came from.
    pub fn at(step: Step) -> impl FnOnce(SlackError) -> Failure {
        move |source| Failure::Upload { step, source }
    }

    pub fn exit_code(&self) -> u8 {
        1
    }
}
