//! Share files to a Slack channel and announce them there.
//!
//! See [file] for the two upload routes and [message] for the announcement.

pub mod api;
pub mod audit;
pub mod auth;
mod block;
pub mod channel;
pub mod error;
pub mod file;
pub mod message;
