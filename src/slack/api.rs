//! Type definitions and helpers for the Slack API.

use super::audit::{AuditedRequest, Auditor};
use super::auth::*;
use super::error::SlackError;
use reqwest::{header::AUTHORIZATION, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::{fmt, time::Duration};
use url::Url;

/// The base URL of the Slack API.
pub const API_BASE: &str = "https://slack.com/api";

/// Byte transfers get longer than metadata calls.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// The Slack API methods we call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiMethod {
    Join,
    UploadV2,
    GetUploadUrl,
    CompleteUpload,
    FileInfo,
    PostMessage,
}

impl ApiMethod {
    pub fn name(self) -> &'static str {
        match self {
            ApiMethod::Join => "conversations.join",
            ApiMethod::UploadV2 => "files.uploadV2",
            ApiMethod::GetUploadUrl => "files.getUploadURLExternal",
            ApiMethod::CompleteUpload => "files.completeUploadExternal",
            ApiMethod::FileInfo => "files.info",
            ApiMethod::PostMessage => "chat.postMessage",
        }
    }

    pub fn timeout(self) -> Duration {
        match self {
            ApiMethod::Join | ApiMethod::FileInfo | ApiMethod::PostMessage => {
                Duration::from_secs(15)
            }
            ApiMethod::UploadV2 | ApiMethod::GetUploadUrl | ApiMethod::CompleteUpload => {
                Duration::from_secs(30)
            }
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where each [ApiMethod] lives. Tests point this at a fake server.
#[derive(Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new<T: ToString>(base: T) -> Self {
        Self {
            base: base.to_string().trim_end_matches('/').to_owned(),
        }
    }

    pub fn url(&self, method: ApiMethod) -> String {
        format!("{}/{}", self.base, method.name())
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(API_BASE)
    }
}

/// Everything needed to talk to Slack on behalf of one bot token. Holds a
/// connection pool internally, as per [reqwest::Client].
pub struct SlackClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    token: SlackAccessToken,
    auditor: Auditor,
}

impl SlackClient {
    pub fn new(endpoints: Endpoints, token: SlackAccessToken, auditor: Auditor) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
            token,
            auditor,
        }
    }

    /// Create a GET request to a Slack API method, handling authentication.
    pub(super) fn get(&self, method: ApiMethod) -> RequestBuilder {
        self.http
            .get(self.endpoints.url(method))
            .header(AUTHORIZATION, to_auth_header_val(&self.token))
            .timeout(method.timeout())
    }

    /// Create a POST request to a Slack API method, handling authentication.
    pub(super) fn post(&self, method: ApiMethod) -> RequestBuilder {
        self.http
            .post(self.endpoints.url(method))
            .header(AUTHORIZATION, to_auth_header_val(&self.token))
            .timeout(method.timeout())
    }

    /// Create a PUT request to a presigned upload URL. These carry their own
    /// authorisation, so the token is not sent.
    pub(super) fn put(&self, url: &Url) -> RequestBuilder {
        self.http.put(url.clone()).timeout(TRANSFER_TIMEOUT)
    }

    /// Start describing a request to a Slack API method for the auditor.
    pub(super) fn audited<'a>(&self, method: ApiMethod, verb: &'static str) -> AuditedRequest<'a> {
        AuditedRequest::new(method.name(), verb, self.endpoints.url(method)).bearer(&self.token)
    }

    pub(super) fn record(&self, req: &AuditedRequest) {
        self.auditor.record(req);
    }
}

/// A response read to completion, so that the raw body remains available for
/// error reporting after decoding.
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

/// Send a request and read the whole response body.
pub async fn send(req: RequestBuilder) -> Result<Reply, SlackError> {
    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;

    Ok(Reply { status, body })
}

impl Reply {
    /// Decode a successful response into `T`, classifying everything else.
    ///
    /// Anything but a 200 is a status failure; a body which isn't JSON at all
    /// is malformed; `"ok": false` is an API error; and a successful body
    /// which doesn't fit `T` is a protocol error.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SlackError> {
        if self.status != StatusCode::OK {
            return Err(SlackError::Status {
                status: self.status.as_u16(),
                body: self.body.clone(),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&self.body).map_err(|_| SlackError::Malformed)?;

        match serde_json::from_value::<APIResult<T>>(value) {
            Ok(APIResult::Ok(x)) => Ok(x),
            Ok(APIResult::Err(res)) => Err(SlackError::Api {
                error: res.error.unwrap_or_else(|| "unknown_error".into()),
                payload: self.body.clone(),
            }),
            Err(_) => Err(SlackError::Protocol {
                payload: self.body.clone(),
            }),
        }
    }
}

/// Slack's API returns a common "untagged" response, representing whether a
/// request was successful.
///
/// ```json
/// {
///     "ok": true,
///     "file": {}
/// }
/// ```
///
/// ```json
/// {
///     "ok": false,
///     "error": "invalid_auth"
/// }
/// ```
#[derive(Deserialize)]
#[serde(untagged)]
pub enum APIResult<T> {
    Ok(T),
    Err(ErrorResponse),
}

/// The universal response in case of an unsuccessful request.
// The `ok` field is checked here, and should be checked on responses too,
// primarily to ensure appropriate deserialization behaviour in case of an
// otherwise empty successful response.
#[derive(Deserialize)]
pub struct ErrorResponse {
    #[allow(dead_code)]
    #[serde(deserialize_with = "crate::de::only_false")]
    ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Joined {
        #[allow(dead_code)]
        #[serde(deserialize_with = "crate::de::only_true")]
        ok: bool,
        name: String,
    }

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_endpoints_url() {
        assert_eq!(
            Endpoints::default().url(ApiMethod::Join),
            "https://slack.com/api/conversations.join"
        );
        assert_eq!(
            Endpoints::new("http://127.0.0.1:1234/").url(ApiMethod::FileInfo),
            "http://127.0.0.1:1234/files.info"
        );
    }

    #[test]
    fn test_transfer_outlasts_metadata_calls() {
        for m in [
            ApiMethod::Join,
            ApiMethod::UploadV2,
            ApiMethod::GetUploadUrl,
            ApiMethod::CompleteUpload,
            ApiMethod::FileInfo,
            ApiMethod::PostMessage,
        ] {
            assert!(m.timeout() < TRANSFER_TIMEOUT);
        }
    }

    #[test]
    fn test_decode_ok() {
        let x: Joined = reply(200, r#"{"ok": true, "name": "general"}"#)
            .decode()
            .unwrap();

        assert_eq!(x.name, "general");
    }

    #[test]
    fn test_decode_status() {
        let e = reply(503, "unavailable").decode::<Joined>().unwrap_err();

        assert!(matches!(e, SlackError::Status { status: 503, ref body } if body == "unavailable"));
    }

    #[test]
    fn test_decode_malformed() {
        let e = reply(200, "<html>").decode::<Joined>().unwrap_err();

        assert!(matches!(e, SlackError::Malformed));
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"ok": false, "error": "missing_scope"}"#;
        let e = reply(200, body).decode::<Joined>().unwrap_err();

        assert_eq!(e.api_error(), Some("missing_scope"));
        assert!(e.to_string().contains(body));
    }

    #[test]
    fn test_decode_api_error_without_code() {
        let e = reply(200, r#"{"ok": false}"#).decode::<Joined>().unwrap_err();

        assert_eq!(e.api_error(), Some("unknown_error"));
    }

    #[test]
    fn test_decode_protocol() {
        let e = reply(200, r#"{"ok": true}"#).decode::<Joined>().unwrap_err();

        assert!(matches!(e, SlackError::Protocol { .. }));
    }
}
