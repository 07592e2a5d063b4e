//! Thin wrapper around `reqwest::Client` that owns the base url, the default
//! headers and the timeout policy of every NetSchool call.
use std::time::Duration;

use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, REFERER, USER_AGENT},
    redirect::Policy,
    Client, Method, Request, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::NetSchoolError;

pub const DEFAULT_REQUESTS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT_PAUSE: Duration = Duration::from_millis(100);
const USER_AGENT_VALUE: &str = "NetSchoolAPI/5.0.3";

/// Time budget of a single call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestTimeout {
    /// The call fails with [`NetSchoolError::NoResponseFromServer`] once the
    /// duration elapses. Read timeouts inside the budget are retried.
    Bounded(Duration),
    /// Never gives up: every read timeout is followed by a 100ms pause and a
    /// new attempt, with no limit on the number of attempts. A call against a
    /// server that never answers never returns.
    Unbounded,
}

/// A zero duration selects [`RequestTimeout::Unbounded`].
impl From<Duration> for RequestTimeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            RequestTimeout::Unbounded
        } else {
            RequestTimeout::Bounded(duration)
        }
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        RequestTimeout::Bounded(DEFAULT_REQUESTS_TIMEOUT)
    }
}

/// Method, path (relative to `/webapi`) and payload of one API call.
/// It is rebuilt into a fresh `reqwest::Request` on every attempt, so a retry
/// after re-login carries the new access token.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub json: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestSpec {
            method,
            path: path.into(),
            query: Vec::new(),
            form: None,
            json: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }
}

/// Status and completely read body of an answer.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, NetSchoolError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub struct ClientWrapper {
    client: Client,
    redirecting_client: Client,
    base_url: String,
    default_requests_timeout: RequestTimeout,
}

impl ClientWrapper {
    /// `transport_timeout` bounds one attempt; when it expires the attempt is
    /// treated as a read timeout and retried.
    pub fn new(
        url: &str,
        default_requests_timeout: Option<RequestTimeout>,
        transport_timeout: Duration,
    ) -> Result<Self, NetSchoolError> {
        let url = url.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            REFERER,
            HeaderValue::from_str(url).map_err(|_| NetSchoolError::InvalidUrl(url.to_owned()))?,
        );

        let client = Client::builder()
            .default_headers(headers.clone())
            .redirect(Policy::none())
            .timeout(transport_timeout)
            .build()?;
        let redirecting_client = Client::builder()
            .default_headers(headers)
            .timeout(transport_timeout)
            .build()?;

        Ok(ClientWrapper {
            client,
            redirecting_client,
            base_url: format!("{}/webapi", url),
            default_requests_timeout: default_requests_timeout.unwrap_or_default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one call under `requests_timeout` (the default one when `None`).
    /// 4xx and 5xx answers become [`NetSchoolError::Status`], redirects are
    /// returned as is.
    pub async fn request(
        &self,
        requests_timeout: Option<RequestTimeout>,
        spec: &RequestSpec,
        access_token: Option<&str>,
        follow_redirects: bool,
    ) -> Result<RawResponse, NetSchoolError> {
        let response = match requests_timeout.unwrap_or(self.default_requests_timeout) {
            RequestTimeout::Unbounded => {
                self.infinite_request(spec, access_token, follow_redirects)
                    .await?
            }
            RequestTimeout::Bounded(limit) => tokio::time::timeout(
                limit,
                self.infinite_request(spec, access_token, follow_redirects),
            )
            .await
            .map_err(|_| NetSchoolError::NoResponseFromServer)??,
        };
        die_on_bad_status(response)
    }

    async fn infinite_request(
        &self,
        spec: &RequestSpec,
        access_token: Option<&str>,
        follow_redirects: bool,
    ) -> Result<RawResponse, NetSchoolError> {
        loop {
            let request = self.build_request(spec, access_token)?;
            match self.send(request, follow_redirects).await {
                Err(err) if err.is_timeout() => {
                    debug!("Read timeout on {} {}, retrying", spec.method, spec.path);
                    tokio::time::sleep(READ_TIMEOUT_PAUSE).await;
                }
                other => return Ok(other?),
            }
        }
    }

    async fn send(
        &self,
        request: Request,
        follow_redirects: bool,
    ) -> Result<RawResponse, reqwest::Error> {
        let client = if follow_redirects {
            &self.redirecting_client
        } else {
            &self.client
        };
        let response = client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }

    fn build_request(
        &self,
        spec: &RequestSpec,
        access_token: Option<&str>,
    ) -> Result<Request, NetSchoolError> {
        let mut builder = self.client.request(
            spec.method.clone(),
            format!("{}/{}", self.base_url, spec.path),
        );
        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        if let Some(form) = &spec.form {
            builder = builder.form(form);
        }
        if let Some(json) = &spec.json {
            builder = builder.json(json);
        }
        if let Some(token) = access_token {
            builder = builder.header("at", token);
        }
        Ok(builder.build()?)
    }
}

fn die_on_bad_status(response: RawResponse) -> Result<RawResponse, NetSchoolError> {
    if response.status.is_client_error() || response.status.is_server_error() {
        return Err(NetSchoolError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    Ok(response)
}
