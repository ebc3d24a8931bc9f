//! Transport collaborator
//!
//! The engine decides what request to send and how to judge the response;
//! a [`Transport`] performs the call. [`HttpTransport`] is the reqwest-based
//! implementation used by the binary.

use crate::probe::error::TransportError;
use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "GET"),
            RequestMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "POST" => Ok(RequestMethod::Post),
            other => Err(format!("unsupported request method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl ProbeRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: RequestMethod::Get,
            url: url.to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: &str, body: String) -> Self {
        Self {
            method: RequestMethod::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeResponse {
    pub status: u16,
    /// Header names are stored lower-cased
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// 4xx or 5xx
    pub fn is_error_status(&self) -> bool {
        matches!(self.status / 100, 4 | 5)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError>;
}

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    pub verify_ssl: bool,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            user_agent: format!("geoprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(!options.verify_ssl)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        let method = match request.method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| classify(&request, e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| match classify(&request, e) {
                timeout @ TransportError::Timeout { .. } => timeout,
                other => TransportError::Body(other.to_string()),
            })?
            .to_vec();

        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(request: &ProbeRequest, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: request.url.clone(),
            seconds: request.timeout.map(|t| t.as_secs_f64()).unwrap_or_default(),
        }
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
