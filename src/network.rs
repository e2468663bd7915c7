//! Network request/response model and fetchers
//!
//! `Fetcher` is the seam between the cache manager and the network. The
//! HTTP implementation runs a blocking `ureq` agent on tokio's blocking pool.

use crate::error::{OffcacheError, OffcacheResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use ureq::ResponseExt;
use url::Url;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = OffcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(OffcacheError::User(format!(
                "Unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// An outgoing request, identified by method and absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    pub method: Method,
    pub url: String,
}

impl Request {
    /// Create a GET request for an absolute URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
        }
    }

    /// Create a request with an explicit method
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Only GET requests may be stored in or served from a cache bucket
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::Get
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A network response with its body fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL of the response
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase, if known
    pub status_text: String,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with a status and body and no headers
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Abstract network interface
///
/// An `Err` means no response was obtained at all. HTTP error statuses are
/// returned as `Ok` responses so callers see the real outcome.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request
    async fn fetch(&self, request: &Request) -> OffcacheResult<Response>;
}

/// Resolve a manifest entry or user-supplied URL against the site origin
///
/// Absolute URLs pass through unchanged. Relative entries need an origin.
pub fn resolve_url(origin: Option<&Url>, entry: &str) -> OffcacheResult<String> {
    match Url::parse(entry) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = origin.ok_or_else(|| OffcacheError::MissingOrigin(entry.to_string()))?;
            base.join(entry)
                .map(|url| url.to_string())
                .map_err(|e| OffcacheError::InvalidUrl {
                    url: entry.to_string(),
                    reason: e.to_string(),
                })
        }
        Err(e) => Err(OffcacheError::InvalidUrl {
            url: entry.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Parse a site origin from configuration
pub fn parse_origin(origin: &str) -> OffcacheResult<Url> {
    let url = Url::parse(origin).map_err(|e| OffcacheError::InvalidUrl {
        url: origin.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(OffcacheError::InvalidUrl {
            url: origin.to_string(),
            reason: "origin must be a base URL such as https://example.com/".to_string(),
        });
    }

    Ok(url)
}

/// HTTP fetcher backed by a `ureq` agent
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher that sends the given User-Agent
    pub fn new(user_agent: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            user_agent: user_agent.into(),
        }
    }

    fn fetch_blocking(
        agent: &ureq::Agent,
        user_agent: &str,
        request: &Request,
    ) -> OffcacheResult<Response> {
        let url = request.url.as_str();
        let to_network = |e: ureq::Error| OffcacheError::network(url, e.to_string());

        let result = match request.method {
            Method::Get => agent.get(url).header("User-Agent", user_agent).call(),
            Method::Head => agent.head(url).header("User-Agent", user_agent).call(),
            Method::Delete => agent.delete(url).header("User-Agent", user_agent).call(),
            Method::Post => agent.post(url).header("User-Agent", user_agent).send_empty(),
            Method::Put => agent.put(url).header("User-Agent", user_agent).send_empty(),
        };
        let mut response = result.map_err(to_network)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        // Redirects are followed; report where the body came from
        let final_url = response.get_uri().to_string();

        // ureq caps read_to_vec at 10 MiB unless a limit is given
        let body = if request.method == Method::Head {
            Vec::new()
        } else {
            response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(to_network)?
        };

        Ok(Response {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> OffcacheResult<Response> {
        debug!("Fetching from network: {}", request);

        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let owned = request.clone();

        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &user_agent, &owned))
            .await
            .map_err(|e| OffcacheError::Internal(format!("fetch task failed: {}", e)))?
    }
}
