// Core data models for authdiff

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    HEAD,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::HEAD => write!(f, "HEAD"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "OPTIONS" => Ok(Method::OPTIONS),
            "HEAD" => Ok(Method::HEAD),
            other => Err(format!("Unsupported method: {}", other)),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
            Method::PATCH => reqwest::Method::PATCH,
            Method::OPTIONS => reqwest::Method::OPTIONS,
            Method::HEAD => reqwest::Method::HEAD,
        }
    }
}

/// A request as it was captured under the user's real session
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl CapturedRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// An HTTP response as seen by the comparator.
///
/// `error` is set when the request never completed (network failure,
/// timeout, aborted capture). Such a response is never compared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub status: u16,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub error: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
            error: None,
        }
    }

    /// Response standing in for a request that could not be completed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: None,
            headers: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Original request/response pair supplied by capture
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedExchange {
    pub request: CapturedRequest,
    pub response: Response,
}

/// Outcome of comparing an original response with a replayed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonResult {
    Same,
    Similar,
    Different,
    Error,
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonResult::Same => write!(f, "SAME"),
            ComparisonResult::Similar => write!(f, "SIMILAR"),
            ComparisonResult::Different => write!(f, "DIFFERENT"),
            ComparisonResult::Error => write!(f, "ERROR"),
        }
    }
}

/// Risk rating of a bypass judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "NONE"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Expected access tier of a session relative to the captured one.
///
/// Labels outside low/medium/high deserialize to `Unrecognized` so a
/// typo in a session profile yields no judgment instead of a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrivilegeLevel {
    #[default]
    Low,
    Medium,
    High,
    Unrecognized,
}

impl PrivilegeLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => PrivilegeLevel::Low,
            "medium" => PrivilegeLevel::Medium,
            "high" => PrivilegeLevel::High,
            _ => PrivilegeLevel::Unrecognized,
        }
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivilegeLevel::Low => write!(f, "low"),
            PrivilegeLevel::Medium => write!(f, "medium"),
            PrivilegeLevel::High => write!(f, "high"),
            PrivilegeLevel::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

impl<'de> Deserialize<'de> for PrivilegeLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(PrivilegeLevel::from_label(&label))
    }
}

/// Security judgment for one (request, session) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassVerdict {
    pub bypass: bool,
    pub severity: Severity,
    pub result: ComparisonResult,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub session_id: String,
    pub session_name: String,
    pub verdict: BypassVerdict,
}

/// All session outcomes for one tested request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthCheckResult {
    pub request: CapturedRequest,
    pub original: Response,
    /// In the order the sessions were tested
    pub session_results: Vec<SessionResult>,
    pub tested_at: DateTime<Utc>,
}

impl AuthCheckResult {
    pub fn new(request: CapturedRequest, original: Response, session_results: Vec<SessionResult>) -> Self {
        Self {
            request,
            original,
            session_results,
            tested_at: Utc::now(),
        }
    }

    pub fn has_bypass(&self) -> bool {
        self.session_results.iter().any(|r| r.verdict.bypass)
    }

    pub fn bypass_count(&self) -> usize {
        self.session_results.iter().filter(|r| r.verdict.bypass).count()
    }

    pub fn highest_severity(&self) -> Severity {
        self.session_results
            .iter()
            .map(|r| r.verdict.severity)
            .max()
            .unwrap_or_default()
    }
}
