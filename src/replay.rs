// Replay of captured requests under substituted sessions
// Uses reqwest; transport failures never escape as errors, they become
// error responses the comparator reports as ERROR.

use crate::error::Result;
use crate::models::{CapturedRequest, Response};
use crate::session::{substitute_params, Session};
use reqwest::{redirect, Client};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Re-issues a captured request with a session's credentials
pub trait Replayer: Send + Sync {
    fn replay(&self, request: &CapturedRequest, session: &Session) -> impl Future<Output = Response> + Send;
}

pub struct HttpReplayer {
    pub client: Client,
}

impl HttpReplayer {
    /// Redirects are not followed: a login redirect must show up as a
    /// status change, not as the login page body.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Build the substituted request without sending it
    pub fn build_request(&self, request: &CapturedRequest, session: &Session) -> reqwest::Result<reqwest::Request> {
        let url = override_query(&request.url, &session.param_overrides);
        let mut req = self.client.request(request.method.into(), url);

        for (name, value) in session.substitute_headers(&request.headers) {
            if is_replayable_header(&name) {
                req = req.header(name, value);
            }
        }

        if let Some(body) = &request.body {
            req = req.body(override_body(body, &session.param_overrides));
        }

        req.build()
    }
}

impl Replayer for HttpReplayer {
    async fn replay(&self, request: &CapturedRequest, session: &Session) -> Response {
        let built = match self.build_request(request, session) {
            Ok(r) => r,
            Err(e) => {
                warn!(session = %session.name, url = %request.url, error = %e, "could not build replay request");
                return Response::failed(e.to_string());
            }
        };

        match self.client.execute(built).await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let headers = resp
                    .headers()
                    .iter()
                    .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
                    .collect();
                match resp.text().await {
                    Ok(body) => {
                        debug!(session = %session.name, url = %request.url, status, "replayed");
                        Response {
                            status,
                            body: Some(body),
                            headers,
                            error: None,
                        }
                    }
                    Err(e) => Response::failed(format!("Failed to read response body: {}", e)),
                }
            }
            Err(e) => {
                warn!(session = %session.name, url = %request.url, error = %e, "replay failed");
                Response::failed(e.to_string())
            }
        }
    }
}

/// Headers recomputed by the client or only meaningful to the capturing
/// connection
fn is_replayable_header(name: &str) -> bool {
    !(name.starts_with(':') || name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length"))
}

/// Replace query parameter values named in the overrides. Only the
/// matching `key=value` segments are rewritten; every other segment keeps
/// its captured bytes. URLs without a query are returned unchanged.
pub fn override_query(url: &str, overrides: &BTreeMap<String, String>) -> String {
    if overrides.is_empty() {
        return url.to_string();
    }
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some(parts) => parts,
        None => return url.to_string(),
    };

    let mut changed = false;
    let segments: Vec<String> = query
        .split('&')
        .map(|segment| {
            let key = segment.split_once('=').map_or(segment, |(k, _)| k);
            match overrides.get(key) {
                Some(value) => {
                    changed = true;
                    format!("{}={}", key, encode_query_value(value))
                }
                None => segment.to_string(),
            }
        })
        .collect();
    if !changed {
        return url.to_string();
    }

    let mut rebuilt = format!("{}?{}", path, segments.join("&"));
    if let Some(fragment) = fragment {
        rebuilt.push('#');
        rebuilt.push_str(fragment);
    }
    rebuilt
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Apply parameter overrides to a JSON body; other bodies pass through
pub fn override_body(body: &str, overrides: &BTreeMap<String, String>) -> String {
    if overrides.is_empty() {
        return body.to_string();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(mut json) => {
            substitute_params(&mut json, overrides);
            json.to_string()
        }
        Err(_) => body.to_string(),
    }
}
