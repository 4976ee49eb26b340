// HAR capture parser for authdiff
// Reads HAR 1.2 exports (DevTools "Save all as HAR") with serde_json and
// walks directories of .har files with walkdir

use crate::error::{AuthDiffError, Result};
use crate::models::{CapturedExchange, CapturedRequest, Method, Response};
use crate::parsers::CaptureParser;
use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const STATIC_EXTENSIONS: &[&str] = &[
    "js", "mjs", "css", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif",
    "woff", "woff2", "ttf", "otf", "eot", "mp4", "webm", "mp3",
];

#[derive(Default)]
pub struct HarParser {
    /// Only entries whose URL matches are kept
    pub scope: Option<Regex>,
    /// Keep scripts, stylesheets, images and fonts
    pub include_static: bool,
}

impl HarParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, pattern: &str) -> Result<Self> {
        self.scope = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn including_static(mut self, include: bool) -> Self {
        self.include_static = include;
        self
    }

    /// Parse the text of a single HAR document
    pub fn parse_str(&self, data: &str, origin: &str) -> Result<Vec<CapturedExchange>> {
        let json: Value = serde_json::from_str(data).map_err(|e| AuthDiffError::InvalidCapture {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        let entries = json
            .get("log")
            .and_then(|l| l.get("entries"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| AuthDiffError::InvalidCapture {
                path: origin.to_string(),
                reason: "missing log.entries".to_string(),
            })?;

        let mut exchanges = Vec::new();
        for entry in entries {
            if let Some(exchange) = parse_entry(entry) {
                if self.in_scope(&exchange.request.url) {
                    exchanges.push(exchange);
                }
            }
        }
        debug!(origin, entries = entries.len(), kept = exchanges.len(), "parsed HAR");
        Ok(exchanges)
    }

    fn in_scope(&self, url: &str) -> bool {
        if !self.include_static && is_static_asset(url) {
            return false;
        }
        self.scope.as_ref().map_or(true, |re| re.is_match(url))
    }
}

impl CaptureParser for HarParser {
    fn parse(&self, path: &str) -> Result<Vec<CapturedExchange>> {
        if !Path::new(path).is_dir() {
            let data = std::fs::read_to_string(path)?;
            return self.parse_str(&data, path);
        }

        let mut files: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "har"))
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut exchanges = Vec::new();
        for file in files {
            let data = std::fs::read_to_string(&file)?;
            exchanges.extend(self.parse_str(&data, &file.display().to_string())?);
        }
        Ok(exchanges)
    }
}

fn parse_entry(entry: &Value) -> Option<CapturedExchange> {
    let request = entry.get("request")?;
    let url = request.get("url").and_then(|u| u.as_str())?;
    let method_str = request.get("method").and_then(|m| m.as_str())?;
    let method = match method_str.parse::<Method>() {
        Ok(m) => m,
        Err(e) => {
            warn!(url, "skipping entry: {}", e);
            return None;
        }
    };

    let captured = CapturedRequest {
        method,
        url: url.to_string(),
        headers: parse_headers(request.get("headers")),
        body: request
            .get("postData")
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string()),
    };

    let response = entry
        .get("response")
        .map(parse_response)
        .unwrap_or_else(|| Response::failed("No response captured"));

    Some(CapturedExchange {
        request: captured,
        response,
    })
}

fn parse_response(response: &Value) -> Response {
    let status = response.get("status").and_then(|s| s.as_u64()).unwrap_or(0);
    if status == 0 {
        let reason = response
            .get("_error")
            .and_then(|e| e.as_str())
            .unwrap_or("Request did not complete");
        return Response::failed(reason);
    }

    let content = response.get("content");
    let text = content.and_then(|c| c.get("text")).and_then(|t| t.as_str());
    let encoding = content.and_then(|c| c.get("encoding")).and_then(|e| e.as_str());
    let body = match (text, encoding) {
        // Lossy, matching how replayed bodies are decoded
        (Some(t), Some("base64")) => general_purpose::STANDARD
            .decode(t)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        (Some(t), _) => Some(t.to_string()),
        (None, _) => None,
    };

    Response {
        status: u16::try_from(status).unwrap_or(0),
        body,
        headers: parse_headers(response.get("headers")),
        error: None,
    }
}

fn parse_headers(headers: Option<&Value>) -> Vec<(String, String)> {
    headers
        .and_then(|h| h.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|h| {
                    let name = h.get("name")?.as_str()?;
                    let value = h.get("value")?.as_str()?;
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn is_static_asset(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => STATIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}
