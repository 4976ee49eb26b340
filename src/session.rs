// Session profiles and credential substitution
//
// A session describes an alternate credential set. Before a captured
// request is replayed, its headers are rewritten with the session's
// overrides and removals, and its parameters with the session's
// parameter overrides.
//
// Example:
//   Captured: Cookie: sid=admin, Authorization: Bearer admin
//   Session:  set {Cookie: sid=guest}, remove {Authorization}
//   Replayed: Cookie: sid=guest

use crate::error::{AuthDiffError, Result};
use crate::models::PrivilegeLevel;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, warn};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Display only
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub privilege: PrivilegeLevel,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub headers_to_set: BTreeMap<String, String>,
    #[serde(default)]
    pub headers_to_remove: BTreeSet<String>,
    #[serde(default)]
    pub param_overrides: BTreeMap<String, String>,
}

impl Session {
    pub fn new(name: impl Into<String>, privilege: PrivilegeLevel) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            color: None,
            privilege,
            active: true,
            headers_to_set: BTreeMap::new(),
            headers_to_remove: BTreeSet::new(),
            param_overrides: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers_to_set.insert(name.into(), value.into());
        self
    }

    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers_to_remove.insert(name.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.param_overrides.insert(name.into(), value.into());
        self
    }

    fn header_override(&self, name: &str) -> Option<&String> {
        self.headers_to_set
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn strips_header(&self, name: &str) -> bool {
        self.headers_to_remove.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Header names configured both to be set and removed. Set wins.
    pub fn conflicting_headers(&self) -> Vec<String> {
        self.headers_to_set
            .keys()
            .filter(|k| self.strips_header(k))
            .cloned()
            .collect()
    }

    /// Rewrite captured headers for replay under this session.
    ///
    /// Header names match case-insensitively. Overridden headers keep their
    /// captured position and spelling; overrides for headers the capture
    /// did not carry are appended at the end.
    pub fn substitute_headers(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        let mut substituted = Vec::with_capacity(headers.len() + self.headers_to_set.len());
        let mut overridden: HashSet<String> = HashSet::new();

        for (name, value) in headers {
            let lower = name.to_ascii_lowercase();
            if let Some(new_value) = self.header_override(name) {
                // Repeated captured headers collapse into the single override
                if overridden.insert(lower) {
                    substituted.push((name.clone(), new_value.clone()));
                }
            } else if !self.strips_header(name) {
                substituted.push((name.clone(), value.clone()));
            }
        }

        for (name, value) in &self.headers_to_set {
            if !overridden.contains(&name.to_ascii_lowercase()) {
                substituted.push((name.clone(), value.clone()));
            }
        }

        substituted
    }
}

/// Replace values of matching keys anywhere in a JSON body.
///
/// Example:
///   Input:  {"userId": "attacker_123", "nested": {"id": "old"}}
///   Map:    {"userId" => "victim_456", "id" => "victim_456"}
///   Output: {"userId": "victim_456", "nested": {"id": "victim_456"}}
pub fn substitute_params(json: &mut Value, param_map: &BTreeMap<String, String>) {
    match json {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if let Some(new_val) = param_map.get(k) {
                    *v = Value::String(new_val.clone());
                } else {
                    substitute_params(v, param_map);
                }
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                substitute_params(v, param_map);
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Added(Session),
    Removed(Session),
    Updated(Session),
}

type SessionObserver = Box<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionFile {
    List(Vec<Session>),
    Wrapped { sessions: Vec<Session> },
}

/// Owns session profiles and notifies subscribers of every change
#[derive(Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
    next_id: usize,
    observers: Vec<SessionObserver>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load profiles from a JSON file holding either an array of sessions
    /// or an object with a `sessions` array.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let sessions = match serde_json::from_str::<SessionFile>(data) {
            Ok(SessionFile::List(s)) | Ok(SessionFile::Wrapped { sessions: s }) => s,
            Err(e) => return Err(AuthDiffError::InvalidSessionConfig(e.to_string())),
        };
        let mut manager = Self::new();
        for session in sessions {
            manager.add(session)?;
        }
        Ok(manager)
    }

    pub fn subscribe(&mut self, observer: impl Fn(&SessionEvent) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&self, event: SessionEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    /// Add a session, assigning an id when it has none. Returns the id.
    pub fn add(&mut self, mut session: Session) -> Result<String> {
        if session.name.trim().is_empty() {
            return Err(AuthDiffError::InvalidSessionConfig("session name must not be empty".to_string()));
        }
        if session.id.is_empty() {
            loop {
                self.next_id += 1;
                let candidate = format!("session-{}", self.next_id);
                if self.get(&candidate).is_none() {
                    session.id = candidate;
                    break;
                }
            }
        } else if self.get(&session.id).is_some() {
            return Err(AuthDiffError::DuplicateSession(session.id));
        }

        let conflicts = session.conflicting_headers();
        if !conflicts.is_empty() {
            warn!(session = %session.name, headers = ?conflicts, "headers both set and removed; set wins");
        }
        if session.privilege == PrivilegeLevel::Unrecognized {
            warn!(session = %session.name, "unrecognized privilege level, results will not be judged");
        }

        debug!(id = %session.id, name = %session.name, privilege = %session.privilege, "session added");
        let id = session.id.clone();
        self.sessions.push(session.clone());
        self.emit(SessionEvent::Added(session));
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<Session> {
        let index = self.position(id)?;
        let removed = self.sessions.remove(index);
        self.emit(SessionEvent::Removed(removed.clone()));
        Ok(removed)
    }

    /// Flip the active flag; returns the new state
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        self.update(id, |s| s.active = !s.active).map(|s| s.active)
    }

    /// Edit a session in place. The id cannot be changed.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut Session)) -> Result<Session> {
        let index = self.position(id)?;
        let session = &mut self.sessions[index];
        edit(session);
        session.id = id.to_string();
        let updated = session.clone();
        self.emit(SessionEvent::Updated(updated.clone()));
        Ok(updated)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Active sessions in insertion order
    pub fn active_sessions(&self) -> Vec<Session> {
        self.sessions.iter().filter(|s| s.active).cloned().collect()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AuthDiffError::UnknownSession(id.to_string()))
    }
}
