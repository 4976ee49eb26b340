// Authorization analyzer
// Application context tying sessions, replay, classification and the
// result log together. One instance is constructed and owned by the host.

use crate::aggregator::ResultAggregator;
use crate::classifier::classify;
use crate::models::{AuthCheckResult, CapturedExchange, Response, SessionResult};
use crate::replay::Replayer;
use crate::session::{Session, SessionManager};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AuthAnalyzer<R> {
    sessions: SessionManager,
    results: ResultAggregator,
    replayer: Arc<R>,
    /// Replay all sessions of a request at once instead of one by one
    pub concurrent: bool,
}

impl<R: Replayer + 'static> AuthAnalyzer<R> {
    pub fn new(sessions: SessionManager, replayer: R) -> Self {
        Self {
            sessions,
            results: ResultAggregator::new(),
            replayer: Arc::new(replayer),
            concurrent: true,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    /// Classify already replayed responses and record the outcome.
    /// Session results keep the order of `replays`.
    pub fn analyze(&self, exchange: &CapturedExchange, replays: Vec<(Session, Response)>) -> Arc<AuthCheckResult> {
        let session_results = replays
            .into_iter()
            .map(|(session, replayed)| {
                let verdict = classify(&exchange.response, &replayed, session.privilege);
                debug!(
                    session = %session.name,
                    url = %exchange.request.url,
                    result = %verdict.result,
                    severity = %verdict.severity,
                    "classified"
                );
                SessionResult {
                    session_id: session.id,
                    session_name: session.name,
                    verdict,
                }
            })
            .collect();

        self.results.record(AuthCheckResult::new(
            exchange.request.clone(),
            exchange.response.clone(),
            session_results,
        ))
    }

    /// Replay a captured request under every active session and record
    /// the result. Returns `None` when no session is active.
    pub async fn check_exchange(&self, exchange: &CapturedExchange) -> Option<Arc<AuthCheckResult>> {
        let sessions = self.sessions.active_sessions();
        if sessions.is_empty() {
            debug!(url = %exchange.request.url, "no active sessions, skipping");
            return None;
        }

        // A failed capture cannot be compared, so there is nothing to replay
        let replays = if exchange.response.is_error() {
            debug!(url = %exchange.request.url, "original request failed, not replaying");
            sessions
                .into_iter()
                .map(|session| (session, Response::failed("Original request failed")))
                .collect()
        } else if self.concurrent {
            self.replay_concurrently(exchange, sessions).await
        } else {
            let mut replays = Vec::with_capacity(sessions.len());
            for session in sessions {
                let response = self.replayer.replay(&exchange.request, &session).await;
                replays.push((session, response));
            }
            replays
        };

        Some(self.analyze(exchange, replays))
    }

    async fn replay_concurrently(&self, exchange: &CapturedExchange, sessions: Vec<Session>) -> Vec<(Session, Response)> {
        let mut handles = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let replayer = Arc::clone(&self.replayer);
            let request = exchange.request.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move { replayer.replay(&request, &session).await }));
        }

        // Awaited in spawn order so results follow session order, not completion order
        let mut replays = Vec::with_capacity(sessions.len());
        for (session, handle) in sessions.into_iter().zip(handles) {
            let response = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    warn!(session = %session.name, error = %e, "replay task failed");
                    Response::failed(format!("Replay task failed: {}", e))
                }
            };
            replays.push((session, response));
        }
        replays
    }

    /// Check each exchange in order; returns how many were recorded
    pub async fn check_all(&self, exchanges: &[CapturedExchange]) -> usize {
        let mut recorded = 0;
        for exchange in exchanges {
            if self.check_exchange(exchange).await.is_some() {
                recorded += 1;
            }
        }
        recorded
    }
}
