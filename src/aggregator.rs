// Result aggregation for authorization checks
// Append-only log of AuthCheckResult with synchronous change notification

use crate::models::{AuthCheckResult, Severity};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub enum AnalyzerEvent {
    ResultRecorded(Arc<AuthCheckResult>),
    /// Fired after `ResultRecorded` when at least one session bypassed
    BypassDetected(Arc<AuthCheckResult>),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Observer = Arc<dyn Fn(&AnalyzerEvent) + Send + Sync>;

/// Holds every recorded check in submission order.
///
/// Observers run before `record` and `clear` release the log lock, so no
/// other thread can see a result in the log whose notification has not
/// fired yet. The lock is reentrant: an observer may query or record on
/// the same aggregator.
#[derive(Default)]
pub struct ResultAggregator {
    results: ReentrantMutex<RefCell<Vec<Arc<AuthCheckResult>>>>,
    observers: RwLock<Vec<(SubscriptionId, Observer)>>,
    next_subscription: Mutex<usize>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: impl Fn(&AnalyzerEvent) + Send + Sync + 'static) -> SubscriptionId {
        let mut next = self.next_subscription.lock();
        *next += 1;
        let id = SubscriptionId(*next);
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    fn emit(&self, event: &AnalyzerEvent) {
        // Snapshot so observers can subscribe or unsubscribe while handling
        let observers: Vec<Observer> = self.observers.read().iter().map(|(_, o)| Arc::clone(o)).collect();
        for observer in observers {
            observer(event);
        }
    }

    /// Append a result. No deduplication: testing the same request twice
    /// yields two entries.
    pub fn record(&self, result: AuthCheckResult) -> Arc<AuthCheckResult> {
        let result = Arc::new(result);
        let guard = self.results.lock();
        guard.borrow_mut().push(Arc::clone(&result));

        self.emit(&AnalyzerEvent::ResultRecorded(Arc::clone(&result)));
        if result.has_bypass() {
            info!(
                method = %result.request.method,
                url = %result.request.url,
                bypasses = result.bypass_count(),
                severity = %result.highest_severity(),
                "authorization bypass detected"
            );
            self.emit(&AnalyzerEvent::BypassDetected(Arc::clone(&result)));
        }
        drop(guard);
        result
    }

    pub fn clear(&self) {
        let guard = self.results.lock();
        guard.borrow_mut().clear();
        self.emit(&AnalyzerEvent::Cleared);
        drop(guard);
    }

    /// Session results rated HIGH across the whole log
    pub fn critical_count(&self) -> usize {
        self.count_where(|severity, _| severity == Severity::High)
    }

    /// Session results flagged as a bypass across the whole log
    pub fn bypass_count(&self) -> usize {
        self.count_where(|_, bypass| bypass)
    }

    fn count_where(&self, predicate: impl Fn(Severity, bool) -> bool) -> usize {
        let results = self.results();
        let count = results
            .iter()
            .flat_map(|r| r.session_results.iter())
            .filter(|s| predicate(s.verdict.severity, s.verdict.bypass))
            .count();
        count
    }

    pub fn len(&self) -> usize {
        let guard = self.results.lock();
        let len = guard.borrow().len();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the log in insertion order
    pub fn results(&self) -> Vec<Arc<AuthCheckResult>> {
        let guard = self.results.lock();
        let snapshot = guard.borrow().clone();
        snapshot
    }

    /// The last `n` results, oldest first
    pub fn recent(&self, n: usize) -> Vec<Arc<AuthCheckResult>> {
        let mut results = self.results();
        let start = results.len().saturating_sub(n);
        results.split_off(start)
    }
}
