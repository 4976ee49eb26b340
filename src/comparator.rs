// Response comparator
// Decides whether a replayed response is equivalent to the original one

use crate::models::{ComparisonResult, Response};
use crate::normalize::normalize;
use tracing::debug;

/// Compare the original response against one replayed under another session.
///
/// 1. Either side failed to complete = ERROR (nothing else is looked at)
/// 2. Same status, identical normalized bodies = SAME
/// 3. Same status, different bodies = SIMILAR
/// 4. Different status = DIFFERENT
///
/// Content drift under an unchanged status (timestamps, nonces, per-session
/// ids) stays SIMILAR so it is surfaced for review rather than cleared.
pub fn compare(original: &Response, replayed: &Response) -> ComparisonResult {
    if original.is_error() || replayed.is_error() {
        return ComparisonResult::Error;
    }

    let status_match = original.status == replayed.status;
    let original_body = normalize(original.body.as_deref());
    let replayed_body = normalize(replayed.body.as_deref());

    if status_match && original_body == replayed_body {
        return ComparisonResult::Same;
    }

    if status_match && original_body.is_empty() && replayed_body.is_empty() {
        return ComparisonResult::Same;
    }

    if status_match {
        debug!(
            status = original.status,
            original_len = original_body.len(),
            replayed_len = replayed_body.len(),
            delta_percent = length_delta_percent(&original_body, &replayed_body),
            "status matches but bodies differ"
        );
        return ComparisonResult::Similar;
    }

    ComparisonResult::Different
}

/// Relative length difference of two normalized bodies, in percent of the
/// longer one. Diagnostic only; it never gates a verdict.
pub fn length_delta_percent(a: &str, b: &str) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    let delta = a.len().abs_diff(b.len());
    delta as f64 / longest as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> Response {
        Response::new(status, Some(body.to_string()))
    }

    #[test]
    fn replay_error_short_circuits() {
        let original = resp(200, "{\"a\":1}");
        let mut replayed = resp(200, "{\"a\":1}");
        replayed.error = Some("timeout".to_string());
        assert_eq!(compare(&original, &replayed), ComparisonResult::Error);
    }

    #[test]
    fn identical_bodies_are_same() {
        assert_eq!(compare(&resp(200, "ok"), &resp(200, "ok")), ComparisonResult::Same);
    }

    #[test]
    fn reordered_json_keys_are_same() {
        let original = resp(200, r#"{"id":1,"name":"x"}"#);
        let replayed = resp(200, r#"{"name":"x","id":1}"#);
        assert_eq!(compare(&original, &replayed), ComparisonResult::Same);
    }

    #[test]
    fn empty_and_absent_bodies_are_same() {
        let original = resp(200, "");
        let replayed = Response::new(200, None);
        assert_eq!(compare(&original, &replayed), ComparisonResult::Same);
    }

    #[test]
    fn content_drift_is_similar() {
        let original = resp(200, r#"{"a":1}"#);
        let replayed = resp(200, r#"{"a":2}"#);
        assert_eq!(compare(&original, &replayed), ComparisonResult::Similar);
    }

    #[test]
    fn status_change_is_different_regardless_of_body() {
        assert_eq!(compare(&resp(200, "same"), &resp(403, "same")), ComparisonResult::Different);
        assert_eq!(compare(&resp(200, ""), &resp(401, "")), ComparisonResult::Different);
    }

    #[test]
    fn failed_original_is_not_comparable() {
        let original = Response::failed("net::ERR_TIMED_OUT");
        assert_eq!(compare(&original, &resp(200, "secret")), ComparisonResult::Error);
        assert_eq!(compare(&original, &Response::failed("reset")), ComparisonResult::Error);
    }

    #[test]
    fn length_delta() {
        assert_eq!(length_delta_percent("", ""), 0.0);
        assert_eq!(length_delta_percent("abcd", "ab"), 50.0);
        assert_eq!(length_delta_percent("ab", "abcd"), 50.0);
    }
}
