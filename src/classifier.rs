// Bypass classifier
// Turns a comparison result into a security judgment based on the
// privilege level the replaying session is supposed to have.

use crate::comparator::compare;
use crate::models::{BypassVerdict, ComparisonResult, PrivilegeLevel, Response, Severity};
use tracing::warn;

/// Classify a replayed response against the original.
///
/// | privilege    | SAME          | SIMILAR         | DIFFERENT | ERROR |
/// |--------------|---------------|-----------------|-----------|-------|
/// | low          | bypass HIGH   | bypass MEDIUM   | none      | none  |
/// | medium       | bypass MEDIUM | none            | none      | none  |
/// | high         | none          | none            | none      | none  |
/// | unrecognized | none          | none            | none      | none  |
pub fn classify(original: &Response, replayed: &Response, privilege: PrivilegeLevel) -> BypassVerdict {
    let result = compare(original, replayed);

    if result == ComparisonResult::Error {
        return not_bypassed(result, "Request failed");
    }

    match (privilege, result) {
        (PrivilegeLevel::Low, ComparisonResult::Same) => BypassVerdict {
            bypass: true,
            severity: Severity::High,
            result,
            message: "Low privilege session received the same response as the original".to_string(),
        },
        (PrivilegeLevel::Low, ComparisonResult::Similar) => BypassVerdict {
            bypass: true,
            severity: Severity::Medium,
            result,
            message: "Low privilege session received a similar response to the original".to_string(),
        },
        (PrivilegeLevel::Medium, ComparisonResult::Same) => BypassVerdict {
            bypass: true,
            severity: Severity::Medium,
            result,
            message: "Medium privilege session received the same response as the original".to_string(),
        },
        (PrivilegeLevel::Unrecognized, _) => {
            warn!(%result, "unrecognized privilege level, skipping bypass judgment");
            not_bypassed(result, "Unrecognized privilege level, no judgment made")
        }
        _ => not_bypassed(result, "Authorization working correctly"),
    }
}

fn not_bypassed(result: ComparisonResult, message: &str) -> BypassVerdict {
    BypassVerdict {
        bypass: false,
        severity: Severity::None,
        result,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> Response {
        Response::new(status, Some(body.to_string()))
    }

    #[test]
    fn low_privilege_same_is_high() {
        let v = classify(&resp(200, r#"{"a":1}"#), &resp(200, r#"{"a":1}"#), PrivilegeLevel::Low);
        assert!(v.bypass);
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.result, ComparisonResult::Same);
    }

    #[test]
    fn low_privilege_similar_is_medium() {
        let v = classify(&resp(200, r#"{"a":1}"#), &resp(200, r#"{"a":2}"#), PrivilegeLevel::Low);
        assert!(v.bypass);
        assert_eq!(v.severity, Severity::Medium);
        assert_eq!(v.result, ComparisonResult::Similar);
    }

    #[test]
    fn medium_privilege_same_is_medium() {
        let v = classify(&resp(200, "x"), &resp(200, "x"), PrivilegeLevel::Medium);
        assert!(v.bypass);
        assert_eq!(v.severity, Severity::Medium);
    }

    #[test]
    fn medium_privilege_similar_is_not_flagged() {
        let v = classify(&resp(200, "x"), &resp(200, "y"), PrivilegeLevel::Medium);
        assert!(!v.bypass);
        assert_eq!(v.severity, Severity::None);
        assert_eq!(v.result, ComparisonResult::Similar);
    }

    #[test]
    fn high_privilege_is_never_flagged() {
        for replayed in [resp(200, "x"), resp(200, "y"), resp(403, "x")] {
            let v = classify(&resp(200, "x"), &replayed, PrivilegeLevel::High);
            assert!(!v.bypass);
            assert_eq!(v.message, "Authorization working correctly");
        }
    }

    #[test]
    fn denied_replay_is_not_a_bypass() {
        let v = classify(&resp(200, "secret"), &resp(403, "forbidden"), PrivilegeLevel::Low);
        assert!(!v.bypass);
        assert_eq!(v.result, ComparisonResult::Different);
    }

    #[test]
    fn replay_error_is_never_a_bypass() {
        let v = classify(&resp(200, "x"), &Response::failed("connection reset"), PrivilegeLevel::Low);
        assert!(!v.bypass);
        assert_eq!(v.severity, Severity::None);
        assert_eq!(v.result, ComparisonResult::Error);
        assert_eq!(v.message, "Request failed");
    }

    #[test]
    fn unrecognized_privilege_degrades_to_no_judgment() {
        let v = classify(&resp(200, "x"), &resp(200, "x"), PrivilegeLevel::Unrecognized);
        assert!(!v.bypass);
        assert_eq!(v.severity, Severity::None);
        assert_eq!(v.result, ComparisonResult::Same);
    }
}
