use authdiff::models::{
    AuthCheckResult, BypassVerdict, CapturedRequest, ComparisonResult, Method, Response, SessionResult, Severity,
};
use authdiff::reporting::{export_csv, export_markdown, write_csv, write_markdown};
use std::fs;
use std::sync::Arc;

fn session_result(name: &str, result: ComparisonResult, bypass: bool, severity: Severity, message: &str) -> SessionResult {
    SessionResult {
        session_id: name.to_string(),
        session_name: name.to_string(),
        verdict: BypassVerdict {
            bypass,
            severity,
            result,
            message: message.to_string(),
        },
    }
}

fn sample_results() -> Vec<Arc<AuthCheckResult>> {
    vec![
        Arc::new(AuthCheckResult::new(
            CapturedRequest::new(Method::GET, "https://api.test/users/1"),
            Response::new(200, Some("{}".to_string())),
            vec![
                session_result("guest", ComparisonResult::Same, true, Severity::High, "Low privilege session received the same response as the original"),
                session_result("admin", ComparisonResult::Same, false, Severity::None, "Authorization working correctly"),
            ],
        )),
        Arc::new(AuthCheckResult::new(
            CapturedRequest::new(Method::DELETE, "https://api.test/items?a=1,2"),
            Response::new(204, None),
            vec![session_result("=cmd|'/C calc'!A1", ComparisonResult::Different, false, Severity::None, "Authorization working correctly")],
        )),
    ]
}

#[test]
fn reporting_exports_create_files() {
    let results = sample_results();

    let csv_filename = export_csv(&results).expect("CSV export should succeed");
    let md_filename = export_markdown(&results).expect("Markdown export should succeed");

    assert!(fs::metadata(&csv_filename).is_ok(), "CSV file should exist: {}", csv_filename);
    assert!(fs::metadata(&md_filename).is_ok(), "Markdown file should exist: {}", md_filename);

    assert!(csv_filename.starts_with("authdiff_report_"));
    assert!(csv_filename.ends_with(".csv"));
    assert!(md_filename.starts_with("authdiff_report_"));
    assert!(md_filename.ends_with(".md"));

    let _ = fs::remove_file(&csv_filename);
    let _ = fs::remove_file(&md_filename);
}

#[test]
fn csv_has_one_row_per_session_result() {
    let mut out = Vec::new();
    write_csv(&mut out, &sample_results()).unwrap();
    let content = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "Method,URL,Session,Result,Bypass,Severity,Message");
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[1],
        "GET,https://api.test/users/1,guest,SAME,true,HIGH,Low privilege session received the same response as the original"
    );
    assert!(lines[2].starts_with("GET,https://api.test/users/1,admin,SAME,false,NONE"));
}

#[test]
fn csv_escapes_injection_and_commas() {
    let mut out = Vec::new();
    write_csv(&mut out, &sample_results()).unwrap();
    let content = String::from_utf8(out).unwrap();

    assert!(content.contains("\"https://api.test/items?a=1,2\""), "Comma should cause quoting");
    assert!(content.contains("\"'=cmd|'/C calc'!A1\""), "Formula prefix should be escaped");
}

#[test]
fn markdown_groups_by_request_and_flags_bypasses() {
    let mut out = Vec::new();
    write_markdown(&mut out, &sample_results()).unwrap();
    let content = String::from_utf8(out).unwrap();

    assert!(content.starts_with("# Authorization Report\n"));
    assert!(content.contains("2 request(s) tested, 1 with at least one bypass."));
    assert!(content.contains("## GET https://api.test/users/1 **BYPASS (HIGH)**"));
    assert!(content.contains("## DELETE https://api.test/items?a=1,2\n"));
    assert!(content.contains("- **guest**: SAME / HIGH: Low privilege session"));
    assert!(content.contains("Original status: 204"));
}

#[test]
fn empty_log_produces_header_only() {
    let mut out = Vec::new();
    write_csv(&mut out, &[]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Method,URL,Session,Result,Bypass,Severity,Message\n");
}
