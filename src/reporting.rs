// Reporting and output for authdiff
// CSV and Markdown export of the authorization check log

use crate::models::AuthCheckResult;
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let needs_escaping = matches!(field.chars().next(), Some('=' | '+' | '-' | '@' | '\t'));

    if needs_escaping {
        // Prefix with single quote to prevent formula injection
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn report_filename(extension: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("authdiff_report_{}.{}", timestamp, extension)
}

/// Write the CSV report rows for `results`
pub fn write_csv<W: Write>(out: &mut W, results: &[Arc<AuthCheckResult>]) -> std::io::Result<()> {
    writeln!(out, "Method,URL,Session,Result,Bypass,Severity,Message")?;
    for check in results {
        for session in &check.session_results {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                check.request.method,
                escape_csv_field(&check.request.url),
                escape_csv_field(&session.session_name),
                session.verdict.result,
                session.verdict.bypass,
                session.verdict.severity,
                escape_csv_field(&session.verdict.message)
            )?;
        }
    }
    Ok(())
}

/// Write the Markdown report for `results`
pub fn write_markdown<W: Write>(out: &mut W, results: &[Arc<AuthCheckResult>]) -> std::io::Result<()> {
    let bypassed = results.iter().filter(|r| r.has_bypass()).count();
    writeln!(out, "# Authorization Report\n")?;
    writeln!(
        out,
        "{} request(s) tested, {} with at least one bypass.\n",
        results.len(),
        bypassed
    )?;

    for check in results {
        let marker = if check.has_bypass() {
            format!(" **BYPASS ({})**", check.highest_severity())
        } else {
            String::new()
        };
        writeln!(out, "## {} {}{}\n", check.request.method, check.request.url, marker)?;
        writeln!(out, "Original status: {}\n", check.original.status)?;
        for session in &check.session_results {
            writeln!(
                out,
                "- **{}**: {} / {}: {}",
                session.session_name,
                session.verdict.result,
                session.verdict.severity,
                session.verdict.message
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn export_csv(results: &[Arc<AuthCheckResult>]) -> Result<String, std::io::Error> {
    let filename = report_filename("csv");
    let mut file = File::create(&filename)?;
    write_csv(&mut file, results)?;
    Ok(filename)
}

pub fn export_markdown(results: &[Arc<AuthCheckResult>]) -> Result<String, std::io::Error> {
    let filename = report_filename("md");
    let mut file = File::create(&filename)?;
    write_markdown(&mut file, results)?;
    Ok(filename)
}
