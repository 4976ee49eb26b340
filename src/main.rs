// Main CLI entry point for authdiff
// Uses clap for argument parsing

use anyhow::{Context, Result};
use authdiff::aggregator::AnalyzerEvent;
use authdiff::analyzer::AuthAnalyzer;
use authdiff::parsers::{CaptureParser, HarParser};
use authdiff::replay::HttpReplayer;
use authdiff::reporting::{export_csv, export_markdown};
use authdiff::session::SessionManager;
use clap::{Arg, ArgAction, Command};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("authdiff")
        .version(clap::crate_version!())
        .author("Jake Abendroth")
        .about("Replays captured requests under alternate sessions to detect authorization bypasses")
        .after_help("EXAMPLES:\n  authdiff --capture traffic.har --sessions sessions.json\n  authdiff -c captures/ -s sessions.json --scope '^https://api\\.example\\.com/' --fail-on-bypass\n\nSESSIONS FILE:\n  [{\"name\": \"guest\", \"privilege\": \"low\", \"headersToSet\": {\"Cookie\": \"sid=...\"}, \"headersToRemove\": [\"Authorization\"]}]")
        .arg(Arg::new("capture")
            .short('c')
            .long("capture")
            .required(true)
            .num_args(1)
            .help("HAR file, or directory of .har files, captured under the privileged session"))
        .arg(Arg::new("sessions")
            .short('s')
            .long("sessions")
            .required(true)
            .num_args(1)
            .help("JSON file describing the sessions to replay with"))
        .arg(Arg::new("scope")
            .long("scope")
            .num_args(1)
            .help("Only test URLs matching this regular expression"))
        .arg(Arg::new("include_static")
            .long("include-static")
            .action(ArgAction::SetTrue)
            .help("Also test scripts, stylesheets, images and fonts"))
        .arg(Arg::new("sequential")
            .long("sequential")
            .action(ArgAction::SetTrue)
            .help("Replay sessions one at a time instead of concurrently"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .num_args(1)
            .value_parser(clap::value_parser!(u64))
            .default_value("30")
            .help("Replay timeout in seconds"))
        .arg(Arg::new("csv_report")
            .long("csv-report")
            .action(ArgAction::SetTrue)
            .help("Output CSV report (default: on)"))
        .arg(Arg::new("markdown_report")
            .long("markdown-report")
            .action(ArgAction::SetTrue)
            .help("Output Markdown report (default: on)"))
        .arg(Arg::new("fail_on_bypass")
            .long("fail-on-bypass")
            .action(ArgAction::SetTrue)
            .help("Exit with status 1 when any bypass is found"))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::SetTrue)
            .help("Enable debug logging"))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_tracing(matches.get_flag("verbose"));

    let capture = matches.get_one::<String>("capture").context("capture is required")?;
    let sessions_path = matches.get_one::<String>("sessions").context("sessions is required")?;
    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(30);
    let csv_report = matches.get_flag("csv_report") || !matches.get_flag("markdown_report");
    let markdown_report = matches.get_flag("markdown_report") || !matches.get_flag("csv_report");

    let sessions = SessionManager::from_file(sessions_path)
        .with_context(|| format!("Failed to load sessions from {}", sessions_path))?;
    let active = sessions.active_sessions().len();
    info!(total = sessions.sessions().len(), active, "loaded sessions");
    if active == 0 {
        anyhow::bail!("No active sessions in {}", sessions_path);
    }

    let mut parser = HarParser::new().including_static(matches.get_flag("include_static"));
    if let Some(scope) = matches.get_one::<String>("scope") {
        parser = parser.with_scope(scope)?;
    }
    let exchanges = parser
        .parse(capture)
        .with_context(|| format!("Failed to parse capture {}", capture))?;
    println!("Loaded {} captured requests.", exchanges.len());

    let replayer = HttpReplayer::new(Duration::from_secs(timeout))?;
    let mut analyzer = AuthAnalyzer::new(sessions, replayer);
    analyzer.concurrent = !matches.get_flag("sequential");

    analyzer.results().subscribe(|event| {
        if let AnalyzerEvent::ResultRecorded(check) = event {
            for session in &check.session_results {
                let label = if session.verdict.bypass {
                    format!("BYPASS {}", session.verdict.severity)
                } else {
                    session.verdict.result.to_string()
                };
                println!(
                    "[{}] {} {} as {}: {}",
                    label, check.request.method, check.request.url, session.session_name, session.verdict.message
                );
            }
        }
    });

    analyzer.check_all(&exchanges).await;

    let results = analyzer.results().results();
    let bypasses = analyzer.results().bypass_count();
    let critical = analyzer.results().critical_count();
    println!(
        "Tested {} requests: {} bypass(es), {} critical.",
        results.len(),
        bypasses,
        critical
    );

    if csv_report {
        let file = export_csv(&results).context("Failed to write CSV report")?;
        println!("CSV report: {}", file);
    }
    if markdown_report {
        let file = export_markdown(&results).context("Failed to write Markdown report")?;
        println!("Markdown report: {}", file);
    }

    if matches.get_flag("fail_on_bypass") && bypasses > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn cli_parses_flags() {
        let matches = cli()
            .try_get_matches_from(["authdiff", "-c", "t.har", "-s", "s.json", "--sequential", "--timeout", "5"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("capture").unwrap(), "t.har");
        assert!(matches.get_flag("sequential"));
        assert_eq!(*matches.get_one::<u64>("timeout").unwrap(), 5);
    }
}
