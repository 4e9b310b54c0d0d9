mod error;
mod fields;
mod models;
mod normalize;
mod parser;
mod report;
mod roster;
mod validator;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use models::Config;
use parser::{FileSummary, RosterParser};
use report::{CollisionDecision, WriteOutcome};
use roster::RosterSet;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use tracing::{debug, warn};
use validator::SanityChecker;

const DEFAULT_CONFIG: &str = "roster.toml";

fn cli() -> Command {
    Command::new("roster-report")
        .version("0.1.0")
        .about("Builds a consolidated student report from exported survey roster files")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .help("Roster export files, one per lecture section")
                .num_args(1..)
                .required_unless_present("write-config"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (defaults to roster.toml when present)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Report file to write"),
        )
        .arg(
            Arg::new("reject-log")
                .long("reject-log")
                .value_name("FILE")
                .help("Append-only log of rejected students"),
        )
        .arg(
            Arg::new("lecture-label")
                .long("lecture-label")
                .value_name("LABEL")
                .help("Label printed before each student's section"),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .value_name("FILE")
                .help("Write the default configuration to FILE and exit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
}

fn main() {
    let matches = cli().get_matches();
    setup_logging(matches.get_count("verbose"), matches.get_flag("quiet"));

    if let Err(e) = run(&matches) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn setup_logging(verbosity: u8, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roster_report={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(io::stderr)
                .compact(),
        )
        .init();

    debug!("Logging initialized at level: {}", level);
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => {
            println!("📋 Loading configuration from: {}", path);
            Config::load_from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path))?
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            println!("📋 Loading configuration from: {}", DEFAULT_CONFIG);
            Config::load_from_file(DEFAULT_CONFIG)
                .with_context(|| format!("Failed to load configuration {}", DEFAULT_CONFIG))?
        }
        None => {
            debug!("No configuration file, using defaults");
            Config::default()
        }
    };

    if let Some(output) = matches.get_one::<String>("output") {
        config.report_file = output.clone();
    }
    if let Some(log) = matches.get_one::<String>("reject-log") {
        config.reject_log = log.clone();
    }
    if let Some(label) = matches.get_one::<String>("lecture-label") {
        config.lecture_label = label.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(matches: &ArgMatches) -> Result<()> {
    if let Some(path) = matches.get_one::<String>("write-config") {
        Config::default().save_to_file(path)?;
        println!("📝 Default configuration written to: {}", path);
        return Ok(());
    }

    let config = load_config(matches)?;
    let files: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|values| values.collect())
        .unwrap_or_default();

    let parser = RosterParser::new(&config)?;
    let mut rosters = RosterSet::new(config.duplicate_key);
    let mut checker = SanityChecker::open(&config.reject_log, config.reject_on.clone())?;

    // The reject log is flushed before a fatal input error is propagated
    let parsed = parse_all(&parser, &files, &mut checker, &mut rosters);
    let rejected = checker.rejected();
    checker.finish()?;
    let summaries = parsed?;

    print_summary(&summaries, &rosters, rejected, &config);

    let content = report::render_report(&rosters, &config.lecture_label);
    match report::write_report(Path::new(&config.report_file), &content, prompt_collision) {
        Ok(WriteOutcome::Written(path)) => {
            println!("Student file written to {}", path.display())
        }
        Ok(WriteOutcome::Aborted) => println!("File not overwritten. No changes made."),
        Err(e) => println!("❌ Could not write student file: {}", e),
    }

    Ok(())
}

fn parse_all<W: Write>(
    parser: &RosterParser,
    files: &[&String],
    checker: &mut SanityChecker<W>,
    rosters: &mut RosterSet,
) -> error::Result<Vec<FileSummary>> {
    let mut summaries = Vec::with_capacity(files.len());
    for file in files {
        println!("📄 Processing: {}", file);
        summaries.push(parser.parse_file(Path::new(file.as_str()), checker, rosters)?);
    }
    Ok(summaries)
}

fn print_summary(summaries: &[FileSummary], rosters: &RosterSet, rejected: usize, config: &Config) {
    for (summary, roster) in summaries.iter().zip(rosters.rosters()) {
        println!(
            "   ✅ {}: {} admitted, {} rejected, {} skipped",
            summary.section, summary.admitted, summary.rejected, summary.skipped
        );
        if roster.is_empty() {
            warn!("No students admitted from {}", roster.section);
        }
    }
    println!("Number of students: {}", rosters.total_students());
    if rejected > 0 {
        println!("{} students not added. See {}", rejected, config.reject_log);
    }
}

/// Ask on the terminal what to do about an existing report file
fn prompt_collision(path: &Path) -> error::Result<CollisionDecision> {
    println!(
        "File {} already exists: Overwrite (y/n) or Enter a new name.",
        path.display()
    );
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let response = line.map_err(|e| error::Error::io("Failed to read response", e))?;
        match parse_response(&response) {
            Some(decision) => return Ok(decision),
            None => println!("Please type 'y' or 'n'."),
        }
    }
    // stdin closed: keep the existing file
    Ok(CollisionDecision::Abort)
}

fn parse_response(response: &str) -> Option<CollisionDecision> {
    let mut chars = response.chars();
    match (chars.next(), chars.next()) {
        (None, _) => None,
        (Some('y'), None) => Some(CollisionDecision::Overwrite),
        (Some('n'), None) => Some(CollisionDecision::Abort),
        (Some(_), None) => None,
        _ => Some(CollisionDecision::RenameTo(response.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_responses() {
        assert_eq!(parse_response("y"), Some(CollisionDecision::Overwrite));
        assert_eq!(parse_response("n"), Some(CollisionDecision::Abort));
        assert_eq!(parse_response("q"), None);
        assert_eq!(parse_response(""), None);
    }

    #[test]
    fn longer_response_is_a_new_name() {
        assert_eq!(
            parse_response("students_fall"),
            Some(CollisionDecision::RenameTo("students_fall".to_string()))
        );
    }

    #[test]
    fn cli_requires_files_unless_writing_config() {
        assert!(cli().try_get_matches_from(["roster-report"]).is_err());
        assert!(cli()
            .try_get_matches_from(["roster-report", "--write-config", "roster.toml"])
            .is_ok());

        let matches = cli()
            .try_get_matches_from(["roster-report", "-o", "out", "a.txt", "b.txt"])
            .unwrap();
        let files: Vec<&String> = matches.get_many::<String>("files").unwrap().collect();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
        assert_eq!(matches.get_one::<String>("output").unwrap(), "out");
    }

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn reject_log_is_flushed_when_a_later_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("problem_students.txt");
        let roster_path = dir.path().join("lecture1.txt");
        let missing_path = dir.path().join("lecture2.txt");

        let mut fields = vec![""; 95];
        fields[2] = "Mail";
        fields[5] = "No";
        fields[8] = "1234";
        fields[11] = "Junior";
        let row = format!("\"{}\"", fields.join("\",\""));
        std::fs::write(&roster_path, utf16le_with_bom(&format!("header\n{}\n", row))).unwrap();

        let config = Config::default();
        let parser = RosterParser::new(&config).unwrap();
        let mut rosters = RosterSet::new(config.duplicate_key);
        let mut checker = SanityChecker::open(&log_path, config.reject_on.clone()).unwrap();

        let roster_file = roster_path.display().to_string();
        let missing_file = missing_path.display().to_string();
        let files = vec![&roster_file, &missing_file];
        let parsed = parse_all(&parser, &files, &mut checker, &mut rosters);
        assert_eq!(checker.rejected(), 1);
        checker.finish().unwrap();

        assert!(matches!(parsed, Err(error::Error::FileNotFound { .. })));
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("No Mail [lecture1.txt] rejected: missing or unusable email\n"));
    }

    #[test]
    fn cli_overrides_config() {
        let matches = cli()
            .try_get_matches_from([
                "roster-report",
                "--config",
                "/nonexistent/roster.toml",
                "a.txt",
            ])
            .unwrap();
        assert!(load_config(&matches).is_err());

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        std::fs::write(&config_path, "lecture_label = \"Professor\"\n").unwrap();
        let matches = cli()
            .try_get_matches_from([
                "roster-report",
                "--config",
                config_path.to_str().unwrap(),
                "--reject-log",
                "rejects.txt",
                "a.txt",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.lecture_label, "Professor");
        assert_eq!(config.reject_log, "rejects.txt");
        assert_eq!(config.report_file, "students");
    }
}
