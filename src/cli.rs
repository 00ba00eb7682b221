//! Command line front end: parses every file and writes one JSON record per hand.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use serde::Serialize;
use tracing::{debug, info};

use crate::context::TournamentContext;
use crate::error::Parsed;
use crate::exit_code;
use crate::logging;
use crate::parser::Hand;
use crate::reader::{HistoryFile, ParseOptions};

#[derive(Debug, Parser)]
#[command(
    name = "holdem-ko-parser",
    version,
    about = "Parse Full Tilt knockout tournament hand histories into JSON Lines"
)]
pub struct Args {
    /// Hand history files to parse
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Stop after N hand blocks per file
    #[arg(long, value_name = "N")]
    pub max_hands: Option<usize>,

    /// Pretty-print JSON instead of one record per line
    #[arg(long)]
    pub pretty: bool,

    /// Count hands with warnings as failures
    #[arg(long)]
    pub deny_warnings: bool,

    /// Carry stacks across hands and warn about drift
    #[arg(long)]
    pub track_stacks: bool,

    /// Do not print per-file summaries
    #[arg(short, long)]
    pub quiet: bool,

    /// Raise the default log level (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_hands: self.max_hands,
        }
    }
}

/// One line of output.
#[derive(Debug, Serialize)]
struct HandRecord<'a> {
    file: &'a str,
    index: usize,
    /// Whether the buy-in carries a bounty.
    knockout: bool,
    #[serde(flatten)]
    hand: &'a Parsed<Hand>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FileReport {
    parsed: usize,
    failed: usize,
    warnings: usize,
}

impl FileReport {
    fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            exit_code::PARSE_FAILURE
        } else {
            exit_code::SUCCESS
        }
    }
}

/// Runs the command line with the given arguments and returns the exit code.
///
/// Help and version go to `out` with code `0`; other usage errors go to `err`
/// with code `2`.
pub fn run<I, S>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let argv: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
    let args = match Args::try_parse_from(&argv) {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;

            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    if write!(out, "{}", e).is_err() {
                        return exit_code::ERROR;
                    }
                    exit_code::SUCCESS
                }
                _ => {
                    let _ = write!(err, "{}", e);
                    exit_code::ERROR
                }
            };
        }
    };
    logging::init(args.verbose);

    match run_files(&args, out, err) {
        Ok(code) => code,
        Err(e) => {
            let _ = writeln!(err, "error: {:#}", e);
            exit_code::ERROR
        }
    }
}

fn run_files(args: &Args, out: &mut dyn Write, err: &mut dyn Write) -> anyhow::Result<i32> {
    let mut contexts: HashMap<u64, TournamentContext> = HashMap::new();
    let mut code = exit_code::SUCCESS;
    for path in &args.files {
        let file = match HistoryFile::open(path) {
            Ok(file) => file,
            Err(e) => {
                writeln!(err, "{}", e)?;
                code = code.max(exit_code::ERROR);
                continue;
            }
        };
        let report = parse_one(args, &file, &mut contexts, out, err)?;
        if !args.quiet {
            writeln!(
                err,
                "{}: {} hands parsed, {} failed, {} warnings",
                file.name(),
                report.parsed,
                report.failed,
                report.warnings
            )?;
        }
        info!(file = file.name(), parsed = report.parsed, failed = report.failed, "file done");
        code = code.max(report.exit_code());
    }
    out.flush().context("cannot flush stdout")?;
    Ok(code)
}

fn parse_one(
    args: &Args,
    file: &HistoryFile,
    contexts: &mut HashMap<u64, TournamentContext>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> anyhow::Result<FileReport> {
    let mut report = FileReport::default();
    for (index, result) in file.hands(args.parse_options()).enumerate() {
        let parsed = match result {
            Ok(parsed) => parsed,
            Err(failure) => {
                debug!(raw = %failure.raw, "failed block");
                writeln!(err, "{}: {}", file.name(), failure)?;
                report.failed += 1;
                continue;
            }
        };
        let mut warnings = parsed.warnings.len();
        for warning in &parsed.warnings {
            writeln!(err, "{}: hand #{}: warning: {}", file.name(), index, warning)?;
        }
        if args.track_stacks {
            let hand = &parsed.value;
            let tournament_id = hand.header.tournament.id;
            let context = contexts
                .entry(tournament_id)
                .or_insert_with(|| TournamentContext::new(tournament_id));
            for drift in context.observe(hand) {
                writeln!(
                    err,
                    "{}: hand #{}: warning: {} starts with {} chips, expected {}",
                    file.name(),
                    index,
                    drift.player_name,
                    drift.actual,
                    drift.expected
                )?;
                warnings += 1;
            }
        }
        report.warnings += warnings;
        if args.deny_warnings && warnings > 0 {
            writeln!(
                err,
                "{}: hand #{}: rejected with {} warnings",
                file.name(),
                index,
                warnings
            )?;
            report.failed += 1;
            continue;
        }

        let record = HandRecord {
            file: file.name(),
            index,
            knockout: parsed.value.header.tournament.is_knockout(),
            hand: &parsed,
        };
        if args.pretty {
            serde_json::to_writer_pretty(&mut *out, &record)?;
        } else {
            serde_json::to_writer(&mut *out, &record)?;
        }
        writeln!(out).context("cannot write to stdout")?;
        report.parsed += 1;
    }
    Ok(report)
}
