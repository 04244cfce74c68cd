#![forbid(unsafe_code)]

mod output;
mod report;
mod scan;

use anyhow::anyhow;
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use output::OutputMode;
use scan::{Scanner, Zone};
use snapkeep_core::config::{Config, resolve_config};
use snapkeep_core::error::ErrorCode;
use snapkeep_core::{Period, Policy, prune};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const AFTER_HELP: &str = "\
POLICY: N@unit:X
    keep the last N snapshots every X units
    omit N@ to keep an unbounded number of snapshots
    omit :X to use :1
    each unit:X pair may only appear once

UNITS:
    last       snapshot count (X must be 1)
    secondly   clock seconds (X may also be a duration like 1h30m)
    daily      calendar days
    monthly    calendar months
    yearly     calendar years

NOTES:
    input lines are read from stdin and are unix timestamps unless --extract or --parse is set
    output lines are input lines to prune, or to keep with --invert
    invalid lines are ignored, or passed through with --invert
    snapshots are ordered by absolute time; zones only move calendar boundaries

EXAMPLES:
    # Keep the newest snapshot, one per day for a week and one per year forever
    ls /backups | snapkeep -e '^snap-(\\d+)\\.tar$' 1@last 7@daily yearly

    # Parse ISO dates in local time and explain every decision
    snapkeep -p '%Y-%m-%dT%H:%M:%S' -L --why 24@secondly:1h 30@daily < snapshots.txt";

#[derive(Parser, Debug)]
#[command(
    name = "snapkeep",
    author,
    version,
    about = "snapkeep: decide which snapshots to prune under a retention policy",
    long_about = None,
    after_help = AFTER_HELP
)]
struct Cli {
    /// Retention rules (N@unit:X). Replaces the policy from the config file.
    #[arg(value_name = "POLICY")]
    policy: Vec<String>,

    /// Do not warn about invalid or unmatched input lines.
    #[arg(short, long)]
    quiet: bool,

    /// Extract the timestamp from each line with a regexp (at most one
    /// capture group).
    #[arg(short, long, value_name = "REGEX")]
    extract: Option<String>,

    /// Print only the part of each line matched by --extract.
    #[arg(short, long)]
    only: bool,

    /// Parse timestamps with a strftime format instead of unix seconds.
    #[arg(short, long, value_name = "FORMAT")]
    parse: Option<String>,

    /// Use the local time zone instead of UTC for timestamps without one.
    #[arg(short = 'L', long)]
    local_time: bool,

    /// Output the snapshots to keep instead of the ones to prune.
    #[arg(short = 'v', long)]
    invert: bool,

    /// Explain on stderr why each snapshot is kept.
    #[arg(short, long)]
    why: bool,

    /// Summarize the policy results on stderr.
    #[arg(short, long)]
    summarize: bool,

    /// Emit a JSON report instead of filtered lines.
    #[arg(long)]
    json: bool,

    /// Config file to use instead of the default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }
}

/// Everything a run needs once flags and config are merged.
#[derive(Debug)]
struct Settings {
    policy: Policy,
    scanner: Scanner,
    invert: bool,
    why: bool,
    summarize: bool,
    output: OutputMode,
}

/// A fatal condition: printed as `snapkeep: fatal: ...`, exits with 2.
#[derive(Debug)]
struct Fatal {
    code: ErrorCode,
    error: anyhow::Error,
}

impl Fatal {
    fn new(code: ErrorCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            code,
            error: error.into(),
        }
    }

    fn report(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "snapkeep: fatal: {}: {:#}",
            self.code.message(),
            self.error
        )?;
        if let Some(hint) = self.code.hint() {
            writeln!(w, "snapkeep: hint: {hint}")?;
        }
        Ok(())
    }
}

const EXIT_FATAL: u8 = 2;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SNAPKEEP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "snapkeep=debug"
        } else {
            "snapkeep=warn"
        })
    });

    let format = env::var("SNAPKEEP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

/// Merge command-line flags over the config file.
fn settings(cli: &Cli, config: Config) -> Result<Settings, Fatal> {
    let policy = if cli.policy.is_empty() {
        config.policy.ok_or_else(|| {
            Fatal::new(
                ErrorCode::MissingPolicy,
                anyhow!("no rules on the command line or in the config file"),
            )
        })?
    } else {
        Policy::parse(&cli.policy).map_err(|err| Fatal::new(ErrorCode::InvalidPolicy, err))?
    };

    let extract = cli
        .extract
        .clone()
        .or(config.extract)
        .map(|pattern| scan::compile_extract(&pattern))
        .transpose()
        .map_err(|err| Fatal::new(ErrorCode::InvalidExtract, err))?;

    let zone = if cli.local_time || config.local_time {
        Zone::Local
    } else {
        Zone::Utc
    };

    Ok(Settings {
        policy,
        scanner: Scanner {
            extract,
            only: cli.only,
            format: cli.parse.clone().or(config.parse),
            zone,
            quiet: cli.quiet || config.quiet,
        },
        invert: cli.invert,
        why: cli.why,
        summarize: cli.summarize,
        output: cli.output_mode(),
    })
}

/// Scan, prune and report.
fn execute(
    settings: &Settings,
    input: impl BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), Fatal> {
    let write_failed = |e: io::Error| Fatal::new(ErrorCode::OutputWriteFailed, e);

    let scanned = settings
        .scanner
        .scan(input, err)
        .map_err(|e| Fatal::new(ErrorCode::InputReadFailed, e))?;
    let (snapshots, origin) = scanned.snapshots();

    debug!(policy = %settings.policy, snapshots = snapshots.len(), "pruning");
    let pruned = prune(&snapshots, &settings.policy);

    // reasons per input line; lines without a timestamp have none
    let mut reasons: Vec<Vec<Period>> = vec![Vec::new(); scanned.lines.len()];
    for (reason, &line) in pruned.keep.iter().zip(&origin) {
        reasons[line].clone_from(reason);
    }

    if settings.output.is_json() {
        let report = report::Report::new(
            &settings.policy,
            &pruned.need,
            &scanned.lines,
            &scanned.times,
            &reasons,
        );
        output::render_json(out, &report).map_err(write_failed)?;
    } else {
        let selected = scanned
            .lines
            .iter()
            .zip(&scanned.times)
            .zip(&reasons)
            .filter(|((_, at), reason)| {
                let prunable = at.is_some() && reason.is_empty();
                prunable != settings.invert
            })
            .map(|((line, _), _)| line.as_slice());
        output::render_lines(out, selected).map_err(write_failed)?;
    }
    out.flush().map_err(write_failed)?;

    if settings.why {
        report::write_why(err, &snapshots, &pruned.keep).map_err(write_failed)?;
    }
    if settings.summarize {
        report::write_summary(
            err,
            &settings.policy,
            &pruned.need,
            pruned.pruned(),
            snapshots.len(),
        )
        .map_err(write_failed)?;
    }
    Ok(())
}

fn run(cli: &Cli, input: impl BufRead, out: &mut dyn Write, err: &mut dyn Write) -> u8 {
    let result = resolve_config(cli.config.as_deref())
        .map_err(|e| Fatal::new(ErrorCode::ConfigParseError, e))
        .and_then(|config| settings(cli, config))
        .and_then(|settings| execute(&settings, input, out, err));
    match result {
        Ok(()) => 0,
        Err(fatal) => {
            debug!(code = %fatal.code, "fatal error");
            // nothing left to report to if stderr is gone
            let _ = fatal.report(err);
            EXIT_FATAL
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "snapkeep", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    ExitCode::from(run(
        &cli,
        stdin.lock(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    ))
}
