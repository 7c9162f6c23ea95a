//! site-relocate -- inspect and apply a migration plan.
//!
//! Usage:
//!   site-relocate --plan <plan.json> pairs [--scope <name>]
//!   site-relocate --plan <plan.json> map <archive-path>...
//!   site-relocate --plan <plan.json> rewrite <dir> [--scope <name>] [--dry-run]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use site_relocate::MigrationPlan;
use site_relocate::rewrite::{DEFAULT_FILES_SCOPE, RewriteConfig, rewrite_tree};

/// Flags that take a value.
const VALUE_FLAGS: &[&str] = &["--plan", "--scope"];

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(plan_path) = flag_value(&args, "--plan") else {
        bail!("missing --plan <plan.json>");
    };
    let plan = MigrationPlan::load(&PathBuf::from(plan_path))?;
    let scope = flag_value(&args, "--scope");
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let positional = positional_args(&args);
    let mut stdout = std::io::stdout().lock();

    match positional.split_first() {
        Some((&"pairs", [])) => {
            for pair in plan.registry().pairs_for(scope) {
                let line = serde_json::to_string(&pair).context("failed to serialize pair")?;
                writeln!(stdout, "{line}")?;
            }
        }
        Some((&"map", archive_paths)) if !archive_paths.is_empty() => {
            let mut mapper = plan.path_mapper()?;
            for path in archive_paths {
                let dest = mapper.dest_file_from_archive_name(path)?;
                writeln!(stdout, "{path}\t{dest}")?;
            }
        }
        Some((&"rewrite", [dir])) => {
            let config = RewriteConfig {
                root: PathBuf::from(*dir),
                scope: scope.unwrap_or(DEFAULT_FILES_SCOPE).to_owned(),
                include: plan.files.clone(),
                dry_run,
            };
            let report = rewrite_tree(&config, &plan.registry())?;
            for diff in &report.diffs {
                write!(stdout, "{diff}")?;
            }
            writeln!(
                stdout,
                "{} files scanned, {} changed, {} replacements",
                report.files_scanned, report.files_changed, report.replacements
            )?;
            if !report.aborted.is_empty() {
                let names: Vec<String> =
                    report.aborted.iter().map(|p| p.display().to_string()).collect();
                bail!("pattern matching aborted, left unchanged: {}", names.join(", "));
            }
        }
        _ => bail!("usage: site-relocate --plan <plan.json> (pairs | map <path>... | rewrite <dir>)"),
    }

    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .skip_while(|a| *a != flag)
        .nth(1)
        .map(String::as_str)
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut result = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            result.push(arg.as_str());
        }
    }
    result
}
