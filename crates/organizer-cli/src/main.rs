mod commands;
mod logging;
mod progress;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, Target};
use dotenv::dotenv;
use organizer_core::dupes::DuplicateGroup;
use organizer_core::{
    advisor, OrganizeMode, OrganizeOptions, OrganizeReport, Organizer, OrganizerConfig,
};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let json = args.json;

    let _guard = logging::init_logger(logging::Console::for_output(json));

    let config = match organizer_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let outcome = match args.command {
        Some(Commands::Extension(target)) => {
            run_organize(&config, &target, OrganizeMode::Extension, None, json)
        }
        Some(Commands::Date { target, yes }) => {
            if target.recursive && !yes {
                let confirmed = prompt_confirm(
                    &format!(
                        "Recursive date organizing flattens every folder under {}. Continue?",
                        target.path.display()
                    ),
                    Some(false),
                )?;
                if !confirmed {
                    process::exit(0);
                }
            }
            run_organize(&config, &target, OrganizeMode::Date, None, json)
        }
        Some(Commands::Temp(target)) => {
            run_organize(&config, &target, OrganizeMode::Temp, None, json)
        }
        Some(Commands::Size { target, threshold }) => {
            let mut config = config;
            if threshold.is_some() {
                config.size_threshold = threshold;
            }
            run_organize(&config, &target, OrganizeMode::Size, None, json)
        }
        Some(Commands::Duplicate(target)) => {
            run_organize(&config, &target, OrganizeMode::Duplicate, None, json)
        }
        Some(Commands::Ai { target, actions }) => {
            let raw = read_actions(&actions)?;
            run_organize(&config, &target, OrganizeMode::Ai, Some(&raw), json)
        }
        Some(Commands::FindDuplicates(target)) => run_find_duplicates(&config, &target, json),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(true)
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(true)
        }
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

/// Returns whether the request succeeded.
fn run_organize(
    config: &OrganizerConfig,
    target: &Target,
    mode: OrganizeMode,
    raw_actions: Option<&[serde_json::Value]>,
    json: bool,
) -> Result<bool> {
    let organizer = Organizer::new(config.clone())?.with_reporter(CliReporter::new());
    let options = OrganizeOptions {
        recursive: target.recursive,
        size_threshold: config.size_threshold,
    };

    let result = organizer.organize(&target.path, mode, &options, raw_actions);

    if json {
        let envelope = OrganizeReport::envelope(&result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(all_succeeded(&result));
    }

    let ok = all_succeeded(&result);
    let report = result.with_context(|| {
        format!("Failed to organize {} by {}", target.path.display(), mode)
    })?;

    println!();
    info!(
        "Organized {} by {}: {}",
        target.path.display(),
        mode,
        report.summary
    );
    info!(
        "{} moved, {} failed, {} rejected",
        format!("{}", report.succeeded).green(),
        format!("{}", report.failed).red(),
        format!("{}", report.rejected).yellow(),
    );
    for failure in report.results.iter().filter(|r| !r.success) {
        warn!(
            "{} {}",
            failure.action,
            failure.error.as_deref().unwrap_or("failed")
        );
    }

    Ok(ok)
}

/// A call counts as successful only when every executed action succeeded.
fn all_succeeded(result: &organizer_core::error::Result<OrganizeReport>) -> bool {
    matches!(result, Ok(report) if report.failed == 0)
}

fn run_find_duplicates(config: &OrganizerConfig, target: &Target, json: bool) -> Result<bool> {
    let organizer = Organizer::new(config.clone())?.with_reporter(CliReporter::new());
    let groups = organizer
        .find_duplicates(&target.path, target.recursive)
        .with_context(|| format!("Failed to search {}", target.path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(true);
    }

    println!();
    for group in &groups {
        print_group(group);
    }

    let wasted: u64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();
    info!(
        "{} duplicate groups, {} bytes wasted",
        format!("{}", groups.len()).red(),
        format!("{}", wasted).red(),
    );
    Ok(true)
}

fn print_group(group: &DuplicateGroup) {
    println!(
        "{} ({} files, {} bytes each)",
        group.digest.get(..16).unwrap_or(&group.digest).cyan(),
        group.file_count(),
        group.size
    );
    println!("  {} {}", "keep".green(), group.original.path.display());
    for duplicate in &group.duplicates {
        println!("  {} {}", "dupe".red(), duplicate.path.display());
    }
}

fn read_actions(path: &Path) -> Result<Vec<serde_json::Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read action list {}", path.display()))?;
    let actions = advisor::extract_actions(&text)
        .with_context(|| format!("No action list in {}", path.display()))?;
    Ok(actions)
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => eprint!("{} (Y/n): ", prompt),
            Some(false) | None => eprint!("{} (y/N): ", prompt),
        }
        io::stderr().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use organizer_core::Error;

    fn report(succeeded: usize, failed: usize) -> OrganizeReport {
        OrganizeReport {
            mode: OrganizeMode::Ai,
            planned: succeeded + failed,
            succeeded,
            failed,
            rejected: 0,
            results: Vec::new(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_failed_actions_fail_the_run() {
        assert!(all_succeeded(&Ok(report(2, 0))));
        assert!(!all_succeeded(&Ok(report(0, 1))));
        assert!(!all_succeeded(&Err(Error::Validation("bad".to_string()))));
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::try_parse_from([
            "organizer",
            "ai",
            "docs",
            "--actions",
            "acts.json",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Ai { .. })));
    }
}
