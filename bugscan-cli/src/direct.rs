use bugscan::config::DirectConfig;
use bugscan::direct::{DirectProbe, DirectResponse, GroupedReport};
use bugscan::scanner::{CompletedScan, Scanner};
use bugscan::targets::load_targets;
use color_eyre::eyre::{Result, WrapErr};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

fn print_header() {
    println!();
    print!("{}", format!("{:<15}  ", "IP").cyan());
    print!("{}", format!("{:<3}  ", "CODE").yellow());
    print!("{}", format!("{:<16}    ", "SERVER").magenta());
    println!("{}", format!("{:<20}", "HOST").green());
    println!(
        "{}",
        format!("{:<15}  {:<3}  {:<16}    {:<20}", "----", "----", "------", "----").white()
    );
}

/// Runs the direct scan mode over the domain list at `filename`.
pub async fn run(threads: usize, filename: &Path, config: DirectConfig) -> Result<()> {
    let targets = load_targets(filename)?;
    let probe = DirectProbe::new(&config)?;
    let scanner = Scanner::new(threads, probe)?;

    for target in targets {
        scanner.add(target.to_string(), target)?;
    }
    info!(
        jobs = scanner.total_jobs(),
        threads,
        servers = config.servers.len(),
        "starting direct scan"
    );

    print_header();

    let saved = scanner
        .run(|done| report(done, &config))
        .await
        .wrap_err("direct scan failed")??;

    if let Some(path) = saved {
        println!(
            "{}",
            format!("Results saved to {}", path.display()).green()
        );
    }
    Ok(())
}

/// Completion callback: prints the grouped summary and writes the results
/// file. Returns the path written, if any.
fn report(
    done: &CompletedScan<DirectResponse>,
    config: &DirectConfig,
) -> bugscan::Result<Option<PathBuf>> {
    let stats = done.stats();
    info!(
        successes = stats.successes,
        panicked = stats.panicked,
        peak_active = stats.peak_active,
        "direct scan finished"
    );

    if done.successes().is_empty() {
        return Ok(None);
    }

    let report = GroupedReport::from_responses(done.successes());
    for line in report.terminal_lines() {
        done.log(line);
    }

    match &config.output {
        Some(path) => {
            report.write(path, config.format)?;
            Ok(Some(path.clone()))
        }
        None => Ok(None),
    }
}
