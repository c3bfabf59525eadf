use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use gatecount::{GatedCounter, MemorySink, OutputSink, RunReport, StdoutSink, WorkerOutcome};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, RunArgs};
use config::Config;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatecount")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("gatecount.log");

    // Setup env_logger with file output so log lines never mix with the count
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    // --json keeps stdout for the report alone
    if cli.is_verbose() && !json_requested(cli) {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_run_command(&RunArgs::default(), config),
        Some(Commands::Run(args)) => handle_run_command(args, config),
        Some(Commands::Config) => handle_config_command(&config),
    }
}

fn json_requested(cli: &Cli) -> bool {
    matches!(&cli.command, Some(Commands::Run(args)) if args.json)
}

fn apply_overrides(args: &RunArgs, mut config: Config) -> Config {
    if let Some(n) = args.max_count {
        config.counter.max_count = n;
    }
    if let Some(ms) = args.pacing_ms {
        config.counter.pacing_delay_ms = ms;
    }
    if let Some(ms) = args.wait_timeout_ms {
        config.gate.wait_timeout_ms = Some(ms);
    }
    if args.hold_on_failure {
        config.gate.release_on_failure = false;
    }
    if args.no_color {
        config.output.color = false;
    }
    config
}

fn handle_run_command(args: &RunArgs, config: Config) -> Result<()> {
    let config = apply_overrides(args, config);
    let settings = config.counter_settings();
    info!("Running with settings: {:?}", settings);

    if !config.output.color {
        colored::control::set_override(false);
    }

    let sink: Arc<dyn OutputSink> = if args.json {
        Arc::new(MemorySink::new())
    } else {
        Arc::new(StdoutSink::new(config.output.color))
    };

    let counter = GatedCounter::new(settings, sink);

    if config.output.banner && !args.json {
        let max_count = counter.settings().max_count;
        println!("{}", "=== Gated Counter ===".bold());
        println!("count-up:   0 to {}", max_count);
        println!("count-down: {} to 0, once count-up opens the gate\n", max_count);
    }

    let report = counter.run().context("Counter run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
    } else {
        print_summary(&report);
    }

    if let Some(message) = strict_failure(&report).filter(|_| args.strict) {
        return Err(eyre!(message));
    }
    Ok(())
}

fn strict_failure(report: &RunReport) -> Option<String> {
    if report.is_success() {
        return None;
    }
    let message = match report.up.reason().or(report.down.reason()) {
        Some(reason) => format!("Run ended in phase {}: {}", report.phase, reason),
        None => format!("Run ended in phase {} without both workers completing", report.phase),
    };
    Some(message)
}

fn describe(outcome: &WorkerOutcome) -> ColoredString {
    match outcome {
        WorkerOutcome::Completed { steps } => format!("completed ({} steps)", steps).as_str().green(),
        WorkerOutcome::Failed { steps, reason } => format!("failed after {} steps: {}", steps, reason).as_str().red(),
        WorkerOutcome::Cancelled { steps } => format!("cancelled after {} steps", steps).as_str().yellow(),
        WorkerOutcome::Panicked { reason } => format!("panicked: {}", reason).as_str().red(),
    }
}

fn print_summary(report: &RunReport) {
    println!();
    if report.is_success() {
        println!("{} in {}ms", "=== Run completed ===".green().bold(), report.elapsed_ms());
    } else {
        println!("{} (phase: {})", "=== Run aborted ===".red().bold(), report.phase);
    }
    println!("  up:   {}", describe(&report.up));
    println!("  down: {}", describe(&report.down));
    println!("  max count: {}", report.max_count);
    println!("  values emitted: {}", report.up.steps() + report.down.steps());
}

fn handle_config_command(config: &Config) -> Result<()> {
    info!("Printing effective config");
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging before anything else can log
    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).context("Application failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gatecount::RunPhase;

    #[test]
    fn test_overrides_replace_config_values() {
        let args = RunArgs {
            max_count: Some(4),
            pacing_ms: Some(0),
            wait_timeout_ms: Some(90),
            hold_on_failure: true,
            no_color: true,
            ..RunArgs::default()
        };
        let config = apply_overrides(&args, Config::default());

        assert_eq!(config.counter.max_count, 4);
        assert_eq!(config.counter.pacing_delay_ms, 0);
        assert_eq!(config.gate.wait_timeout_ms, Some(90));
        assert!(!config.gate.release_on_failure);
        assert!(!config.output.color);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let config = apply_overrides(&RunArgs::default(), Config::default());
        assert_eq!(config.counter.max_count, 20);
        assert!(config.gate.release_on_failure);
        assert!(config.output.color);
    }

    #[test]
    fn test_json_run_suppresses_verbose_notice() {
        let cli = Cli::try_parse_from(["gatecount", "-v", "run", "--json"]).unwrap();
        assert!(cli.is_verbose());
        assert!(json_requested(&cli));

        let cli = Cli::try_parse_from(["gatecount", "-v", "run"]).unwrap();
        assert!(!json_requested(&cli));

        let cli = Cli::try_parse_from(["gatecount", "-v"]).unwrap();
        assert!(!json_requested(&cli));
    }

    fn report_with(up: WorkerOutcome, down: WorkerOutcome, phase: RunPhase) -> RunReport {
        let now = Utc::now();
        RunReport {
            max_count: 3,
            started_at: now,
            finished_at: now,
            up,
            down,
            phase,
            spurious_wakeups: 0,
        }
    }

    #[test]
    fn test_strict_failure_carries_worker_reason() {
        let report = report_with(
            WorkerOutcome::Failed {
                steps: 2,
                reason: "sink closed".to_string(),
            },
            WorkerOutcome::Failed {
                steps: 0,
                reason: "Gate abandoned: sink closed".to_string(),
            },
            RunPhase::Aborted,
        );
        assert_eq!(
            strict_failure(&report).unwrap(),
            "Run ended in phase aborted: sink closed"
        );

        let report = report_with(
            WorkerOutcome::Cancelled { steps: 1 },
            WorkerOutcome::Cancelled { steps: 0 },
            RunPhase::Aborted,
        );
        assert_eq!(
            strict_failure(&report).unwrap(),
            "Run ended in phase aborted without both workers completing"
        );
    }

    #[test]
    fn test_strict_failure_none_on_success() {
        let report = report_with(
            WorkerOutcome::Completed { steps: 4 },
            WorkerOutcome::Completed { steps: 4 },
            RunPhase::Done,
        );
        assert!(strict_failure(&report).is_none());
    }

    #[test]
    fn test_describe_outcomes() {
        colored::control::set_override(false);
        assert_eq!(
            describe(&WorkerOutcome::Completed { steps: 21 }).to_string(),
            "completed (21 steps)"
        );
        assert_eq!(
            describe(&WorkerOutcome::Cancelled { steps: 2 }).to_string(),
            "cancelled after 2 steps"
        );
    }
}
