mod reports;
mod runner;
mod scenarios;
mod soak;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;
use woundwatch_core::Settings;

use runner::{ScenarioResult, ScenarioRunner};
use scenarios::{all_keys, get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "woundwatch-tester", version = "0.1.0")]
#[command(about = "Scenario and soak checks for the woundwatch infection and immunity caches")]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Score the creature's current room instead of the tend room
    #[arg(long)]
    use_current_room: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    const fn settings(&self) -> Settings {
        Settings {
            use_current_room_for_infection: self.use_current_room,
            sweep_when_panel_hidden: false,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    validate_args(&args)?;
    announce_banner();

    let start_time = Instant::now();
    let seeds = parse_seeds(&args.seeds)?;
    let keys = expand_scenarios(&args.scenarios)?;
    let runner = ScenarioRunner::new(args.settings(), args.verbose);

    let mut results = Vec::new();
    for key in &keys {
        let Some(scenario) = get_scenario(key) else {
            bail!("unknown scenario '{key}' (see --list-scenarios)");
        };
        results.extend(runner.run_scenario(&scenario, &seeds, args.iterations));
    }

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn validate_args(args: &Args) -> Result<()> {
    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🩹 Woundwatch Tester".bright_cyan().bold());
    println!("{}", "====================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Result<Vec<String>> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in all_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    if scenarios.is_empty() {
        bail!("no scenarios selected");
    }
    Ok(scenarios)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, results)?,
        _ => reports::generate_console_report(
            &mut output_target,
            results,
            start_time.elapsed(),
        )?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
