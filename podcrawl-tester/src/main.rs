mod logic;
mod util;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use podcrawl_game::{GameEngine, preview_scaling};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{FileConfigLoader, RunRecord, Strategy, StrategySummary, reports, run_matrix, summarize};
use util::{parse_seeds, split_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "podcrawl-tester", version = "0.1.0")]
#[command(about = "Automated balance and QA runs for the Podcrawl rules engine")]
struct Args {
    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Strategies to run (comma-separated: cautious, greedy, random, or all)
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Runs per seed; each iteration uses the next consecutive seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Stop a run after this many encounters even if the player survives
    #[arg(long, default_value_t = 100)]
    max_depth: u32,

    /// Print the threshold/reward table up to this depth and exit
    #[arg(long)]
    preview: Option<u32>,

    /// Engine configuration JSON (defaults to the built-in tuning)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let engine = GameEngine::new(FileConfigLoader::new(args.config.clone()));
    let config = engine.load_config().context("loading engine configuration")?;

    if let Some(depth) = args.preview {
        let mut output_target = OutputTarget::new(args.output.clone())?;
        reports::generate_scaling_preview(
            output_target.writer(),
            preview_scaling(depth, &config.scaling),
        )?;
        output_target.flush_inner()?;
        return Ok(());
    }

    let seeds = parse_seeds(&args.seeds)?;
    let strategies = parse_strategies(&args.strategies)?;
    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }

    let start_time = Instant::now();
    let records = run_matrix(&config, &seeds, &strategies, args.iterations, args.max_depth)?;
    let summaries = summarize(&records);
    write_reports(&args, &records, &summaries, start_time)
}

fn announce_banner() {
    println!("{}", "🎮 Podcrawl Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn parse_strategies(arg: &str) -> Result<Vec<Strategy>> {
    let tokens = split_csv(arg);
    if tokens.is_empty() {
        bail!("no strategies requested");
    }
    if tokens.iter().any(|token| token.eq_ignore_ascii_case("all")) {
        return Ok(Strategy::ALL.to_vec());
    }
    let mut strategies = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let strategy: Strategy = token.parse()?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    Ok(strategies)
}

fn write_reports(
    args: &Args,
    records: &[RunRecord],
    summaries: &[StrategySummary],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => {
            reports::generate_json_report(&mut output_target, records, summaries)?;
        }
        ReportFormat::Markdown => {
            reports::generate_markdown_report(&mut output_target, records, summaries)?;
        }
        ReportFormat::Console => {
            if records.is_empty() {
                writeln!(&mut output_target, "No runs executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    records,
                    summaries,
                    start_time.elapsed(),
                )?;
            }
        }
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
