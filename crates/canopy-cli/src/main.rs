//! Canopy CLI: generate a call graph of a Python, JavaScript, Ruby or PHP codebase.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use canopy_core::config::{parse_comma_list, AnalysisConfig};
use canopy_core::error::{CanopyError, Result};
use canopy_core::languages::Language;
use canopy_core::output::{call_graph, ensure_renderer, write_output};
use canopy_core::pipeline::{self, AnalysisResult};

#[derive(Parser)]
#[command(
    name = "canopy",
    version,
    about = "Canopy - Generate a call graph of a Python, JavaScript, Ruby or PHP codebase"
)]
struct Cli {
    /// Source files and/or directories to analyse
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Output file; its extension picks the format (dot, gv, json, png, svg)
    #[arg(short, long, default_value = "out.png")]
    output: PathBuf,

    /// Language to analyse (py, js, rb or php); detected from the sources when omitted
    #[arg(long, value_parser = parse_language)]
    language: Option<Language>,

    /// Comma-separated namespaces (files or classes) to leave out
    #[arg(long, default_value = "")]
    exclude_namespaces: String,

    /// Comma-separated function names to leave out
    #[arg(long, default_value = "")]
    exclude_functions: String,

    /// Do not draw file and class clusters
    #[arg(long)]
    no_grouping: bool,

    /// Keep functions that have no edges
    #[arg(long)]
    no_trimming: bool,

    /// Omit the legend from the rendered graph
    #[arg(long)]
    hide_legend: bool,

    /// Skip files that fail to parse instead of aborting
    #[arg(long)]
    skip_parse_errors: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Log debug detail and per-phase timings
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> AnalysisConfig {
        AnalysisConfig {
            sources: self.sources,
            output_path: self.output,
            language: self.language,
            exclude_namespaces: parse_comma_list(&self.exclude_namespaces),
            exclude_functions: parse_comma_list(&self.exclude_functions),
            no_grouping: self.no_grouping,
            no_trimming: self.no_trimming,
            hide_legend: self.hide_legend,
            skip_parse_errors: self.skip_parse_errors,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

fn parse_language(value: &str) -> std::result::Result<Language, String> {
    Language::from_flag(value)
        .ok_or_else(|| format!("unsupported language '{value}' (expected py, js, rb or php)"))
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "canopy: {}", record.args()))
        .init();
}

fn main() {
    let config = Cli::parse().into_config();
    init_logging(config.verbose, config.quiet);

    let start = Instant::now();
    let outcome = if config.quiet {
        run(&config, None)
    } else {
        run_with_progress(&config)
    };
    match outcome {
        Ok(result) => {
            if !config.quiet {
                print_summary(&config, &result, start);
            }
        }
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            std::process::exit(1);
        }
    }
}

fn run(
    config: &AnalysisConfig,
    progress: Option<pipeline::ProgressCallback>,
) -> Result<AnalysisResult> {
    if config.verbose && config.quiet {
        return Err(CanopyError::ConflictingVerbosity);
    }
    ensure_renderer(config.output_format()?)?;
    let result = pipeline::run_pipeline(config, progress)?;
    write_output(&result, config)?;
    Ok(result)
}

fn run_with_progress(config: &AnalysisConfig) -> Result<AnalysisResult> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let outcome = run(config, Some(progress));
    pb.finish_and_clear();
    outcome
}

fn print_summary(config: &AnalysisConfig, result: &AnalysisResult, start: Instant) {
    println!(
        "\n{}  Canopy call graph: {}",
        style("✓").green().bold(),
        style(result.language).bold()
    );
    println!("  {:<14} {}", "Files:", result.source_files.len());
    println!("  {:<14} {}", "Groups:", result.program.group_count());
    println!("  {:<14} {}", "Nodes:", result.program.node_count());
    let graph = call_graph(&result.program, &result.edges);
    println!("  {:<14} {}", "Edges:", graph.edge_count());
    if !result.ambiguous_calls.is_empty() {
        println!(
            "  {:<14} {}",
            "Ambiguous:",
            style(result.ambiguous_calls.len()).yellow()
        );
    }
    println!(
        "  {:<14} {:.1}ms",
        "Duration:",
        start.elapsed().as_secs_f64() * 1000.0
    );

    if config.verbose {
        println!("\n  Phase Timings:");
        let mut timings: Vec<_> = result.phase_timings.iter().collect();
        timings.sort_by(|a, b| b.1.total_cmp(a.1));
        for (phase, secs) in timings {
            println!("    {:<20} {:.1}ms", phase, secs * 1000.0);
        }
    }

    println!(
        "\n  {} {}",
        style("Output written to:").green(),
        config.output_path.display()
    );
}
