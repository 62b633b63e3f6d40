use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::{Builder, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use stillshot::{
    ExecutionMode, FfmpegLogLevel, FfmpegOpener, ImageFormat, JobOutcome, LabelStyle,
    ProgressEvent, ProgressObserver, SamplingJob, SamplingOptions, SamplingStrategy,
    YtDlpDownloader,
};

#[cfg(feature = "catalog")]
use stillshot::EagleCatalog;

const CLI_AFTER_HELP: &str = "Examples:\n  stillshot sample https://youtu.be/dQw4w9WgXcQ 30\n  stillshot sample https://youtu.be/dQw4w9WgXcQ 2.5 --strategy seek --parallel --progress\n  stillshot --json sample https://youtu.be/dQw4w9WgXcQ 10 --ext jpg\n  stillshot completions zsh > _stillshot";

#[derive(Debug, Parser)]
#[command(
    name = "stillshot",
    version,
    about = "Sample still frames from a video at fixed intervals",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while extracting.
    #[arg(long, global = true)]
    progress: bool,

    /// Print the job outcome as machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Args, Clone)]
struct JobArgs {
    /// Video URL.
    url: String,

    /// Seconds between sampled frames.
    interval: f64,

    /// Sampling strategy: scan (frame index) or seek (timestamp).
    #[arg(long, default_value = "scan")]
    strategy: String,

    /// Extract across a worker pool instead of serially.
    #[arg(long)]
    parallel: bool,

    /// Worker count for --parallel. Defaults to the number of CPUs.
    #[arg(long)]
    workers: Option<NonZeroUsize>,

    /// Output image extension (png, jpg, jpeg, bmp, tiff, webp).
    #[arg(long, default_value = "png")]
    ext: String,

    /// Label style: clock (00_01_30) or decimal (000090_0). Defaults per strategy.
    #[arg(long)]
    labels: Option<String>,

    /// Directory for downloads, frames, and archives.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample a video and zip the frames.
    #[command(
        about = "Sample frames into a zip archive",
        after_help = "Examples:\n  stillshot sample https://youtu.be/dQw4w9WgXcQ 30\n  stillshot sample https://youtu.be/dQw4w9WgXcQ 5 --work-dir out --ext jpg"
    )]
    Sample {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Sample a video into a new Eagle catalog folder.
    #[cfg(feature = "catalog")]
    #[command(
        about = "Sample frames into an Eagle folder",
        after_help = "Examples:\n  stillshot catalog https://youtu.be/dQw4w9WgXcQ 30\n  stillshot catalog https://youtu.be/dQw4w9WgXcQ 30 --eagle-url http://localhost:41595"
    )]
    Catalog {
        #[command(flatten)]
        job: JobArgs,

        /// Base URL of the Eagle API.
        #[arg(long, default_value = stillshot::DEFAULT_EAGLE_URL)]
        eagle_url: String,
    },

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "Examples:\n  stillshot completions bash > stillshot.bash\n  stillshot completions zsh > _stillshot"
    )]
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn parse_strategy(value: &str) -> Option<SamplingStrategy> {
    match value.to_ascii_lowercase().as_str() {
        "scan" | "sequential" | "sequential-scan" => Some(SamplingStrategy::SequentialScan),
        "seek" | "random" | "random-seek" => Some(SamplingStrategy::RandomSeek),
        _ => None,
    }
}

fn parse_label_style(value: &str) -> Option<LabelStyle> {
    match value.to_ascii_lowercase().as_str() {
        "clock" | "hms" => Some(LabelStyle::Clock),
        "decimal" | "seconds" => Some(LabelStyle::DecimalSeconds),
        _ => None,
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    } else {
        Builder::new()
            .target(Target::Stderr)
            .filter_level(LevelFilter::Warn)
            .filter_module("stillshot", level)
            .init();
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_length(event.total as u64);
        // Parallel workers may report out of order.
        if event.completed as u64 > self.bar.position() {
            self.bar.set_position(event.completed as u64);
        }
        if event.completed == event.total {
            self.bar.finish_with_message("done");
        }
    }
}

fn sampling_options(
    job: &JobArgs,
    global: &GlobalOptions,
) -> Result<SamplingOptions, Box<dyn std::error::Error>> {
    if !(job.interval > 0.0) {
        return Err(format!(
            "interval must be a positive number of seconds, got {}",
            job.interval
        )
        .into());
    }

    let strategy = parse_strategy(&job.strategy)
        .ok_or(format!("unsupported --strategy: {}", job.strategy))?;
    let image_format: ImageFormat = job.ext.parse()?;

    let mut options = SamplingOptions::new()
        .with_strategy(strategy)
        .with_image_format(image_format);

    if let Some(labels) = &job.labels {
        let style = parse_label_style(labels).ok_or(format!("unsupported --labels: {labels}"))?;
        options = options.with_label_style(style);
    }

    if job.parallel {
        options = options.with_execution_mode(ExecutionMode::Parallel);
        if let Some(workers) = job.workers {
            options = options.with_workers(workers);
        }
    } else if job.workers.is_some() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--workers has no effect without --parallel".yellow()
        );
    }

    if global.progress && !global.json {
        options = options.with_progress(Arc::new(TerminalProgress::new()?));
    }

    Ok(options)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logger(global.verbose);
    let level: FfmpegLogLevel = match &global.log_level {
        Some(level) => level.parse()?,
        None if global.verbose => FfmpegLogLevel::Warning,
        None => FfmpegLogLevel::Error,
    };
    stillshot::set_ffmpeg_log_level(level);
    Ok(())
}

type CliJob = SamplingJob<YtDlpDownloader, FfmpegOpener>;

fn job_for(job: &JobArgs, global: &GlobalOptions) -> Result<CliJob, Box<dyn std::error::Error>> {
    let options = sampling_options(job, global)?;
    Ok(SamplingJob::new(YtDlpDownloader::new(), FfmpegOpener, &job.work_dir)
        .with_options(options))
}

fn print_outcome(outcome: &JobOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let title = if outcome.media.info.title.is_empty() {
        &outcome.media.info.id
    } else {
        &outcome.media.info.title
    };
    println!("{} {}", "video".cyan().bold(), title);
    println!(
        "{} {:.1}s at {:.3} fps",
        "stream".cyan().bold(),
        outcome.stream_info.duration_seconds,
        outcome.stream_info.frame_rate
    );

    let summary = outcome.report.summary();
    if outcome.report.is_complete() {
        println!("{} {}", "done".green().bold(), summary);
    } else {
        println!("{} {}", "done".yellow().bold(), summary.yellow());
        for gap in &outcome.report.gaps {
            eprintln!("  {} {}: {}", "skipped".yellow(), gap.label, gap.error);
        }
    }

    println!("{} {}", "frames".cyan().bold(), outcome.output_dir.display());
    if let Some(archive) = &outcome.archive {
        println!("{} {}", "archive".cyan().bold(), archive.display());
    }
    if let Some(folder) = &outcome.catalog_folder {
        println!("{} {}", "folder".cyan().bold(), folder);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sample { job } => {
            apply_global_options(&cli.global)?;
            let sampling_job = job_for(&job, &cli.global)?;
            let outcome = sampling_job.archive(&job.url, job.interval)?;
            print_outcome(&outcome, cli.global.json)?;
        }
        #[cfg(feature = "catalog")]
        Commands::Catalog { job, eagle_url } => {
            apply_global_options(&cli.global)?;
            let catalog = EagleCatalog::with_base_url(eagle_url)?;
            let sampling_job = job_for(&job, &cli.global)?;
            let outcome = sampling_job.catalog(&job.url, job.interval, &catalog)?;
            print_outcome(&outcome, cli.global.json)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "stillshot", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
