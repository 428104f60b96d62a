//! Relight CLI
//!
//! Submits background replacement/relighting jobs to the Stability API,
//! polls for results, and saves the returned images. Also exposes the
//! synchronous remove-background endpoint.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::ProgressBar;
use relight::poller::{config::DEFAULT_MAX_ATTEMPTS, PollSession, PollerConfig};
use relight::stability::{
    AcceptMode, JobState, LightDirection, OutputFormat, RelightOptions, StabilityClient,
};
use relight::{artifacts, ApiConfig, SessionReport};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "relight")]
#[command(about = "Replace and relight image backgrounds via the Stability API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory result images are written to
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a background replacement job and print its id
    Submit {
        /// Subject image to process
        image: PathBuf,

        #[command(flatten)]
        options: RelightArgs,
    },

    /// Poll a submitted job until its result is ready, then save it
    Poll {
        /// Job id returned at submission
        job_id: String,

        /// Maximum number of poll attempts (default: 10)
        max_attempts: Option<u32>,

        /// Seconds between attempts (default: 10, the documented rate floor)
        interval: Option<u64>,

        /// Result encodings to accept
        #[arg(long, value_enum, default_value_t = AcceptMode::Either)]
        accept: AcceptMode,

        /// Extension for artifacts without a declared encoding
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        output_format: OutputFormat,
    },

    /// Submit a job and poll until it completes
    Run {
        /// Subject image to process
        image: PathBuf,

        #[command(flatten)]
        options: RelightArgs,

        /// Maximum number of poll attempts
        #[arg(long, default_value_t = 30)]
        max_attempts: u32,

        /// Seconds between attempts
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },

    /// Remove the background from an image (synchronous endpoint)
    RemoveBackground {
        /// Image to process
        image: PathBuf,

        /// Encoding of the produced image
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        output_format: OutputFormat,
    },
}

/// Options of the replace-background-and-relight endpoint
#[derive(Args)]
struct RelightArgs {
    /// Description of the desired background
    #[arg(short, long)]
    background_prompt: Option<String>,

    /// Description of the subject, to help segmentation
    #[arg(long)]
    foreground_prompt: Option<String>,

    /// What the result should not contain
    #[arg(long)]
    negative_prompt: Option<String>,

    /// How strongly the original subject is preserved, 0..=1
    #[arg(long)]
    preserve_original_subject: Option<f64>,

    /// Depth influence of the original background, 0..=1
    #[arg(long)]
    original_background_depth: Option<f64>,

    /// Keep the original background and only relight
    #[arg(long)]
    keep_original_background: bool,

    /// Where the light comes from
    #[arg(long, value_enum)]
    light_source_direction: Option<LightDirection>,

    /// Strength of the light source, 0..=1
    #[arg(long)]
    light_source_strength: Option<f64>,

    /// Deterministic seed (0 = service-chosen)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Encoding of the produced image
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    output_format: OutputFormat,
}

impl From<RelightArgs> for RelightOptions {
    fn from(args: RelightArgs) -> Self {
        RelightOptions {
            background_prompt: args.background_prompt,
            foreground_prompt: args.foreground_prompt,
            negative_prompt: args.negative_prompt,
            preserve_original_subject: args.preserve_original_subject,
            original_background_depth: args.original_background_depth,
            keep_original_background: args.keep_original_background,
            light_source_direction: args.light_source_direction,
            light_source_strength: args.light_source_strength,
            seed: args.seed,
            output_format: args.output_format,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load .env file if present
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Submit { image, options } => {
            let options = RelightOptions::from(options);
            let job_id = submit_job(&image, &options).await?;

            println!("{} Job submitted: {}", "✓".green(), job_id.bold());
            println!("\nTo fetch the result once it is ready:");
            println!("  relight poll {}", job_id);
        }

        Commands::Poll {
            job_id,
            max_attempts,
            interval,
            accept,
            output_format,
        } => {
            let config = PollerConfig::builder()
                .max_attempts(max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS))
                .interval_secs(interval.unwrap_or(10))
                .accept(accept)
                .output_dir(&cli.output_dir)
                .output_format(output_format)
                .build();

            let api = ApiConfig::from_env()?;
            let client = StabilityClient::new(&api);
            let report = poll_job(&client, &job_id, config).await?;
            report_outcome(&report);
        }

        Commands::Run {
            image,
            options,
            max_attempts,
            interval,
        } => {
            let output_format = options.output_format;
            let options = RelightOptions::from(options);
            let job_id = submit_job(&image, &options).await?;
            // Print the id before polling so an abandoned session stays
            // recoverable.
            println!("{} Job submitted: {}", "✓".green(), job_id.bold());

            let config = PollerConfig::builder()
                .max_attempts(max_attempts)
                .interval_secs(interval)
                .output_dir(&cli.output_dir)
                .output_format(output_format)
                .build();

            let api = ApiConfig::from_env()?;
            let client = StabilityClient::new(&api);
            let report = poll_job(&client, &job_id, config).await?;
            report_outcome(&report);
        }

        Commands::RemoveBackground {
            image,
            output_format,
        } => {
            let (bytes, file_name) = artifacts::read_subject_image(&image)?;
            let api = ApiConfig::from_env()?;
            let client = StabilityClient::new(&api);

            info!("Removing background from {}", image.display());
            let result = client
                .remove_background(bytes, &file_name, output_format)
                .await?;

            std::fs::create_dir_all(&cli.output_dir)?;
            let path = artifacts::remove_background_path(&cli.output_dir, &image, output_format);
            std::fs::write(&path, &result)?;
            println!(
                "{} Saved {} ({} bytes)",
                "✓".green(),
                path.display(),
                result.len()
            );
        }
    }

    Ok(())
}

/// Read and validate local input, then submit. Local validation runs before
/// the API configuration is even read, so bad input never needs a key.
async fn submit_job(image: &std::path::Path, options: &RelightOptions) -> Result<String> {
    let (bytes, file_name) = artifacts::read_subject_image(image)?;
    options.validate()?;

    let api = ApiConfig::from_env()?;
    let client = StabilityClient::new(&api);

    info!("Submitting {} ({} bytes)", image.display(), bytes.len());
    let job_id = client.submit_relight(bytes, &file_name, options).await?;
    Ok(job_id)
}

/// Run one polling session with a spinner and Ctrl+C wired to the session's
/// cancellation token.
async fn poll_job(
    client: &StabilityClient,
    job_id: &str,
    config: PollerConfig,
) -> Result<SessionReport> {
    let session = PollSession::new(client, config);

    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current attempt...");
            token.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Waiting for job {}...", job_id));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = session.run(job_id).await;
    spinner.finish_and_clear();

    Ok(result?)
}

fn report_outcome(report: &SessionReport) {
    match report.state {
        JobState::Completed => {
            println!(
                "{} Job {} completed after {} attempt(s)",
                "✓".green(),
                report.job_id,
                report.attempts.len()
            );
            if report.saved.is_empty() {
                println!("  The response contained no decodable artifacts.");
            }
            for path in &report.saved {
                println!("  saved {}", path.display());
            }
        }
        _ => {
            println!(
                "{} No result after {} attempt(s). The job may still complete server-side.",
                "!".yellow(),
                report.attempts.len()
            );
            println!("  Retry later with: relight poll {}", report.job_id);
        }
    }
}
