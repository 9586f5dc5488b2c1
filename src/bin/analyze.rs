//! analyze - run the UrbanSight pipeline over one video
//!
//! Opens the input, samples frames, detects people, evaluates alerts, appends
//! them to the alert history, and prints the analysis result as JSON on
//! stdout. With `--privacy` a redacted copy of the input is also written;
//! redaction failure downgrades to a warning, the analysis result stands.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use urbansight::storage::{AlertStore, InMemoryAlertStore, SqliteAlertStore};
use urbansight::{FaceBlurPipeline, UrbansightConfig, VideoAnalyzer};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video to analyze: a file path, or a stub:// synthetic source.
    input: String,
    /// Tag stored alerts with this video id.
    #[arg(long)]
    video_id: Option<String>,
    /// Also write a redacted (blurred + watermarked) copy of the input.
    #[arg(long)]
    privacy: bool,
    /// Keep the alert history in memory instead of the SQLite database.
    #[arg(long)]
    ephemeral: bool,
    /// Alert history database path (overrides configuration).
    #[arg(long, env = "URBANSIGHT_DB_PATH")]
    db: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = UrbansightConfig::load()?;
    let analyzer = VideoAnalyzer::from_config(&config)?;

    let db_path = args.db.as_deref().unwrap_or(&config.db_path);
    let mut store: Box<dyn AlertStore> = if args.ephemeral {
        Box::new(InMemoryAlertStore::new())
    } else {
        Box::new(SqliteAlertStore::open(db_path)?)
    };

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("analyzing {}", args.input));

    let mut result = analyzer.analyze(&args.input)?;
    spinner.finish_and_clear();

    for alert in &mut result.alerts {
        alert.video_id = args.video_id.clone();
        store.append(alert)?;
    }
    log::info!(
        "{} alert(s) appended, history now holds {}",
        result.alerts.len(),
        store.count()?
    );

    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.privacy {
        let mut pipeline = FaceBlurPipeline::new(config.redaction.clone());
        match pipeline.process_video(&args.input) {
            Ok(path) => log::info!("redacted copy written to {}", path.display()),
            Err(e) => log::warn!("redacted copy not written: {e:#}"),
        }
    }

    Ok(())
}
