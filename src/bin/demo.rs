//! demo - seed the alert history with simulated live-monitoring alerts
//!
//! Draws alerts from a fixed catalogue of plausible incidents, marks them as
//! simulated, appends them to the history, and prints the resulting stats.
//! Useful for exercising dashboards and the storage layer without footage.

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use urbansight::storage::{AlertStore, InMemoryAlertStore, SqliteAlertStore};
use urbansight::{frame_timestamp, Alert, AlertType, Severity, UrbansightConfig};

const DEMO_FRAME_RATE: f64 = 25.0;
const DEMO_MAX_FRAME: u64 = 450;

const CATALOGUE: &[(AlertType, &str, Severity)] = &[
    (AlertType::Crowd, "Sudden crowd increase at entrance", Severity::Medium),
    (AlertType::Crowd, "High density in main lobby", Severity::High),
    (AlertType::Violence, "Suspicious movement detected", Severity::Medium),
    (AlertType::Object, "Unattended bag in corridor", Severity::Medium),
    (AlertType::Crowd, "Moderate crowd near elevator", Severity::Low),
    (AlertType::Violence, "Rapid movement in parking lot", Severity::High),
];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of simulated alerts to append.
    #[arg(long, default_value_t = 6)]
    count: usize,
    /// Deterministic seed for reproducible demo runs.
    #[arg(long)]
    seed: Option<u64>,
    /// Keep the alerts in memory and print them instead of persisting.
    #[arg(long)]
    ephemeral: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = UrbansightConfig::load()?;
    let mut store: Box<dyn AlertStore> = if args.ephemeral {
        Box::new(InMemoryAlertStore::new())
    } else {
        Box::new(SqliteAlertStore::open(&config.db_path)?)
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for _ in 0..args.count {
        let (alert_type, message, severity) = CATALOGUE
            .choose(&mut rng)
            .copied()
            .unwrap_or(CATALOGUE[0]);
        let frame = rng.gen_range(0..=DEMO_MAX_FRAME);
        let alert = Alert {
            alert_type,
            message: message.to_string(),
            severity,
            frame,
            timestamp_seconds: frame_timestamp(frame, DEMO_FRAME_RATE),
            video_id: Some("live_feed".to_string()),
            simulated: true,
        };
        let id = store.append(&alert)?;
        log::info!("seeded alert {id}: [{}] {}", severity.as_str(), alert.message);
    }

    let stats = store.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
