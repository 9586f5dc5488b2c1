//! redact - blur faces and watermark a video or still image
//!
//! Every frame of the output is processed: located faces are blurred and the
//! privacy banner is drawn whether or not any face was found. The output
//! keeps the input's geometry and frame rate and lands in the configured
//! output directory as `blurred_<name>`.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use urbansight::{FaceBlurPipeline, UrbansightConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video or image file.
    input: String,
    /// Treat the input as a still image regardless of extension.
    #[arg(long)]
    image: bool,
    /// Output directory (overrides configuration).
    #[arg(long, env = "URBANSIGHT_OUTPUT_DIR")]
    output_dir: Option<String>,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = UrbansightConfig::load()?;
    if let Some(dir) = args.output_dir {
        config.redaction.output_dir = dir;
    }
    let mut pipeline = FaceBlurPipeline::new(config.redaction);

    let input_path = Path::new(&args.input);
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("redacting {}", args.input));

    let output = if args.image || is_image_path(input_path) {
        pipeline.process_image(input_path)?
    } else {
        pipeline.process_video(&args.input)?
    };
    spinner.finish_and_clear();

    println!("{}", output.display());
    Ok(())
}
