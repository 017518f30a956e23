//! audiogen-batch: text-to-audio generation for a batch of descriptions.
//!
//! Writes one WAV file per description into the output directory, named
//! after the description with whitespace runs replaced by underscores.

use std::time::Instant;

use audiogen_batch::audio::WavSink;
use audiogen_batch::cli::Cli;
use audiogen_batch::config::AppConfig;
use audiogen_batch::error::{AudioGenError, Result};
use audiogen_batch::generation::{generate_audio, ProgressReporter};
use audiogen_batch::logging;
use audiogen_batch::models::{check_models, ensure_models, load_sessions, OnnxGenerator, SessionOptions};

fn main() {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = AppConfig::from_env();
    cli.apply_to(&mut config);
    if let Some(reason) = config.validate() {
        return Err(AudioGenError::invalid_config(reason));
    }

    if let Ok(json) = serde_json::to_string(&config) {
        tracing::debug!(config = %json, "effective configuration");
    }

    let model_dir = config.effective_model_path();
    if config.allow_download {
        ensure_models(&model_dir)?;
    } else {
        check_models(&model_dir)?;
    }

    let options = SessionOptions::new(config.device, config.threads);
    let models = load_sessions(&model_dir, &options)?;
    let mut generator = OnnxGenerator::new(models, config.generation_params());
    tracing::info!(
        version = generator.version(),
        device = %config.device,
        duration = config.duration_sec,
        "generator ready"
    );

    let mut progress = ProgressReporter::stdout(Instant::now());
    let written = generate_audio(
        &mut generator,
        &WavSink,
        &config.write,
        &cli.descriptions,
        &cli.output,
        config.collision_policy,
        &mut progress,
    )?;

    tracing::info!(
        files = written.len(),
        output = %cli.output.display(),
        "done in {:.2}s",
        progress.elapsed_sec()
    );
    Ok(())
}
