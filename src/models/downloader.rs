//! Model downloader.
//!
//! Downloads model files from Hugging Face if not present locally.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{AudioGenError, Result};

use super::loader::{missing_model_files, CONFIG_FILE, MODEL_URLS};

/// Downloads all required model files if not present.
///
/// Returns Ok(()) if all files exist or were successfully downloaded.
pub fn ensure_models(model_dir: &Path) -> Result<()> {
    if !model_dir.exists() {
        fs::create_dir_all(model_dir).map_err(|e| {
            AudioGenError::model_download_failed(format!(
                "Failed to create model directory {}: {}",
                model_dir.display(),
                e
            ))
        })?;
    }

    let missing = missing_model_files(model_dir);
    if missing.is_empty() {
        tracing::debug!(model_dir = %model_dir.display(), "all model files present");
        return Ok(());
    }

    tracing::info!(
        count = missing.len(),
        "downloading missing model files (this may take several minutes on first run)"
    );

    for file in &missing {
        let url = url_for(file).ok_or_else(|| {
            AudioGenError::model_download_failed(format!("No download URL for {}", file))
        })?;
        download_file_streaming(url, &model_dir.join(file))?;
    }

    let config_path = model_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        if let Some(url) = url_for(CONFIG_FILE) {
            // Config is optional; the loader falls back to defaults.
            if let Err(e) = download_file_streaming(url, &config_path) {
                tracing::warn!("skipping {}: {}", CONFIG_FILE, e);
            }
        }
    }

    tracing::info!("all models downloaded");
    Ok(())
}

fn url_for(file: &str) -> Option<&'static str> {
    MODEL_URLS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, url)| *url)
}

/// Downloads a file using streaming to handle large files.
///
/// Writes to a `.part` file first so an interrupted download never
/// leaves a truncated model behind.
fn download_file_streaming(url: &str, dest: &Path) -> Result<()> {
    let filename = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(file = %filename, "downloading");

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(3600))
        .build()
        .map_err(|e| {
            AudioGenError::model_download_failed(format!("Failed to create HTTP client: {}", e))
        })?;

    let mut response = client.get(url).send().map_err(|e| {
        AudioGenError::model_download_failed(format!("Failed to download {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(AudioGenError::model_download_failed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let partial = dest.with_extension("part");

    let mut file = fs::File::create(&partial).map_err(|e| {
        AudioGenError::model_download_failed(format!(
            "Failed to create file {}: {}",
            partial.display(),
            e
        ))
    })?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 65536];
    let mut last_progress = 0;

    loop {
        let bytes_read = response.read(&mut buffer).map_err(|e| {
            AudioGenError::model_download_failed(format!("Failed to read response: {}", e))
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).map_err(|e| {
            AudioGenError::model_download_failed(format!("Failed to write file: {}", e))
        })?;

        downloaded += bytes_read as u64;

        if total_size > 0 {
            let progress = (downloaded * 100 / total_size) as usize;
            if progress >= last_progress + 10 {
                tracing::debug!(file = %filename, "{}%", progress);
                last_progress = progress;
            }
        }
    }

    file.flush().map_err(|e| {
        AudioGenError::model_download_failed(format!("Failed to write file: {}", e))
    })?;
    drop(file);

    fs::rename(&partial, dest).map_err(|e| {
        AudioGenError::model_download_failed(format!(
            "Failed to move {} into place: {}",
            filename, e
        ))
    })?;

    let size_mb = downloaded as f64 / (1024.0 * 1024.0);
    tracing::info!(file = %filename, "done ({:.1} MB)", size_mb);

    Ok(())
}
