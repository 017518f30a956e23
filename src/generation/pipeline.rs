//! Prompt-to-file pipeline.
//!
//! Plans output names, calls the generator once for the whole batch, then
//! writes each buffer in prompt order.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::audio::{AudioBuffer, AudioSink, WriteOptions};
use crate::error::{AudioGenError, Result};
use crate::naming::{plan_output_paths, CollisionPolicy};

use super::progress::ProgressReporter;
use super::{AudioGenerator, GeneratedAudio, GenerationRequest};

/// A file produced by [`generate_audio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    /// Prompt the audio was generated from.
    pub prompt: String,
    /// Where the audio was written.
    pub path: PathBuf,
}

/// Generates one audio file per prompt in `output_dir`.
///
/// Steps:
/// 1. Plan every output path (fails on invalid prompts or, depending on
///    `collision_policy`, on colliding names) before touching the disk.
/// 2. Create `output_dir` and any missing parents.
/// 3. Call `generator` once with all prompts.
/// 4. Write each buffer through `sink`, in prompt order, reporting progress.
///
/// Errors are returned as soon as they happen. Files written before a
/// failure are left in place.
///
/// # Example
///
/// ```ignore
/// use std::time::Instant;
/// use audiogen_batch::audio::{WavSink, WriteOptions};
/// use audiogen_batch::generation::{generate_audio, ProgressReporter};
/// use audiogen_batch::naming::CollisionPolicy;
///
/// let mut progress = ProgressReporter::stdout(Instant::now());
/// let written = generate_audio(
///     &mut generator,
///     &WavSink,
///     &WriteOptions::default(),
///     &["dog barking", "sirens of an emergency vehicle"],
///     Path::new("out"),
///     CollisionPolicy::Fail,
///     &mut progress,
/// )?;
/// ```
#[allow(clippy::too_many_arguments)]
pub fn generate_audio<G, S, P, W>(
    generator: &mut G,
    sink: &S,
    write_options: &WriteOptions,
    descriptions: &[P],
    output_dir: &Path,
    collision_policy: CollisionPolicy,
    progress: &mut ProgressReporter<W>,
) -> Result<Vec<WrittenFile>>
where
    G: AudioGenerator + ?Sized,
    S: AudioSink + ?Sized,
    P: AsRef<str>,
    W: Write,
{
    let paths = plan_output_paths(descriptions, output_dir, sink.extension(), collision_policy)?;

    std::fs::create_dir_all(output_dir)
        .map_err(|e| AudioGenError::io("create directory", output_dir, e))?;

    let requests: Vec<GenerationRequest> = descriptions
        .iter()
        .enumerate()
        .map(|(id, prompt)| GenerationRequest {
            id,
            prompt: prompt.as_ref().to_string(),
        })
        .collect();

    tracing::info!(
        prompts = requests.len(),
        sample_rate = generator.sample_rate(),
        "generating audio"
    );
    let generated = generator.generate(&requests)?;
    let buffers = match_results(requests.len(), generated)?;

    let mut written = Vec::with_capacity(requests.len());
    for ((request, audio), path) in requests.into_iter().zip(buffers).zip(paths) {
        tracing::debug!(
            id = request.id,
            seconds = audio.duration_sec(),
            path = %path.display(),
            "writing audio"
        );
        sink.write(&path, audio, write_options)?;
        progress.file_written(&path);
        written.push(WrittenFile {
            prompt: request.prompt,
            path,
        });
    }

    Ok(written)
}

/// Orders generator results by request id.
///
/// Every id in `0..expected` must appear exactly once.
fn match_results(expected: usize, generated: Vec<GeneratedAudio>) -> Result<Vec<AudioBuffer>> {
    if generated.len() != expected {
        return Err(AudioGenError::generation_failed(format!(
            "expected {} audio buffers, got {}",
            expected,
            generated.len()
        )));
    }

    let mut by_id: HashMap<usize, AudioBuffer> = HashMap::with_capacity(expected);
    for item in generated {
        if item.request_id >= expected {
            return Err(AudioGenError::generation_failed(format!(
                "result for unknown request id {}",
                item.request_id
            )));
        }
        if by_id.insert(item.request_id, item.audio).is_some() {
            return Err(AudioGenError::generation_failed(format!(
                "duplicate result for request id {}",
                item.request_id
            )));
        }
    }

    (0..expected)
        .map(|id| {
            by_id.remove(&id).ok_or_else(|| {
                AudioGenError::generation_failed(format!("no result for request id {}", id))
            })
        })
        .collect()
}
