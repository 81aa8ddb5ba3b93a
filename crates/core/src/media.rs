//! Audio probing, conversion and concatenation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tokio::{fs, process::Command};

use crate::{
    config::MediaBackend,
    error::{BookcastError, Result},
};

#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Convert `input` into the lesson's canonical WAV format at `output`.
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()>;

    /// Playback length of `path` in seconds.
    async fn duration(&self, path: &Path) -> Result<f64>;

    /// Join `segments` in order into `output`. A single segment is copied as-is.
    async fn concat(&self, segments: &[PathBuf], output: &Path) -> Result<()>;
}

pub fn media_tool(backend: MediaBackend) -> Box<dyn MediaTool> {
    match backend {
        MediaBackend::Ffmpeg => Box::new(Ffmpeg),
        MediaBackend::Wav => Box::new(WavTool),
    }
}

/// ffmpeg / ffprobe subprocesses.
pub struct Ffmpeg;

#[async_trait]
impl MediaTool for Ffmpeg {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()> {
        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-ar")
            .arg("44100")
            .arg("-ac")
            .arg("2")
            .arg(output)
            .output()
            .await?;

        if !result.status.success() {
            return Err(BookcastError::MediaToolFailed {
                tool: "ffmpeg",
                path: input.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }
        Ok(())
    }

    async fn duration(&self, path: &Path) -> Result<f64> {
        let result = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await?;

        if !result.status.success() {
            return Err(BookcastError::MediaToolFailed {
                tool: "ffprobe",
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&result.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| BookcastError::MediaToolFailed {
                tool: "ffprobe",
                path: path.to_path_buf(),
                reason: format!("unparseable duration {:?}: {e}", stdout.trim()),
            })
    }

    async fn concat(&self, segments: &[PathBuf], output: &Path) -> Result<()> {
        if let Some(single) = single_segment(segments, output)? {
            fs::copy(single, output).await?;
            return Ok(());
        }

        let list_file = output.with_extension("concat.txt");
        let listing = concat_listing(segments)?;
        fs::write(&list_file, listing).await?;

        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&list_file)
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg(output)
            .output()
            .await?;
        let _ = fs::remove_file(&list_file).await;

        if !result.status.success() {
            return Err(BookcastError::MediaToolFailed {
                tool: "ffmpeg",
                path: output.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }
        Ok(())
    }
}

/// Pure-Rust WAV handling for pipelines whose speech provider already emits WAV.
pub struct WavTool;

#[async_trait]
impl MediaTool for WavTool {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()> {
        // Validates the header; WAV input is passed through unchanged.
        WavReader::open(input).map_err(|e| BookcastError::MediaToolFailed {
            tool: "wav",
            path: input.to_path_buf(),
            reason: format!("not a readable WAV file: {e}"),
        })?;
        if input != output {
            fs::copy(input, output).await?;
        }
        Ok(())
    }

    async fn duration(&self, path: &Path) -> Result<f64> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        Ok(reader.duration() as f64 / spec.sample_rate as f64)
    }

    async fn concat(&self, segments: &[PathBuf], output: &Path) -> Result<()> {
        if let Some(single) = single_segment(segments, output)? {
            fs::copy(single, output).await?;
            return Ok(());
        }

        let spec = WavReader::open(&segments[0])?.spec();
        let mut writer = WavWriter::create(output, spec)?;
        for segment in segments {
            let reader = WavReader::open(segment)?;
            if reader.spec() != spec {
                return Err(BookcastError::MediaToolFailed {
                    tool: "wav",
                    path: segment.clone(),
                    reason: format!(
                        "format {:?} differs from first segment {:?}",
                        reader.spec(),
                        spec
                    ),
                });
            }
            copy_samples(reader, &mut writer, spec)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Concat-demuxer listing. ffmpeg resolves relative entries against the list file's
/// directory, so every entry is made absolute.
fn concat_listing(segments: &[PathBuf]) -> Result<String> {
    let mut listing = String::new();
    for segment in segments {
        let path = std::path::absolute(segment)?;
        let quoted = path.to_string_lossy().replace('\'', r"'\''");
        listing.push_str(&format!("file '{quoted}'\n"));
    }
    Ok(listing)
}

fn single_segment<'a>(segments: &'a [PathBuf], output: &Path) -> Result<Option<&'a Path>> {
    match segments {
        [] => Err(BookcastError::MediaToolFailed {
            tool: "concat",
            path: output.to_path_buf(),
            reason: "no audio segments provided".to_string(),
        }),
        [only] => Ok(Some(only.as_path())),
        _ => Ok(None),
    }
}

fn copy_samples<R, W>(reader: WavReader<R>, writer: &mut WavWriter<W>, spec: WavSpec) -> Result<()>
where
    R: std::io::Read,
    W: std::io::Write + std::io::Seek,
{
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => {
            for sample in reader.into_samples::<f32>() {
                writer.write_sample(sample?)?;
            }
        }
        (SampleFormat::Int, 8) => {
            for sample in reader.into_samples::<i8>() {
                writer.write_sample(sample?)?;
            }
        }
        (SampleFormat::Int, 16) => {
            for sample in reader.into_samples::<i16>() {
                writer.write_sample(sample?)?;
            }
        }
        (SampleFormat::Int, _) => {
            for sample in reader.into_samples::<i32>() {
                writer.write_sample(sample?)?;
            }
        }
    }
    Ok(())
}
