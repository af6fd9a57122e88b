//! Video frame decoding via ffprobe and ffmpeg subprocesses

use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use tokio::process::Command;

use crate::config::MediaConfig;
use crate::error::{Error, Result};

/// Frame rate used when the container reports none
pub const FALLBACK_FPS: f64 = 30.0;

/// Stream properties needed for sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    /// Frames per second; 0 when unknown
    pub frame_rate: f64,
}

/// One decoded frame as an encoded image
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 0-based frame index in the source stream
    pub index: u64,
    /// PNG bytes
    pub image: Vec<u8>,
}

/// Trait for probing videos and pulling sampled frames
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    async fn probe(&self, video: &[u8]) -> Result<VideoInfo>;

    /// Every `step`-th frame, starting at frame 0
    async fn extract_frames(&self, video: &[u8], step: u64) -> Result<Vec<VideoFrame>>;

    fn name(&self) -> &str;
}

/// Frames between samples for a sampling interval in seconds of video time
pub fn frame_step(frame_rate: f64, interval_secs: f64) -> u64 {
    let fps = if frame_rate.is_finite() && frame_rate > 0.0 {
        frame_rate
    } else {
        FALLBACK_FPS
    };
    let step = (fps * interval_secs).round();
    if step.is_finite() && step >= 1.0 {
        step as u64
    } else {
        1
    }
}

/// Parse ffprobe rates such as `30000/1001` or `25`
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

fn frame_rate_from_probe(json: &[u8]) -> Result<f64> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;
    Ok(probe
        .streams
        .first()
        .and_then(|s| {
            s.avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
        })
        .unwrap_or(0.0))
}

/// Decoder shelling out to `ffprobe` and `ffmpeg`
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }
}

fn write_temp(video: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(video)?;
    file.flush()?;
    Ok(file)
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn probe(&self, video: &[u8]) -> Result<VideoInfo> {
        let input = write_temp(video)?;

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=r_frame_rate,avg_frame_rate", "-of", "json"])
            .arg(input.path())
            .output()
            .await
            .map_err(|e| Error::video(format!("failed to run {}: {}", self.ffprobe.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::video(format!("ffprobe error: {}", stderr.trim())));
        }

        Ok(VideoInfo {
            frame_rate: frame_rate_from_probe(&output.stdout)?,
        })
    }

    async fn extract_frames(&self, video: &[u8], step: u64) -> Result<Vec<VideoFrame>> {
        let step = step.max(1);
        let input = write_temp(video)?;
        let out_dir = tempfile::tempdir()?;
        let pattern = out_dir.path().join("frame_%06d.png");

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(input.path())
            .arg("-vf")
            .arg(format!("select=not(mod(n\\,{}))", step))
            .args(["-vsync", "0"])
            .arg(&pattern)
            .output()
            .await
            .map_err(|e| Error::video(format!("failed to run {}: {}", self.ffmpeg.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::video(format!("ffmpeg error: {}", stderr.trim())));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(out_dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        files.sort();

        let mut frames = Vec::with_capacity(files.len());
        for (k, path) in files.iter().enumerate() {
            frames.push(VideoFrame {
                index: k as u64 * step,
                image: tokio::fs::read(path).await?,
            });
        }

        tracing::debug!("Decoded {} frames (every {} frames)", frames.len(), step);
        Ok(frames)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
