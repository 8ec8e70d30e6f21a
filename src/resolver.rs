use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

use log::debug;

use crate::error::ResolutionError;

pub const STREAM_SOURCE_URL: &str = "https://www.youtube.com/watch?v=ZyAavTqsU6k";

pub trait StreamResolver: Send + Sync {
    fn resolve(&self, source_url: &str, video_enabled: bool) -> Result<String, ResolutionError>;
}

pub struct YtDlpResolver {
    program: PathBuf,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn format(video_enabled: bool) -> &'static str {
        if video_enabled {
            "best"
        } else {
            "bestaudio/best"
        }
    }
}

impl StreamResolver for YtDlpResolver {
    fn resolve(&self, source_url: &str, video_enabled: bool) -> Result<String, ResolutionError> {
        let format = Self::format(video_enabled);
        debug!("resolving {source_url} with format {format}");

        let output = Command::new(&self.program)
            .args(["--quiet", "--no-warnings", "--no-playlist", "-f", format, "-g"])
            .arg(source_url)
            .stdin(Stdio::null())
            .output()
            .map_err(ResolutionError::Spawn)?;

        if !output.status.success() {
            return Err(ResolutionError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        first_url(&String::from_utf8_lossy(&output.stdout)).ok_or(ResolutionError::NoUrl)
    }
}

fn first_url(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("http://") || line.starts_with("https://"))
        .map(str::to_string)
}
