use std::{
    io::Write,
    path::PathBuf,
    process::{Child, Command, Stdio},
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, info, warn};
use serde_json::json;

use crate::error::EngineError;

pub const MAX_VOLUME: u8 = 100;

/// Playback engine for one stream. Video on/off is fixed when the engine is
/// created; switching it means creating a new engine.
pub trait MediaEngine: Send {
    fn open(&mut self, url: &str) -> Result<(), EngineError>;
    fn play(&mut self) -> Result<(), EngineError>;
    fn stop(&mut self);
    /// No-op until `open` has succeeded.
    fn set_volume(&mut self, level: u8) -> Result<(), EngineError>;
}

pub trait EngineFactory: Send + Sync {
    fn create(&self, video_enabled: bool) -> Box<dyn MediaEngine>;
}

pub struct MpvFactory {
    program: PathBuf,
}

impl MpvFactory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for MpvFactory {
    fn default() -> Self {
        Self::new("mpv")
    }
}

impl EngineFactory for MpvFactory {
    fn create(&self, video_enabled: bool) -> Box<dyn MediaEngine> {
        Box::new(MpvEngine::new(self.program.clone(), video_enabled))
    }
}

static NEXT_IPC_ID: AtomicU64 = AtomicU64::new(1);

fn ipc_path() -> PathBuf {
    let id = NEXT_IPC_ID.fetch_add(1, Ordering::Relaxed);
    let name = format!("vgm-radio-mpv-{}-{id}", std::process::id());
    if cfg!(windows) {
        PathBuf::from(format!(r"\\.\pipe\{name}"))
    } else {
        std::env::temp_dir().join(format!("{name}.sock"))
    }
}

/// Drives an `mpv` child process. Volume changes while playing go through
/// mpv's JSON IPC server.
pub struct MpvEngine {
    program: PathBuf,
    video_enabled: bool,
    media: Option<String>,
    volume: u8,
    child: Option<Child>,
    ipc_path: PathBuf,
}

impl MpvEngine {
    pub fn new(program: PathBuf, video_enabled: bool) -> Self {
        Self {
            program,
            video_enabled,
            media: None,
            volume: 50,
            child: None,
            ipc_path: ipc_path(),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--no-terminal".to_string(),
            "--idle=no".to_string(),
            format!("--input-ipc-server={}", self.ipc_path.display()),
            format!("--volume={}", self.volume),
        ];
        if !self.video_enabled {
            args.push("--no-video".to_string());
        }
        args.push(url.to_string());
        args
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                info!("mpv exited with {status}");
                self.child = None;
                false
            }
            Some(Err(err)) => {
                warn!("could not poll mpv: {err}");
                false
            }
            None => false,
        }
    }

    fn send_command(&self, command: serde_json::Value) -> Result<(), EngineError> {
        let mut line = serde_json::to_vec(&command)?;
        line.push(b'\n');

        #[cfg(unix)]
        let mut pipe =
            std::os::unix::net::UnixStream::connect(&self.ipc_path).map_err(EngineError::Ipc)?;
        #[cfg(not(unix))]
        let mut pipe = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.ipc_path)
            .map_err(EngineError::Ipc)?;

        pipe.write_all(&line).map_err(EngineError::Ipc)
    }
}

impl MediaEngine for MpvEngine {
    fn open(&mut self, url: &str) -> Result<(), EngineError> {
        self.stop();
        self.media = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        let media = self.media.as_deref().ok_or(EngineError::NotOpened)?;
        let args = self.args(media);
        debug!("starting {} (video: {})", self.program.display(), self.video_enabled);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(EngineError::Spawn)?;
        info!("mpv started (pid {})", child.id());
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!("mpv kill: {err}");
            }
            let _ = child.wait();
            info!("mpv stopped");
        }
        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&self.ipc_path);
        }
    }

    fn set_volume(&mut self, level: u8) -> Result<(), EngineError> {
        if self.media.is_none() {
            return Ok(());
        }
        self.volume = level.min(MAX_VOLUME);
        if self.is_running() {
            self.send_command(json!({ "command": ["set_property", "volume", self.volume] }))?;
        }
        Ok(())
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_volume_before_open_is_ignored() {
        let mut engine = MpvEngine::new("mpv".into(), false);
        assert!(engine.set_volume(80).is_ok());
        assert_eq!(engine.volume, 50);
    }

    #[test]
    fn set_volume_after_open_is_stored_and_clamped() {
        let mut engine = MpvEngine::new("mpv".into(), false);
        engine.open("https://stream.example/audio").unwrap();
        engine.set_volume(140).unwrap();
        assert_eq!(engine.volume, MAX_VOLUME);
    }

    #[test]
    fn play_requires_open() {
        let mut engine = MpvEngine::new("mpv".into(), true);
        assert!(matches!(engine.play(), Err(EngineError::NotOpened)));
    }

    #[test]
    fn audio_only_engine_disables_video() {
        let audio = MpvEngine::new("mpv".into(), false);
        let args = audio.args("https://stream.example/a");
        assert!(args.contains(&"--no-video".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://stream.example/a"));

        let video = MpvEngine::new("mpv".into(), true);
        assert!(!video.args("https://stream.example/a").contains(&"--no-video".to_string()));
    }

    #[test]
    fn each_engine_gets_its_own_ipc_endpoint() {
        let a = MpvEngine::new("mpv".into(), false);
        let b = MpvEngine::new("mpv".into(), false);
        assert_ne!(a.ipc_path, b.ipc_path);
    }

    #[test]
    fn missing_player_is_a_spawn_error() {
        let mut engine = MpvEngine::new("definitely-not-a-real-mpv-binary".into(), false);
        engine.open("https://stream.example/a").unwrap();
        assert!(matches!(engine.play(), Err(EngineError::Spawn(_))));
    }
}
