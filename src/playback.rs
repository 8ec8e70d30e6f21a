use log::{info, warn};

use crate::{
    engine::{EngineFactory, MediaEngine, MAX_VOLUME},
    error::{EngineError, PlaybackError},
    resolver::StreamResolver,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub id: u64,
    pub source_url: String,
    pub video_enabled: bool,
    pub volume: u8,
}

pub enum PlaybackState {
    Stopped,
    Starting { id: u64 },
    Playing { engine: Box<dyn MediaEngine> },
}

/// Resolves the stream and starts a new engine. Blocking; run it off the UI
/// thread.
pub fn start_playback(
    resolver: &dyn StreamResolver,
    engines: &dyn EngineFactory,
    request: &StartRequest,
) -> Result<Box<dyn MediaEngine>, PlaybackError> {
    let url = resolver.resolve(&request.source_url, request.video_enabled)?;
    let mut engine = engines.create(request.video_enabled);
    engine.open(&url)?;
    engine.set_volume(request.volume)?;
    engine.play()?;
    Ok(engine)
}

/// Owns the play/stop state. Every start produces a brand-new engine; a
/// running engine is never reconfigured in place.
pub struct PlaybackController {
    state: PlaybackState,
    source_url: String,
    volume: u8,
    video_enabled: bool,
    next_request_id: u64,
}

impl PlaybackController {
    pub fn new(source_url: impl Into<String>, volume: u8, video_enabled: bool) -> Self {
        Self {
            state: PlaybackState::Stopped,
            source_url: source_url.into(),
            volume: volume.min(MAX_VOLUME),
            video_enabled,
            next_request_id: 1,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn is_starting(&self) -> bool {
        matches!(self.state, PlaybackState::Starting { .. })
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn button_label(&self) -> &'static str {
        match self.state {
            PlaybackState::Stopped => "▶ Play",
            PlaybackState::Starting { .. } => "⏳ Starting…",
            PlaybackState::Playing { .. } => "⏸ Pause",
        }
    }

    pub fn toggle(&mut self) -> Option<StartRequest> {
        match std::mem::replace(&mut self.state, PlaybackState::Stopped) {
            PlaybackState::Stopped => {
                let id = self.next_request_id;
                self.next_request_id += 1;
                self.state = PlaybackState::Starting { id };
                Some(StartRequest {
                    id,
                    source_url: self.source_url.clone(),
                    video_enabled: self.video_enabled,
                    volume: self.volume,
                })
            }
            PlaybackState::Starting { id } => {
                info!("start request {id} cancelled");
                None
            }
            PlaybackState::Playing { mut engine } => {
                engine.stop();
                info!("playback stopped");
                None
            }
        }
    }

    /// Takes the outcome of a [`StartRequest`]. Results for requests that are
    /// no longer pending are stopped and dropped.
    pub fn finish_start(
        &mut self,
        id: u64,
        result: Result<Box<dyn MediaEngine>, PlaybackError>,
    ) -> Result<(), PlaybackError> {
        let pending = matches!(self.state, PlaybackState::Starting { id: current } if current == id);
        if !pending {
            if let Ok(mut engine) = result {
                engine.stop();
            }
            return Ok(());
        }

        match result {
            Ok(mut engine) => {
                if let Err(err) = engine.set_volume(self.volume) {
                    warn!("could not apply volume: {err}");
                }
                info!("playback started");
                self.state = PlaybackState::Playing { engine };
                Ok(())
            }
            Err(err) => {
                self.state = PlaybackState::Stopped;
                Err(err)
            }
        }
    }

    pub fn set_volume(&mut self, level: u8) -> Result<(), EngineError> {
        self.volume = level.min(MAX_VOLUME);
        match &mut self.state {
            PlaybackState::Playing { engine } => engine.set_volume(self.volume),
            _ => Ok(()),
        }
    }

    pub fn set_video_enabled(&mut self, enabled: bool) {
        self.video_enabled = enabled;
    }

    pub fn shutdown(&mut self) {
        if let PlaybackState::Playing { mut engine } =
            std::mem::replace(&mut self.state, PlaybackState::Stopped)
        {
            engine.stop();
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{testing::*, *};

    fn calls(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn start_playback_runs_resolve_open_volume_play() {
        let log = CallLog::default();
        let resolver = FakeResolver {
            url: Some("https://cdn.example/audio".into()),
        };
        let factory = FakeFactory { log: log.clone() };
        let request = StartRequest {
            id: 1,
            source_url: "https://stream.example".into(),
            video_enabled: false,
            volume: 42,
        };

        start_playback(&resolver, &factory, &request).unwrap();
        assert_eq!(
            calls(&log),
            vec![
                "create video=false",
                "open https://cdn.example/audio",
                "volume 42",
                "play video=false"
            ]
        );
    }

    #[test]
    fn resolution_failure_never_creates_an_engine() {
        let log = CallLog::default();
        let factory = FakeFactory { log: log.clone() };
        let mut controller = PlaybackController::new("https://stream.example", 50, false);

        let request = controller.toggle().unwrap();
        let result = start_playback(&FakeResolver { url: None }, &factory, &request);
        let err = controller.finish_start(request.id, result).unwrap_err();

        assert!(matches!(err, PlaybackError::Resolution(_)));
        assert!(matches!(controller.state(), PlaybackState::Stopped));
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn toggle_cycles_stopped_starting_playing_stopped() {
        let log = CallLog::default();
        let factory = FakeFactory { log: log.clone() };
        let resolver = FakeResolver {
            url: Some("https://cdn.example/audio".into()),
        };
        let mut controller = PlaybackController::new("https://stream.example", 50, false);
        assert_eq!(controller.button_label(), "▶ Play");

        let request = controller.toggle().unwrap();
        assert!(controller.is_starting());

        let result = start_playback(&resolver, &factory, &request);
        controller.finish_start(request.id, result).unwrap();
        assert!(controller.is_playing());
        assert_eq!(controller.button_label(), "⏸ Pause");

        assert!(controller.toggle().is_none());
        assert!(matches!(controller.state(), PlaybackState::Stopped));
        assert_eq!(calls(&log).last().map(String::as_str), Some("stop"));
    }

    #[test]
    fn cancelled_start_discards_late_engine() {
        let log = CallLog::default();
        let factory = FakeFactory { log: log.clone() };
        let resolver = FakeResolver {
            url: Some("https://cdn.example/audio".into()),
        };
        let mut controller = PlaybackController::new("https://stream.example", 50, false);

        let request = controller.toggle().unwrap();
        assert!(controller.toggle().is_none());

        let result = start_playback(&resolver, &factory, &request);
        controller.finish_start(request.id, result).unwrap();
        assert!(matches!(controller.state(), PlaybackState::Stopped));
        assert_eq!(calls(&log).last().map(String::as_str), Some("stop"));
    }

    #[test]
    fn video_flag_applies_to_the_next_engine_only() {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let factory = FakeFactory { log: log.clone() };
        let resolver = FakeResolver {
            url: Some("https://cdn.example/av".into()),
        };
        let mut controller = PlaybackController::new("https://stream.example", 50, false);

        let request = controller.toggle().unwrap();
        let result = start_playback(&resolver, &factory, &request);
        controller.finish_start(request.id, result).unwrap();

        controller.set_video_enabled(true);
        assert!(!calls(&log).iter().any(|c| c == "create video=true"));

        controller.toggle();
        let request = controller.toggle().unwrap();
        assert!(request.video_enabled);
        let result = start_playback(&resolver, &factory, &request);
        controller.finish_start(request.id, result).unwrap();
        assert!(calls(&log).iter().any(|c| c == "play video=true"));
    }

    #[test]
    fn volume_reaches_running_engine() {
        let log = CallLog::default();
        let factory = FakeFactory { log: log.clone() };
        let resolver = FakeResolver {
            url: Some("https://cdn.example/audio".into()),
        };
        let mut controller = PlaybackController::new("https://stream.example", 50, false);
        controller.set_volume(20).unwrap();
        assert!(calls(&log).is_empty());

        let request = controller.toggle().unwrap();
        controller.set_volume(30).unwrap();
        let result = start_playback(&resolver, &factory, &request);
        controller.finish_start(request.id, result).unwrap();
        assert_eq!(calls(&log).last().map(String::as_str), Some("volume 30"));

        controller.set_volume(250).unwrap();
        assert_eq!(controller.volume(), MAX_VOLUME);
        assert_eq!(calls(&log).last().map(String::as_str), Some("volume 100"));
    }
}
