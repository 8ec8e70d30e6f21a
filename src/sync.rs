use std::{
    io,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{error::FetchError, page::NowPlayingFragment};

pub const POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const PLACEHOLDER_TRACK: &str = "VGM Radio Player…";
pub const FETCH_FAILED_TRACK: &str = "Track info could not be loaded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingSnapshot {
    pub track: String,
    pub game: String,
    pub requester: String,
}

impl Default for NowPlayingSnapshot {
    fn default() -> Self {
        Self {
            track: PLACEHOLDER_TRACK.to_string(),
            game: String::new(),
            requester: String::new(),
        }
    }
}

impl NowPlayingSnapshot {
    /// A failed fetch keeps the game; everything else is replaced.
    pub fn apply_fetch(&mut self, result: Result<NowPlayingFragment, FetchError>) {
        match result {
            Ok(fragment) => {
                self.track = fragment
                    .title
                    .map(|title| format!("♫ {title}"))
                    .unwrap_or_default();
                self.game = fragment.album.unwrap_or_default();
                self.requester = fragment.requester.unwrap_or_default();
            }
            Err(_) => {
                self.track = FETCH_FAILED_TRACK.to_string();
                self.requester.clear();
            }
        }
    }
}

pub enum SyncCommand {
    Refresh,
    Shutdown,
}

pub struct Synchronizer {
    command_tx: Option<Sender<SyncCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl Synchronizer {
    pub fn spawn<F>(
        mut fetch: F,
        interval: Duration,
    ) -> io::Result<(Self, Receiver<NowPlayingSnapshot>)>
    where
        F: FnMut() -> Result<NowPlayingFragment, FetchError> + Send + 'static,
    {
        let (snapshot_tx, snapshot_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("now-playing-sync".into())
            .spawn(move || {
                info!("now playing sync started");
                let mut snapshot = NowPlayingSnapshot::default();
                'poll: loop {
                    let result = fetch();
                    match &result {
                        Ok(fragment) => debug!("now playing: {fragment:?}"),
                        Err(err) => warn!("now playing fetch failed: {err}"),
                    }
                    snapshot.apply_fetch(result);

                    if snapshot_tx.send(snapshot.clone()).is_err() {
                        break;
                    }

                    // Refreshes queued during the fetch collapse into one poll.
                    let mut refresh = false;
                    loop {
                        match command_rx.try_recv() {
                            Ok(SyncCommand::Refresh) => refresh = true,
                            Ok(SyncCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                                break 'poll
                            }
                            Err(TryRecvError::Empty) => break,
                        }
                    }
                    if refresh {
                        continue;
                    }

                    match command_rx.recv_timeout(interval) {
                        Ok(SyncCommand::Refresh) | Err(RecvTimeoutError::Timeout) => continue,
                        Ok(SyncCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("now playing sync stopped");
            })?;

        Ok((
            Self {
                command_tx: Some(command_tx),
                handle: Some(handle),
            },
            snapshot_rx,
        ))
    }

    /// Ends the idle wait early. Several calls during one fetch yield one poll.
    pub fn refresh(&self) {
        if let Some(tx) = self.command_tx.as_ref() {
            let _ = tx.send(SyncCommand::Refresh);
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(SyncCommand::Shutdown);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("now playing sync thread panicked");
            }
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
