use std::{io, process::ExitStatus};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("could not run resolver: {0}")]
    Spawn(#[source] io::Error),

    #[error("resolver exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("resolver returned no URL")]
    NoUrl,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not start player: {0}")]
    Spawn(#[source] io::Error),

    #[error("no media opened")]
    NotOpened,

    #[error("player IPC failed: {0}")]
    Ipc(#[source] io::Error),

    #[error("could not encode player command: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
