//! Desktop player for a 24/7 video game music radio stream, with the
//! "now playing" line scraped from the station's website.

pub mod app;
pub mod config;
pub mod detail;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod page;
pub mod playback;
pub mod resolver;
pub mod sync;
