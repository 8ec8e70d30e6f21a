use std::{
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use eframe::egui::{self, RichText, ViewportCommand, WindowLevel};
use log::{info, warn};

use crate::{
    config::Config,
    detail::{format_entry, history_heading, load_detail, queue_heading, DetailView},
    engine::{EngineFactory, MediaEngine, MpvFactory, MAX_VOLUME},
    error::{EngineError, PlaybackError},
    fetch::{DynFetcher, HttpPageSource, MetadataFetcher},
    page::{SelectorPageParser, SongEntry},
    playback::{start_playback, PlaybackController, StartRequest},
    resolver::{StreamResolver, YtDlpResolver, STREAM_SOURCE_URL},
    sync::{NowPlayingSnapshot, Synchronizer, POLL_INTERVAL},
};

pub const APP_TITLE: &str = "VGM Radio Player";

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);
const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(240, 200, 80);

pub struct Services {
    pub fetcher: Arc<DynFetcher>,
    pub resolver: Arc<dyn StreamResolver>,
    pub engines: Arc<dyn EngineFactory>,
    pub poll_interval: Duration,
}

impl Services {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = HttpPageSource::metadata_page().context("Failed to build HTTP client")?;
        Ok(Self {
            fetcher: Arc::new(MetadataFetcher::new(
                Box::new(source),
                Box::new(SelectorPageParser::new()),
            )),
            resolver: Arc::new(YtDlpResolver::new(config.player.ytdlp_path.clone())),
            engines: Arc::new(MpvFactory::new(config.player.mpv_path.clone())),
            poll_interval: POLL_INTERVAL,
        })
    }
}

struct StartMessage {
    request_id: u64,
    result: Result<Box<dyn MediaEngine>, PlaybackError>,
}

struct DetailMessage {
    request_id: u64,
    view: DetailView,
}

pub struct App {
    now: NowPlayingSnapshot,
    playback_err: Option<String>,
    synchronizer: Option<Synchronizer>,
    snapshot_rx: Option<Receiver<NowPlayingSnapshot>>,
    playback: PlaybackController,
    start_tx: Sender<StartMessage>,
    start_rx: Receiver<StartMessage>,
    detail_open: bool,
    detail: Option<DetailView>,
    detail_tx: Sender<DetailMessage>,
    detail_rx: Receiver<DetailMessage>,
    detail_inflight: Option<u64>,
    next_detail_request_id: u64,
    services: Services,
    always_on_top: bool,
    last_window_level: Option<WindowLevel>,
}

impl App {
    pub fn new(config: Config, services: Services) -> anyhow::Result<Self> {
        let fetcher = services.fetcher.clone();
        let (synchronizer, snapshot_rx) =
            Synchronizer::spawn(move || fetcher.fetch_now_playing(), services.poll_interval)
                .context("Failed to start now playing sync")?;

        let (start_tx, start_rx) = mpsc::channel();
        let (detail_tx, detail_rx) = mpsc::channel();

        Ok(Self {
            now: NowPlayingSnapshot::default(),
            playback_err: None,
            synchronizer: Some(synchronizer),
            snapshot_rx: Some(snapshot_rx),
            playback: PlaybackController::new(
                STREAM_SOURCE_URL,
                config.player.initial_volume,
                config.player.video_enabled,
            ),
            start_tx,
            start_rx,
            detail_open: false,
            detail: None,
            detail_tx,
            detail_rx,
            detail_inflight: None,
            next_detail_request_id: 1,
            services,
            always_on_top: config.ui.always_on_top,
            last_window_level: None,
        })
    }

    fn drain_channels(&mut self) {
        let mut snapshots = Vec::new();
        if let Some(rx) = self.snapshot_rx.as_ref() {
            loop {
                match rx.try_recv() {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warn!("now playing sync is gone");
                        self.snapshot_rx = None;
                        break;
                    }
                }
            }
        }
        if let Some(latest) = snapshots.pop() {
            self.now = latest;
        }

        while let Ok(message) = self.start_rx.try_recv() {
            if let Err(err) = self.playback.finish_start(message.request_id, message.result) {
                warn!("playback start failed: {err}");
                self.playback_err = Some(playback_error_text(&err));
            }
        }

        while let Ok(message) = self.detail_rx.try_recv() {
            if self.detail_inflight == Some(message.request_id) {
                self.detail_inflight = None;
                self.detail = Some(message.view);
            }
        }
    }

    fn toggle_play(&mut self) {
        self.playback_err = None;
        let Some(request) = self.playback.toggle() else {
            return;
        };
        let request_id = request.id;
        if let Err(err) = self.spawn_start(request) {
            warn!("could not spawn start worker: {err}");
            let failed = Err(PlaybackError::Engine(EngineError::Spawn(err)));
            if let Err(err) = self.playback.finish_start(request_id, failed) {
                self.playback_err = Some(playback_error_text(&err));
            }
        }
    }

    fn spawn_start(&self, request: StartRequest) -> std::io::Result<()> {
        let resolver = self.services.resolver.clone();
        let engines = self.services.engines.clone();
        let tx = self.start_tx.clone();
        thread::Builder::new()
            .name("stream-start".into())
            .spawn(move || {
                info!("starting stream (video: {})", request.video_enabled);
                let result = start_playback(&*resolver, &*engines, &request);
                let _ = tx.send(StartMessage {
                    request_id: request.id,
                    result,
                });
            })
            .map(|_| ())
    }

    fn set_volume(&mut self, level: u8) {
        if let Err(err) = self.playback.set_volume(level) {
            warn!("volume change failed: {err}");
        }
    }

    fn request_detail(&mut self) {
        let request_id = self.next_detail_request_id;
        self.next_detail_request_id += 1;
        self.detail_open = true;
        self.detail = None;
        self.detail_inflight = Some(request_id);

        let fetcher = self.services.fetcher.clone();
        let tx = self.detail_tx.clone();
        let spawned = thread::Builder::new()
            .name("queue-view".into())
            .spawn(move || {
                let view = load_detail(&*fetcher);
                let _ = tx.send(DetailMessage { request_id, view });
            });
        if let Err(err) = spawned {
            self.detail_inflight = None;
            self.detail = Some(DetailView::Unavailable {
                reason: err.to_string(),
            });
        }
    }

    fn refresh_now_playing(&self) {
        if let Some(sync) = self.synchronizer.as_ref() {
            sync.refresh();
        }
    }

    fn update_window_level(&mut self, ctx: &egui::Context) {
        let desired = if self.always_on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        if self.last_window_level != Some(desired) {
            ctx.send_viewport_cmd(ViewportCommand::WindowLevel(desired));
            self.last_window_level = Some(desired);
        }
    }

    fn show(&mut self, ctx: &egui::Context) {
        self.update_window_level(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                self.render_now_playing(ui);
                ui.add_space(8.0);
                self.render_play_button(ui);
                self.render_playback_error(ui);
            });
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                self.render_controls(ui);
            });
        });

        self.render_detail_window(ctx);
    }

    fn render_now_playing(&mut self, ui: &mut egui::Ui) {
        ui.label(RichText::new(&self.now.track).size(17.0).strong());
        if !self.now.game.is_empty() {
            ui.label(RichText::new(&self.now.game).size(14.0).strong());
        }
        if !self.now.requester.is_empty() {
            ui.label(
                RichText::new(format!("Requested by: {}", self.now.requester))
                    .size(13.0)
                    .italics(),
            );
        }
    }

    fn render_play_button(&mut self, ui: &mut egui::Ui) {
        let label = self.playback.button_label();
        if ui.button(RichText::new(label).size(15.0)).clicked() {
            self.toggle_play();
        }
    }

    fn render_playback_error(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = &self.playback_err {
            ui.colored_label(ERROR_COLOR, err.as_str());
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let mut video = self.playback.video_enabled();
            if ui
                .checkbox(&mut video, "Show video")
                .on_hover_text("Applies the next time playback starts")
                .changed()
            {
                self.playback.set_video_enabled(video);
            }

            let mut volume = self.playback.volume();
            if ui
                .add(egui::Slider::new(&mut volume, 0..=MAX_VOLUME).text("Volume"))
                .changed()
            {
                self.set_volume(volume);
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Queue").clicked() {
                self.request_detail();
            }
            if ui.button("⟳").on_hover_text("Refresh now").clicked() {
                self.refresh_now_playing();
            }
            ui.toggle_value(&mut self.always_on_top, "📌")
                .on_hover_text("Keep window on top");
        });
    }

    fn render_detail_window(&mut self, ctx: &egui::Context) {
        if !self.detail_open {
            return;
        }

        let mut open = self.detail_open;
        let mut reload = false;
        egui::Window::new("Queue")
            .open(&mut open)
            .default_width(380.0)
            .show(ctx, |ui| {
                let Some(view) = self.detail.as_ref() else {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading…");
                    });
                    return;
                };

                if let Some(notice) = view.notice() {
                    ui.colored_label(WARNING_COLOR, notice);
                }

                if !matches!(view, DetailView::Unavailable { .. }) {
                    ui.strong(history_heading(view));
                    render_entries(ui, "history", view.history());

                    if let Some(queue) = view.queue() {
                        ui.separator();
                        ui.strong(queue_heading(queue));
                        render_entries(ui, "queue", &queue.queue);
                    }
                }

                ui.add_space(4.0);
                if ui.button("Reload").clicked() {
                    reload = true;
                }
            });

        self.detail_open = open;
        if !open {
            self.detail = None;
            self.detail_inflight = None;
        } else if reload {
            self.request_detail();
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut sync) = self.synchronizer.take() {
            sync.shutdown();
        }
        self.playback.shutdown();
    }
}

fn render_entries(ui: &mut egui::Ui, id: &str, entries: &[SongEntry]) {
    egui::ScrollArea::vertical()
        .id_salt(id)
        .max_height(160.0)
        .show(ui, |ui| {
            for (index, entry) in entries.iter().enumerate() {
                ui.label(format_entry(index + 1, entry));
            }
        });
}

fn playback_error_text(err: &PlaybackError) -> String {
    match err {
        PlaybackError::Resolution(err) => format!("Error: no audio URL found ({err})"),
        PlaybackError::Engine(err) => format!("Playback failed: {err}"),
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_channels();
        self.show(ctx);
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
