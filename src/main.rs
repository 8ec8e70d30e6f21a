use eframe::egui::ViewportBuilder;
use log::warn;
use vgm_radio_widget::{
    app::{App, Services, APP_TITLE},
    config::Config,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|err| {
        warn!("{err:#}; using defaults");
        Config::default()
    });
    let services = Services::from_config(&config)?;

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([370.0, 200.0])
            .with_min_inner_size([320.0, 180.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(config, services)?)) },
        ),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
