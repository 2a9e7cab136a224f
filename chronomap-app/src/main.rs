use anyhow::Context;
use chronomap::{
    core::geo::Size, Attribution, LoadingFlag, LoadingIndicator, Map, MapBuilder, MapWidget,
    ViewerConfig,
};
use std::path::PathBuf;

/// Desktop viewer for the Montmorillon 1840 historical map
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chronomap::init_logging();

    let config = load_config(config_path(std::env::args().skip(1))?)?;
    let loading = LoadingFlag::new();
    let mut map = MapBuilder::from_config(config.clone())
        .with_size(Size::new(1200.0, 800.0))
        .with_loading_indicator(Box::new(loading.clone()))
        .build()
        .context("building the map")?;
    map.start_loading().context("starting the overlay download")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Montmorillon 1840"),
        ..Default::default()
    };

    let attribution = Attribution::from_config(&config.attribution);
    eframe::run_native(
        "chronomap-app",
        options,
        Box::new(move |_cc| Box::new(ChronomapApp::new(map, attribution, loading))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {}", e))?;

    Ok(())
}

/// Reads `--config <path>` from the command line
fn config_path(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<PathBuf>> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => anyhow::bail!("unknown argument {other:?}; usage: chronomap-app [--config <path>]"),
        }
    }
    Ok(path)
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ViewerConfig> {
    let config = match path {
        Some(path) => ViewerConfig::load(&path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

struct ChronomapApp {
    map: Map,
    widget: MapWidget,
    loading: LoadingFlag,
}

impl ChronomapApp {
    fn new(map: Map, attribution: Attribution, loading: LoadingFlag) -> Self {
        Self {
            map,
            widget: MapWidget::new(attribution),
            loading,
        }
    }
}

impl eframe::App for ChronomapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.widget.show(ui, &mut self.map);
            });

        if self.loading.is_visible() {
            ctx.request_repaint();
        }
    }
}
