//! Drives the egui widget headlessly
#![cfg(feature = "egui")]

use async_trait::async_trait;
use chronomap::{
    core::geo::Size, tiles::loader::Fetcher, Attribution, LoadingFlag, LoadingIndicator,
    MapBuilder, MapError, MapWidget, Result,
};
use egui::{Context, Pos2, RawInput, Rect, Vec2};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers every request with a 404 and counts them
#[derive(Default)]
struct OfflineFetcher {
    requests: AtomicUsize,
}

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Err(MapError::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}

fn raw_input() -> RawInput {
    RawInput {
        screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_first_frame_hides_loading_overlay() {
    let loading = LoadingFlag::new();
    let mut map = MapBuilder::new()
        .with_size(Size::new(400.0, 300.0))
        .with_fetcher(Arc::new(OfflineFetcher::default()))
        .with_loading_indicator(Box::new(loading.clone()))
        .build()
        .unwrap();
    let mut widget = MapWidget::new(Attribution::default());
    let ctx = Context::default();

    assert!(loading.is_visible());
    let _ = ctx.run(raw_input(), |ctx| {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                widget.show(ui, &mut map);
            });
    });

    assert!(!loading.is_visible());
    assert_eq!(map.frame_count(), 1);
    // The widget resizes the view to the space egui gave it.
    assert_eq!(map.view.size, Size::new(800.0, 600.0));
    assert!(widget.attribution().is_collapsed());
}

#[tokio::test]
async fn test_every_frame_renders_the_map() {
    let fetcher = Arc::new(OfflineFetcher::default());
    let mut map = MapBuilder::new()
        .with_fetcher(Arc::clone(&fetcher) as Arc<dyn Fetcher>)
        .build()
        .unwrap();
    let mut widget = MapWidget::default().interactive(false);
    let ctx = Context::default();

    for _ in 0..3 {
        let _ = ctx.run(raw_input(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                widget.show(ui, &mut map);
            });
        });
    }
    assert_eq!(map.frame_count(), 3);

    // Base tiles for the view went through the injected fetcher.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(fetcher.requests.load(Ordering::SeqCst) > 0);
}
