use crate::core::config::AttributionConfig;
use crate::layers::base::LayerTrait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Element shown over the map until the first frame has been rendered
pub trait LoadingIndicator: Send {
    fn hide(&mut self);

    fn is_visible(&self) -> bool;
}

/// Loading indicator backed by a shared flag, so the host can observe it
/// while the map owns a clone
#[derive(Debug, Clone)]
pub struct LoadingFlag {
    visible: Arc<AtomicBool>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Default for LoadingFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingIndicator for LoadingFlag {
    fn hide(&mut self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            log::debug!("loading indicator hidden");
        }
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

/// Credits of the visible layers, collapsible into a button
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    collapsible: bool,
    collapsed: bool,
}

impl Attribution {
    pub fn new(collapsible: bool, collapsed: bool) -> Self {
        Self {
            collapsible,
            // A control that cannot collapse is always expanded.
            collapsed: collapsible && collapsed,
        }
    }

    pub fn from_config(config: &AttributionConfig) -> Self {
        Self::new(config.collapsible, config.collapsed)
    }

    pub fn is_collapsible(&self) -> bool {
        self.collapsible
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Flips between collapsed and expanded; no-op when not collapsible
    pub fn toggle(&mut self) {
        if self.collapsible {
            self.collapsed = !self.collapsed;
        }
    }

    /// Attributions of the visible layers in layer order, without duplicates
    pub fn collect<'a, I>(layers: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a dyn LayerTrait>,
    {
        let mut credits: Vec<String> = Vec::new();
        for layer in layers {
            if !layer.is_visible() {
                continue;
            }
            if let Some(text) = layer.attribution().filter(|text| !text.is_empty()) {
                if !credits.iter().any(|known| known == text) {
                    credits.push(text.to_string());
                }
            }
        }
        credits
    }
}

impl Default for Attribution {
    fn default() -> Self {
        Self::from_config(&AttributionConfig::default())
    }
}
