use crate::config::WatchConfig;
use crate::extract::{extract_price, extract_quantity};
use crate::host::Document;

/// Price × quantity as the page shows them right now.
///
/// A missing or unreadable price counts as 0 and a missing or unreadable
/// quantity as 1, so the result is always a number. Empty selectors are
/// treated as absent.
pub fn calculate_total<D: Document + ?Sized>(
    doc: &D,
    price_selector: Option<&str>,
    quantity_selector: Option<&str>,
) -> f64 {
    let price = price_selector
        .filter(|selector| !selector.is_empty())
        .and_then(|selector| extract_price(doc, selector))
        .unwrap_or(0.0);
    let quantity = quantity_selector
        .filter(|selector| !selector.is_empty())
        .and_then(|selector| extract_quantity(doc, selector))
        .unwrap_or(1);
    price * quantity as f64
}

pub fn calculate_total_for<D: Document + ?Sized>(doc: &D, config: &WatchConfig) -> f64 {
    calculate_total(doc, config.price(), config.quantity())
}

/// Publishes a total only when it differs from the previous one.
///
/// Change notifications arrive in bursts (an event, a mutation and a poll tick
/// can all report the same edit), so callers gate their expensive work, such
/// as re-fetching offers, on [`TotalTracker::refresh`].
#[derive(Debug, Clone)]
pub struct TotalTracker {
    config: WatchConfig,
    last_total: Option<f64>,
}

impl TotalTracker {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            last_total: None,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Recomputes the total; `Some` only when it changed since the last
    /// published value. The first refresh always publishes.
    pub fn refresh<D: Document + ?Sized>(&mut self, doc: &D) -> Option<f64> {
        let total = calculate_total_for(doc, &self.config);
        if self.last_total.is_some_and(|last| last == total) {
            tracing::trace!(total, "total unchanged");
            return None;
        }
        tracing::debug!(previous = ?self.last_total, total, "total changed");
        self.last_total = Some(total);
        Some(total)
    }

    pub fn last_total(&self) -> Option<f64> {
        self.last_total
    }
}
