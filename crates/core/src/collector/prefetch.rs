//! Scroll-driven prefetch decisions.

use super::CollectorState;

/// Direction of the last scroll movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    /// No movement since the last observation.
    Still,
}

/// A scroll position reported by the embedding view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Height of the visible area.
    pub viewport: f64,
    /// Total height of the scrollable content.
    pub content_height: f64,
}

impl ScrollPosition {
    pub fn new(offset: f64, viewport: f64, content_height: f64) -> Self {
        Self {
            offset,
            viewport,
            content_height,
        }
    }

    /// Fraction of the content above the bottom of the viewport.
    ///
    /// Content that fits entirely in the viewport counts as fully scrolled.
    pub fn ratio(&self) -> f64 {
        if self.content_height <= 0.0 {
            return 1.0;
        }
        ((self.offset + self.viewport) / self.content_height).clamp(0.0, 1.0)
    }
}

/// Whether the next page should be requested ahead of time.
///
/// True only when scrolling down past `threshold` while more pages are
/// expected and no fetch is running.
pub fn should_prefetch(
    ratio: f64,
    direction: ScrollDirection,
    state: &CollectorState,
    threshold: f64,
) -> bool {
    direction == ScrollDirection::Down
        && ratio > threshold
        && state.has_more
        && !state.fetch_in_flight
}

/// Edge-triggered scroll observer.
///
/// Fires at most once per crossing of the threshold. It re-arms when the
/// ratio falls back to the threshold or below, or when the content grows
/// (a new page was rendered below the fold).
#[derive(Debug, Clone)]
pub struct ScrollObserver {
    threshold: f64,
    last: Option<ScrollPosition>,
    armed: bool,
}

impl ScrollObserver {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last: None,
            armed: true,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Record a position and decide whether to prefetch.
    pub fn observe(&mut self, position: ScrollPosition, state: &CollectorState) -> bool {
        let direction = match self.last {
            Some(last) if position.offset > last.offset => ScrollDirection::Down,
            Some(last) if position.offset < last.offset => ScrollDirection::Up,
            Some(_) => ScrollDirection::Still,
            // First report: treat any scrolled-in position as downward.
            None if position.offset > 0.0 => ScrollDirection::Down,
            None => ScrollDirection::Still,
        };

        if let Some(last) = self.last {
            if position.content_height > last.content_height {
                self.armed = true;
            }
        }
        self.last = Some(position);

        let ratio = position.ratio();
        if ratio <= self.threshold {
            self.armed = true;
            return false;
        }

        if self.armed && should_prefetch(ratio, direction, state, self.threshold) {
            self.armed = false;
            return true;
        }
        false
    }

    /// Forget the scroll history, as for a fresh session.
    pub fn reset(&mut self) {
        self.last = None;
        self.armed = true;
    }
}
