//! Scroll bounds for a horizontally scrolling rail.
//!
//! The carousel never assumes a programmatic scroll lands: arrow presses
//! return a target for the host to animate toward, and the offset only moves
//! when the host reports it through `on_scroll`.

use std::time::Duration;

use crate::config::{CAROUSEL_MEASURE_DELAY_MS, CAROUSEL_SCROLL_FRACTION};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCommand {
    pub target: f64,
    pub smooth: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Carousel {
    container_width: f64,
    content_width: f64,
    offset: f64,
}

impl Carousel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for layout to settle, then take the first measurement.
    pub async fn mount<F>(&mut self, measure: F)
    where
        F: FnOnce() -> (f64, f64),
    {
        tokio::time::sleep(Duration::from_millis(CAROUSEL_MEASURE_DELAY_MS)).await;
        let (container, content) = measure();
        self.measure(container, content);
    }

    /// Record new widths (mount or resize). The offset is clamped in case the
    /// content shrank underneath it.
    pub fn measure(&mut self, container_width: f64, content_width: f64) {
        self.container_width = container_width.max(0.0);
        self.content_width = content_width.max(0.0);
        self.offset = self.offset.clamp(0.0, self.max_offset());
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn content_width(&self) -> f64 {
        self.content_width
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn max_offset(&self) -> f64 {
        (self.content_width - self.container_width).max(0.0)
    }

    pub fn can_scroll_left(&self) -> bool {
        self.offset > 0.0
    }

    pub fn can_scroll_right(&self) -> bool {
        self.offset < self.max_offset()
    }

    fn step(&self) -> f64 {
        self.container_width * CAROUSEL_SCROLL_FRACTION
    }

    pub fn scroll_left(&self) -> Option<ScrollCommand> {
        if !self.can_scroll_left() {
            return None;
        }
        Some(ScrollCommand {
            target: (self.offset - self.step()).clamp(0.0, self.max_offset()),
            smooth: true,
        })
    }

    pub fn scroll_right(&self) -> Option<ScrollCommand> {
        if !self.can_scroll_right() {
            return None;
        }
        Some(ScrollCommand {
            target: (self.offset + self.step()).clamp(0.0, self.max_offset()),
            smooth: true,
        })
    }

    /// Native scroll event.
    pub fn on_scroll(&mut self, offset: f64) {
        self.offset = offset.clamp(0.0, self.max_offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measured(container: f64, content: f64) -> Carousel {
        let mut c = Carousel::new();
        c.measure(container, content);
        c
    }

    #[test]
    fn right_scroll_moves_by_eighty_percent() {
        let mut c = measured(300.0, 1000.0);
        assert!(!c.can_scroll_left());
        assert!(c.can_scroll_right());

        let cmd = c.scroll_right().unwrap();
        assert_eq!(cmd, ScrollCommand { target: 240.0, smooth: true });
        // Nothing moves until the scroll event arrives.
        assert!(!c.can_scroll_left());

        c.on_scroll(cmd.target);
        assert!(c.can_scroll_left());
        assert!(c.can_scroll_right());
    }

    #[test]
    fn targets_clamp_to_bounds() {
        let mut c = measured(300.0, 1000.0);
        c.on_scroll(600.0);
        assert_eq!(c.scroll_right().unwrap().target, 700.0);
        c.on_scroll(700.0);
        assert!(!c.can_scroll_right());
        assert!(c.scroll_right().is_none());

        c.on_scroll(100.0);
        assert_eq!(c.scroll_left().unwrap().target, 0.0);
    }

    #[test]
    fn content_narrower_than_container_never_scrolls() {
        let c = measured(500.0, 320.0);
        assert_eq!(c.max_offset(), 0.0);
        assert!(c.scroll_left().is_none());
        assert!(c.scroll_right().is_none());
    }

    #[test]
    fn resize_clamps_offset() {
        let mut c = measured(300.0, 1000.0);
        c.on_scroll(700.0);
        c.measure(600.0, 1000.0);
        assert_eq!(c.offset(), 400.0);
        assert!(!c.can_scroll_right());
    }

    #[tokio::test]
    async fn mount_measures_after_delay() {
        let mut c = Carousel::new();
        let started = std::time::Instant::now();
        c.mount(|| (300.0, 1000.0)).await;
        assert!(started.elapsed() >= Duration::from_millis(CAROUSEL_MEASURE_DELAY_MS));
        assert_eq!(c.max_offset(), 700.0);
    }
}
