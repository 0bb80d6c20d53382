//! Which chunks are rendered.
//!
//! Two independent browsing modes share one [`Viewport`]:
//!
//! ```text
//! Continuous:  [ start ............ index ............ end )   grows on scroll
//! Paginated:   page = index / 50, moved with prev_page / next_page
//! ```
//!
//! The viewport is fed the controller's [`ReaderEvent`]s and never talks back
//! to it. The continuous window re-centres on every index change. The page
//! follows user navigation, reloads and regrouping but stays put while
//! playback auto-advances, so a reader browsing another page is not yanked
//! back every few seconds.

pub mod pages;
pub mod window;

pub use pages::{Pager, PAGE_SIZE};
pub use window::{
    ContinuousWindow, Expansion, ScrollAnchor, ScrollMetrics, ViewportRange, EDGE_THRESHOLD_PX,
    EXPAND_STEP, WINDOW_AHEAD, WINDOW_BEHIND,
};

use crate::config::ViewMode;
use crate::playback::{IndexChange, ReaderEvent};

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Visible-range bookkeeping for both view modes.
#[derive(Debug, Clone)]
pub struct Viewport {
    mode: ViewMode,
    window: ContinuousWindow,
    pager: Pager,
    index: usize,
    count: usize,
}

impl Viewport {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            window: ContinuousWindow::new(),
            pager: Pager::new(),
            index: 0,
            count: 0,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn window(&self) -> &ContinuousWindow {
        &self.window
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Update from a controller event.
    pub fn apply(&mut self, event: &ReaderEvent) {
        match event {
            ReaderEvent::DocumentChanged(document) => {
                self.count = document.len();
                self.index = document.clamp_index(self.index);
                self.window.follow(self.index, self.count);
                self.pager.position_on(self.index, self.count);
            }
            ReaderEvent::IndexChanged { index, cause } => {
                self.index = *index;
                self.window.follow(self.index, self.count);
                if *cause != IndexChange::AutoAdvance {
                    self.pager.position_on(self.index, self.count);
                }
            }
            ReaderEvent::SettingsChanged(settings) if settings.view_mode != self.mode => {
                self.set_mode(settings.view_mode);
            }
            _ => {}
        }
    }

    /// Switch modes, positioning the new mode on the current chunk.
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
        match mode {
            ViewMode::Continuous => self.window.follow(self.index, self.count),
            ViewMode::Paginated => self.pager.position_on(self.index, self.count),
        }
    }

    /// Chunks to render in the current mode.
    pub fn visible_range(&self) -> ViewportRange {
        match self.mode {
            ViewMode::Continuous => self.window.range(),
            ViewMode::Paginated => self.pager.range(),
        }
    }

    /// Forward a scroll position. Only continuous mode expands.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Expansion {
        match self.mode {
            ViewMode::Continuous => self.window.on_scroll(metrics),
            ViewMode::Paginated => Expansion::default(),
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.mode == ViewMode::Paginated && self.pager.next_page()
    }

    pub fn prev_page(&mut self) -> bool {
        self.mode == ViewMode::Paginated && self.pager.prev_page()
    }

    /// `"Page 2 of 7"`, or `None` outside paginated mode.
    pub fn page_label(&self) -> Option<String> {
        (self.mode == ViewMode::Paginated).then(|| {
            format!(
                "Page {} of {}",
                self.pager.page() + 1,
                self.pager.page_count().max(1)
            )
        })
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewMode::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ReaderSettings;
    use crate::text::Document;

    fn document(chunks: usize) -> Arc<Document> {
        let text: Vec<String> = (0..chunks).map(|i| format!("Sentence {i}.")).collect();
        Arc::new(Document::new(&text.join(" "), 1))
    }

    fn moved(index: usize, cause: IndexChange) -> ReaderEvent {
        ReaderEvent::IndexChanged { index, cause }
    }

    #[test]
    fn continuous_window_follows_every_index_change() {
        let mut v = Viewport::new(ViewMode::Continuous);
        v.apply(&ReaderEvent::DocumentChanged(document(200)));
        v.apply(&moved(60, IndexChange::Navigation));
        assert_eq!(v.visible_range(), ViewportRange { start: 55, end: 66 });

        v.apply(&moved(61, IndexChange::AutoAdvance));
        assert_eq!(v.visible_range(), ViewportRange { start: 56, end: 67 });
    }

    #[test]
    fn page_does_not_follow_auto_advance() {
        let mut v = Viewport::new(ViewMode::Paginated);
        v.apply(&ReaderEvent::DocumentChanged(document(200)));
        v.apply(&moved(49, IndexChange::Navigation));
        assert_eq!(v.pager().page(), 0);

        v.apply(&moved(50, IndexChange::AutoAdvance));
        assert_eq!(v.pager().page(), 0);

        v.apply(&moved(120, IndexChange::Navigation));
        assert_eq!(v.pager().page(), 2);
        assert!(v.visible_range().contains(120));
        assert_eq!(v.page_label().as_deref(), Some("Page 3 of 4"));
    }

    #[test]
    fn manual_paging_only_in_paginated_mode() {
        let mut v = Viewport::new(ViewMode::Continuous);
        v.apply(&ReaderEvent::DocumentChanged(document(120)));
        assert!(!v.next_page());
        assert_eq!(v.page_label(), None);

        v.set_mode(ViewMode::Paginated);
        assert!(v.next_page());
        assert_eq!(v.visible_range(), ViewportRange { start: 50, end: 100 });
    }

    #[test]
    fn mode_switch_positions_on_current_chunk() {
        let mut v = Viewport::new(ViewMode::Continuous);
        v.apply(&ReaderEvent::DocumentChanged(document(200)));
        v.apply(&moved(130, IndexChange::AutoAdvance));

        let settings = ReaderSettings {
            view_mode: ViewMode::Paginated,
            ..ReaderSettings::default()
        };
        v.apply(&ReaderEvent::SettingsChanged(settings));
        assert_eq!(v.mode(), ViewMode::Paginated);
        assert!(v.visible_range().contains(130));
    }

    #[test]
    fn shrinking_document_clamps_index() {
        let mut v = Viewport::new(ViewMode::Continuous);
        v.apply(&ReaderEvent::DocumentChanged(document(100)));
        v.apply(&moved(90, IndexChange::Navigation));
        v.apply(&ReaderEvent::DocumentChanged(document(10)));

        assert_eq!(v.index(), 9);
        assert!(v.visible_range().contains(9));
        assert!(v.visible_range().end <= 10);
    }

    #[test]
    fn scroll_is_ignored_in_paginated_mode() {
        let mut v = Viewport::new(ViewMode::Paginated);
        v.apply(&ReaderEvent::DocumentChanged(document(100)));
        v.apply(&moved(60, IndexChange::Navigation));
        let e = v.on_scroll(ScrollMetrics {
            offset: 0.0,
            viewport_height: 500.0,
            content_height: 520.0,
        });
        assert!(e.is_empty());
    }

    #[test]
    fn empty_document_renders_nothing() {
        let mut v = Viewport::default();
        v.apply(&ReaderEvent::DocumentChanged(Arc::new(Document::empty())));
        assert!(v.visible_range().is_empty());
    }
}
