//! Continuous-scroll window over the chunk list.
//!
//! Only a slice of a long document is materialised at any time. The slice is
//! re-centred on the current chunk whenever the index changes and grows in
//! steps when the user scrolls close to either edge.
//!
//! Growing at the top inserts content above what the user is looking at. The
//! caller must then push its scroll offset down by exactly the height that
//! was added, otherwise the visible text jumps. [`ScrollAnchor`] carries what
//! is needed to do that once the new content has been laid out.

/// Chunks kept before the current one.
pub const WINDOW_BEHIND: usize = 5;
/// Chunks kept from the current one onwards (current included).
pub const WINDOW_AHEAD: usize = 6;
/// Chunks added per expansion.
pub const EXPAND_STEP: usize = 5;
/// Distance from an edge, in pixels, that triggers an expansion.
pub const EDGE_THRESHOLD_PX: f64 = 100.0;

// ---------------------------------------------------------------------------
// ViewportRange
// ---------------------------------------------------------------------------

/// Half-open chunk range `[start, end)` with `start <= end <= count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRange {
    pub start: usize,
    pub end: usize,
}

impl ViewportRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

// ---------------------------------------------------------------------------
// Scroll geometry
// ---------------------------------------------------------------------------

/// Scroll position reported by the rendering surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Distance from the top of the content to the top of the viewport.
    pub offset: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    pub fn near_top(&self) -> bool {
        self.offset <= EDGE_THRESHOLD_PX
    }

    pub fn near_bottom(&self) -> bool {
        self.content_height - (self.offset + self.viewport_height) <= EDGE_THRESHOLD_PX
    }
}

/// Scroll state captured just before chunks were prepended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    pub offset: f64,
    pub content_height: f64,
}

impl ScrollAnchor {
    /// Offset that keeps the same content in view once the content has grown
    /// to `new_content_height`.
    ///
    /// ```
    /// use read_aloud::viewport::ScrollAnchor;
    ///
    /// let anchor = ScrollAnchor { offset: 40.0, content_height: 1_000.0 };
    /// assert_eq!(anchor.adjusted_offset(1_350.0), 390.0);
    /// ```
    pub fn adjusted_offset(&self, new_content_height: f64) -> f64 {
        self.offset + (new_content_height - self.content_height).max(0.0)
    }
}

/// What a scroll event changed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Expansion {
    pub prepended: usize,
    pub appended: usize,
    /// Present whenever `prepended > 0`.
    pub anchor: Option<ScrollAnchor>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.prepended == 0 && self.appended == 0
    }
}

// ---------------------------------------------------------------------------
// ContinuousWindow
// ---------------------------------------------------------------------------

/// Sliding window for continuous mode.
#[derive(Debug, Clone, Default)]
pub struct ContinuousWindow {
    range: ViewportRange,
    count: usize,
}

impl ContinuousWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> ViewportRange {
        self.range
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Re-centre on `index` in a list of `count` chunks.
    pub fn follow(&mut self, index: usize, count: usize) {
        self.count = count;
        self.range = Self::around(index, count);
    }

    /// The default window for `index`: five behind, the current one and five
    /// ahead, cut at the list bounds.
    pub fn around(index: usize, count: usize) -> ViewportRange {
        if count == 0 {
            return ViewportRange::default();
        }
        let index = index.min(count - 1);
        ViewportRange {
            start: index.saturating_sub(WINDOW_BEHIND),
            end: (index + WINDOW_AHEAD).min(count),
        }
    }

    /// Grow towards the start. Returns how many chunks were added.
    pub fn expand_backward(&mut self) -> usize {
        let start = self.range.start.saturating_sub(EXPAND_STEP);
        let added = self.range.start - start;
        self.range.start = start;
        added
    }

    /// Grow towards the end. Returns how many chunks were added.
    pub fn expand_forward(&mut self) -> usize {
        let end = (self.range.end + EXPAND_STEP).min(self.count);
        let added = end.saturating_sub(self.range.end);
        self.range.end = end.max(self.range.end);
        added
    }

    /// Expand at whichever edge the user scrolled close to.
    ///
    /// At most one edge grows per call. When both are near, the top wins and
    /// the bottom is picked up by the next scroll event, so the content-height
    /// delta seen by the [`ScrollAnchor`] is only ever the prepended height.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Expansion {
        let mut expansion = Expansion::default();

        if metrics.near_top() && self.range.start > 0 {
            expansion.anchor = Some(ScrollAnchor {
                offset: metrics.offset,
                content_height: metrics.content_height,
            });
            expansion.prepended = self.expand_backward();
        } else if metrics.near_bottom() && self.range.end < self.count {
            expansion.appended = self.expand_forward();
        }

        if !expansion.is_empty() {
            log::trace!(
                "viewport: window {:?} (+{} above, +{} below)",
                self.range,
                expansion.prepended,
                expansion.appended
            );
        }
        expansion
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
