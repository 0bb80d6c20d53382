//! Fixed-size pages for paginated mode.

use super::window::ViewportRange;

/// Chunks per page. Independent of the group size.
pub const PAGE_SIZE: usize = 50;

/// Current page of a chunk list.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    page: usize,
    count: usize,
}

impl Pager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page that holds chunk `index`.
    pub fn page_of(index: usize) -> usize {
        index / PAGE_SIZE
    }

    /// Pages needed for `count` chunks.
    pub fn pages_for(count: usize) -> usize {
        count.div_ceil(PAGE_SIZE)
    }

    /// Show the page holding `index` in a list of `count` chunks.
    pub fn position_on(&mut self, index: usize, count: usize) {
        self.count = count;
        self.page = Self::page_of(index).min(self.page_count().saturating_sub(1));
    }

    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        Self::pages_for(self.count)
    }

    /// Chunks on the current page.
    pub fn range(&self) -> ViewportRange {
        let start = (self.page * PAGE_SIZE).min(self.count);
        ViewportRange {
            start,
            end: (start + PAGE_SIZE).min(self.count),
        }
    }
}
