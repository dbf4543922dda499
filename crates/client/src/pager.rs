//! Offset/limit bookkeeping for one search.
//!
//! The next offset is derived from the size of the page just applied, so a
//! page can only be requested once its predecessor has been applied. That
//! keeps pages in offset order without any reordering on the client.

use snpwizard_core::filter::PageLimit;

/// Offset and limit of one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: u64,
    pub limit: PageLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    Ready,
    InFlight(PageCursor),
    Exhausted,
}

/// What applying a page means for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was full; more rows may follow at the new offset.
    MaybeMore { next_offset: u64 },
    /// The page was short or unbounded; no further requests.
    Finished,
}

#[derive(Debug, Clone)]
pub struct Pager {
    limit: PageLimit,
    offset: u64,
    state: PagerState,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PageLimit::default())
    }
}

impl Pager {
    pub fn new(limit: PageLimit) -> Self {
        Self {
            limit,
            offset: 0,
            state: PagerState::Ready,
        }
    }

    pub fn limit(&self) -> PageLimit {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PagerState::Exhausted
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, PagerState::InFlight(_))
    }

    /// Start the next page request. `None` while one is outstanding or after
    /// the terminal page.
    pub fn next_request(&mut self) -> Option<PageCursor> {
        match self.state {
            PagerState::Ready => {
                let cursor = PageCursor {
                    offset: self.offset,
                    limit: self.limit,
                };
                self.state = PagerState::InFlight(cursor);
                Some(cursor)
            }
            PagerState::InFlight(_) | PagerState::Exhausted => None,
        }
    }

    /// Apply the response to the outstanding request.
    ///
    /// Returns `None` when no request was outstanding.
    pub fn apply(&mut self, rows: usize) -> Option<PageOutcome> {
        let PagerState::InFlight(cursor) = self.state else {
            return None;
        };
        let outcome = match cursor.limit {
            PageLimit::Bounded(n) if rows as u64 >= n => {
                self.offset = cursor.offset + n;
                self.state = PagerState::Ready;
                PageOutcome::MaybeMore {
                    next_offset: self.offset,
                }
            }
            _ => {
                self.offset = cursor.offset + rows as u64;
                self.state = PagerState::Exhausted;
                PageOutcome::Finished
            }
        };
        Some(outcome)
    }

    /// Give up the outstanding request without advancing, so it can be retried.
    pub fn abandon(&mut self) {
        if self.is_in_flight() {
            self.state = PagerState::Ready;
        }
    }

    /// Change the limit for the remaining pages, keeping the offset.
    ///
    /// An outstanding request is abandoned.
    pub fn set_limit(&mut self, limit: PageLimit) {
        self.limit = limit;
        if self.is_in_flight() {
            self.state = PagerState::Ready;
        }
    }

    /// Back to the first page.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.state = PagerState::Ready;
    }
}
