//! # snpwizard-client
//!
//! Typed HTTP client for the mouse SNP wizard search service, and the client
//! half of its paging protocol.
//!
//! ```text
//! set_filter ──▶ cancel count + page ──▶ reset pager ──▶ debounced /count
//! next_page  ──▶ /loadMore?offset&limit ──▶ apply ──▶ offset += limit | finished
//! ```

/// Client error type.
pub mod error;
/// reqwest-based client for the REST API.
pub mod http;
/// Single-slot, cancel-then-replace request handle.
pub mod latest;
/// Offset/limit bookkeeping.
pub mod pager;
/// Search session tying filter changes, counting and paging together.
pub mod session;

pub use error::ClientError;
pub use http::{Page, SearchClient};
pub use pager::{PageCursor, PageOutcome, Pager};
pub use session::{FilterChange, SearchSession};
