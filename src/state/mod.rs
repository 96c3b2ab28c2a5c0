//! State module for tracking crawl progress
//!
//! This module provides the single source of truth for a crawl session.
//!
//! # Components
//!
//! - `CrawlState`: Which URLs have been visited, which are in flight, which have resolved,
//!   and whether the session is complete
//! - `PageState`: The lifecycle position of an individual URL within a session

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlState, CrawlStateSnapshot, StateError};
pub use page_state::PageState;
