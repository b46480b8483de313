//! Source vetting: sanitise, rank, and liveness-check candidate URLs.
//!
//! Search results arrive as raw URLs of mixed quality. This module turns
//! them into a short, rank-ordered list of manufacturer or retailer pages
//! that are currently reachable and substantive.

pub mod fetch;
pub mod liveness;
pub mod ranking;
pub mod sanitize;

pub use fetch::{FetchedPage, PageFetcher, ReqwestFetcher};
pub use liveness::filter_live;
pub use ranking::{rank, rank_urls, SourcePolicy};
pub use sanitize::sanitize;
