//! Crawler module for retrieving ad listings
//!
//! This module contains the acquisition side of a run:
//! - The fetch layer and its outcome classification
//! - An optional rendering backend behind the same [`Fetcher`] seam
//! - Token pagination over the structured API
//! - Breadth-limited traversal of listing pages
//! - The [`Coordinator`] that connects controllers to sinks

mod coordinator;
mod fetcher;
mod frontier;
mod pagination;
mod render;
mod traversal;

pub use coordinator::Coordinator;
pub use fetcher::{
    build_http_client, is_html_content_type, is_throttle_body, parse_retry_after,
    ExpectedContent, FetchFailure, FetchOutcome, FetchRequest, Fetcher, HttpFetcher,
};
pub use frontier::{Frontier, FrontierEntry};
pub use pagination::{
    extract_continuation_token, PageRequest, PaginationController, PaginationReport,
    PaginationSettings, PaginationState, SearchParams, StopReason,
};
pub use render::{NavigationResult, RenderContext, RenderError, Renderer, RenderingFetcher};
pub use traversal::{TraversalController, TraversalReport, TraversalSettings};
