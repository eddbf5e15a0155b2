//! Client code for srcview.
//!
//! This crate provides the outbound fetch pipeline and the highlighting
//! engine used by the server.

pub mod fetch;
pub mod highlight;

pub use fetch::{FetchClient, FetchConfig, FetchError, Fetcher, PublicOnlyResolver};
pub use highlight::{Highlight, HighlightError, HighlighterProvider, SyntectHighlighter, SyntectProvider};
