//! Content scoring for a sports tips publishing site: SEO scoring of drafts,
//! relevance ranking for site search and related-post selection.
pub mod config;
pub mod content;
pub mod publish;
pub mod related;
pub mod scoring;
pub mod search;
pub mod storage;
