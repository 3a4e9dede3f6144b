//! # Awful Account News
//!
//! Reduces the raw articles fetched for each tracked account to a short,
//! high-quality, non-redundant list before it is handed to a summarizer.
//!
//! ## Architecture
//!
//! The core is the [`filter::ArticleFilterPipeline`]:
//! 1. **Canonicalize**: drop tracking parameters and fragments, hash the URL
//! 2. **Domain policy**: allow/block lists over the source host
//! 3. **Exact dedup**: one record per URL hash
//! 4. **Title dedup**: one record per near-identical headline
//! 5. **Rank and cap**: newest first, reputable sources first on ties
//!
//! Around it, [`runner`] drives one run over many accounts, [`seen`] keeps
//! already-delivered URLs out of later runs, [`config`] supplies settings and
//! account definitions, and [`outputs`] archives the weekly report.

pub mod config;
pub mod filter;
pub mod models;
pub mod outputs;
pub mod runner;
pub mod seen;
pub mod utils;
