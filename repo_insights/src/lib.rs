//! Repository insights
//!
//! # Overview
//!
//! Library summarizing the public activity of a single code hosting account.
//! Given an owner login, it lists the owner's repositories and, for each repository, its commits,
//! pull requests and contributors.
//! Listings are then reduced to descriptive statistics: most starred, most forked and most recently
//! updated repositories, language breakdown, repository size histogram, commit weekday distribution,
//! average commit frequency, longest commit streak, pull request state counts and unique contributors.
//!
//! A repository whose listing fails is not fatal. It is counted as skipped and whatever records
//! were received before the failure still take part in the statistics.

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "api")]
pub mod stats;

#[cfg(feature = "analyzer")]
pub mod analyzer;

#[cfg(feature = "analyzer")]
pub use analyzer::{Analysis, Analyzer};
