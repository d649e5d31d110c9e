// src/watch/mod.rs

//! File watching and change filtering.
//!
//! This module is responsible for:
//! - Compiling include / exclude patterns into a [`PathFilter`].
//! - Mapping raw notify events to filtered [`RelativePath`]s.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that feeds the
//!   scheduler channel.
//!
//! It knows nothing about the build pipeline.
//!
//! [`RelativePath`]: crate::types::RelativePath

pub mod event_filter;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_filter::EventFilter;
pub use patterns::PathFilter;
pub use watcher::{spawn_watcher, WatcherHandle};
