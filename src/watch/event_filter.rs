// src/watch/event_filter.rs

//! Turns raw change notifications into filtered relative paths.

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::Event;

use crate::types::RelativePath;
use crate::watch::path_utils::relative_path;
use crate::watch::patterns::PathFilter;

/// Stateless filter over change notifications for one watched root.
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    filter: PathFilter,
}

impl EventFilter {
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an absolute path to a relative one, keeping it only if the
    /// include/exclude patterns accept it.
    pub fn filter_path(&self, path: &Path) -> Option<RelativePath> {
        relative_path(&self.root, path).filter(|rel| self.filter.is_included(rel))
    }

    /// Paths of a notify event that should reach the scheduler.
    ///
    /// Create, modify and remove are treated alike. A rename only reports
    /// its destination. Pure access events carry no change and are dropped.
    pub fn filter_event(&self, event: &Event) -> Vec<RelativePath> {
        let candidates: &[PathBuf] = match event.kind {
            EventKind::Access(_) => &[],
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => &[],
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
                .paths
                .last()
                .map(std::slice::from_ref)
                .unwrap_or(&[]),
            _ => &event.paths,
        };

        candidates
            .iter()
            .filter_map(|p| self.filter_path(p))
            .collect()
    }
}
