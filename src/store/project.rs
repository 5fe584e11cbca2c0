//! Locating the directory a project lives in.
//!
//! Projects live either under the inbox staging root (freshly ingested,
//! pending triage) or under the general root. New projects always start in
//! the inbox root.

use std::path::{Path, PathBuf};

/// The two roots a project can live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoots {
    /// Staging root for new projects (`<general>/<inbox_folder>`).
    pub inbox: PathBuf,
    /// General project root.
    pub general: PathBuf,
}

impl ProjectRoots {
    /// Build the roots from the general root and the inbox folder name.
    pub fn new(general: impl Into<PathBuf>, inbox_folder: &str) -> Self {
        let general = general.into();
        Self {
            inbox: general.join(inbox_folder),
            general,
        }
    }
}

/// Where a project resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The root the project lives (or will live) under.
    pub root: PathBuf,
    /// `root/<project_name>`.
    pub project_dir: PathBuf,
    /// `true` when the project exists under neither root yet.
    pub created: bool,
}

/// Resolve `project_name` against the inbox root first, then the general root.
///
/// Only checks for existing directories; creating the project is left to the
/// artifact writer. Never fails.
pub fn resolve(project_name: &str, roots: &ProjectRoots) -> Resolution {
    for root in [&roots.inbox, &roots.general] {
        let candidate = root.join(project_name);
        if candidate.is_dir() {
            tracing::debug!(project = project_name, root = %root.display(), "Found existing project");
            return Resolution {
                root: root.clone(),
                project_dir: candidate,
                created: false,
            };
        }
    }

    tracing::debug!(project = project_name, "New project, placing it in the inbox root");
    Resolution {
        root: roots.inbox.clone(),
        project_dir: roots.inbox.join(project_name),
        created: true,
    }
}

/// `true` if `path` is a visible directory (name not starting with `.`).
pub(crate) fn is_visible_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| !n.starts_with('.'))
}
