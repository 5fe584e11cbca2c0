//! Read-only listing of projects and stored messages.

use std::path::PathBuf;

use crate::error::{ConvertError, Result};
use crate::store::project::{is_visible_dir, resolve, ProjectRoots};

/// A project directory found under one of the roots.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProjectEntry {
    pub name: String,
    pub path: PathBuf,
    /// `true` if the project lives under the inbox root.
    pub in_inbox: bool,
}

/// A stored Markdown message inside a project.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactEntry {
    pub filename: String,
    pub size_bytes: u64,
}

/// List every project under both roots, sorted by name.
///
/// Hidden directories and the inbox folder itself are skipped. A missing
/// root simply contributes nothing.
pub fn list_projects(roots: &ProjectRoots) -> Result<Vec<ProjectEntry>> {
    let mut projects = Vec::new();

    for (root, in_inbox) in [(&roots.inbox, true), (&roots.general, false)] {
        if !root.is_dir() {
            continue;
        }
        let entries = std::fs::read_dir(root).map_err(|e| ConvertError::io(root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ConvertError::io(root, e))?;
            let path = entry.path();
            if !is_visible_dir(&path) || path == roots.inbox {
                continue;
            }
            projects.push(ProjectEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                in_inbox,
            });
        }
    }

    projects.sort_by(|a, b| a.name.cmp(&b.name).then(b.in_inbox.cmp(&a.in_inbox)));
    Ok(projects)
}

/// List the Markdown messages of a project, sorted by filename.
///
/// Fails with [`ConvertError::ProjectNotFound`] if the project exists under neither root.
pub fn list_artifacts(project_name: &str, roots: &ProjectRoots) -> Result<Vec<ArtifactEntry>> {
    let resolution = resolve(project_name, roots);
    if resolution.created {
        return Err(ConvertError::ProjectNotFound(project_name.to_string()));
    }

    let dir = &resolution.project_dir;
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| ConvertError::io(dir, e))? {
        let entry = entry.map_err(|e| ConvertError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let size_bytes = entry
            .metadata()
            .map_err(|e| ConvertError::io(&path, e))?
            .len();
        artifacts.push(ArtifactEntry {
            filename: entry.file_name().to_string_lossy().into_owned(),
            size_bytes,
        });
    }

    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(artifacts)
}
