use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::diff::unified_diff;
use super::filename::{numbered_candidates, stem_for_task};
use crate::error::WorkspaceError;

/// Directory names never shown to the model.
const HIDDEN_DIRS: &[&str] = &[".git"];

/// Sole owner of filesystem access for the agent.
///
/// Every path, for reads and writes alike, is resolved against the workspace
/// root and rejected if it escapes it.
pub struct WorkspaceGuard {
    /// Canonical (absolute, symlinks resolved) workspace root.
    canonical_root: PathBuf,
    /// Extension (without dot) given to synthesized filenames.
    script_extension: String,
}

impl WorkspaceGuard {
    /// Create a new guard for the given workspace path.
    /// Creates the directory if it doesn't exist and resolves to canonical path.
    pub fn new(workspace_path: &Path, script_extension: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(workspace_path)?;
        let canonical_root = std::fs::canonicalize(workspace_path)?;
        Ok(Self {
            canonical_root,
            script_extension: script_extension.to_string(),
        })
    }

    /// Get the canonical workspace root path.
    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    /// Resolve a model-supplied path to an absolute path inside the root.
    ///
    /// Relative paths are joined to the root; absolute paths must already lie
    /// under it. `..` components are folded lexically and may not climb above
    /// the root. Symlinks are checked by canonicalizing the deepest existing
    /// ancestor.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let denied = || WorkspaceError::AccessDenied {
            path: path.to_string(),
            workspace: self.canonical_root.clone(),
        };

        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(denied());
        }

        let requested = Path::new(trimmed);
        let (mut resolved, rest) = if requested.is_absolute() {
            (PathBuf::new(), requested)
        } else {
            (self.canonical_root.clone(), requested)
        };

        for component in rest.components() {
            match component {
                Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
                Component::RootDir => resolved.push(Component::RootDir.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(denied());
                    }
                }
                Component::Normal(part) => resolved.push(part),
            }
        }

        if !resolved.starts_with(&self.canonical_root) {
            tracing::warn!(path, "Rejected path outside workspace");
            return Err(denied());
        }

        // A symlink inside the root may still point outside it.
        let mut probe = resolved.as_path();
        while probe.symlink_metadata().is_err() {
            match probe.parent() {
                Some(parent) => probe = parent,
                None => break,
            }
        }
        let canonical_probe = std::fs::canonicalize(probe).map_err(|_| denied())?;
        if !canonical_probe.starts_with(&self.canonical_root) {
            tracing::warn!(path, "Rejected symlink escaping workspace");
            return Err(denied());
        }

        Ok(resolved)
    }

    /// Path of `absolute` relative to the root, with `/` separators.
    pub fn relative(&self, absolute: &Path) -> String {
        let rel = absolute.strip_prefix(&self.canonical_root).unwrap_or(absolute);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read a file inside the workspace.
    pub fn read(&self, path: &str) -> Result<String, WorkspaceError> {
        let full_path = self.resolve_path(path)?;
        if !full_path.is_file() {
            return Err(WorkspaceError::NotFound {
                path: path.to_string(),
            });
        }
        std::fs::read_to_string(&full_path).map_err(|source| WorkspaceError::Io {
            path: path.to_string(),
            source,
        })
    }

    /// True if `path` resolves inside the workspace and names an existing file.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve_path(path)
            .map(|full| full.is_file())
            .unwrap_or(false)
    }

    /// Unified diff of `new_content` against the current file, or against
    /// empty content when the file does not exist yet.
    pub fn diff(&self, path: &str, new_content: &str) -> Result<String, WorkspaceError> {
        let current = match self.read(path) {
            Ok(content) => content,
            Err(WorkspaceError::NotFound { .. }) => String::new(),
            Err(e) => return Err(e),
        };
        Ok(unified_diff(path, &current, new_content))
    }

    /// Write `content` to `path`, creating parent directories.
    ///
    /// Does not ask for approval; callers must have obtained it.
    pub fn write(&self, path: &str, content: &str) -> Result<PathBuf, WorkspaceError> {
        let full_path = self.resolve_path(path)?;
        let io_err = |source| WorkspaceError::Io {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut data = content.to_string();
        if !data.is_empty() && !data.ends_with('\n') {
            data.push('\n');
        }
        std::fs::write(&full_path, data).map_err(io_err)?;

        tracing::info!(path, bytes = content.len(), "Wrote file");
        Ok(full_path)
    }

    /// Sorted relative paths of files and directories up to `max_depth`
    /// separators deep, excluding version-control metadata.
    pub fn list_tree(&self, max_depth: usize) -> Vec<String> {
        let mut paths: Vec<String> = WalkDir::new(&self.canonical_root)
            .min_depth(1)
            .max_depth(max_depth + 1)
            .into_iter()
            .filter_entry(|entry| {
                !HIDDEN_DIRS
                    .iter()
                    .any(|hidden| entry.file_name() == std::ffi::OsStr::new(hidden))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(self.relative(entry.path())),
                Err(e) => {
                    tracing::debug!("Skipping unreadable tree entry: {e}");
                    None
                }
            })
            .collect();
        paths.sort();
        paths
    }

    /// Synthesize an unused filename at the workspace root from task text.
    ///
    /// `reserved` holds relative paths already claimed this round; they count
    /// as collisions alongside files on disk.
    pub fn suggest_filename(&self, task_text: &str, reserved: &BTreeSet<String>) -> String {
        self.suggest_filename_in("", task_text, reserved)
    }

    /// Like [`suggest_filename`](Self::suggest_filename) but inside the
    /// relative directory `dir` (empty for the root).
    pub fn suggest_filename_in(
        &self,
        dir: &str,
        task_text: &str,
        reserved: &BTreeSet<String>,
    ) -> String {
        let stem = stem_for_task(task_text);
        numbered_candidates(&stem, &self.script_extension)
            .map(|name| match dir.trim_matches('/') {
                "" => name,
                dir => format!("{dir}/{name}"),
            })
            .find(|candidate| !reserved.contains(candidate) && !self.occupied(candidate))
            .unwrap_or_else(|| format!("{stem}.{}", self.script_extension))
    }

    fn occupied(&self, path: &str) -> bool {
        self.resolve_path(path)
            .map(|full| full.exists())
            .unwrap_or(true)
    }
}
