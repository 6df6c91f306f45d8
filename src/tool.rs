//! File-editing tools built on the matching engine.
//!
//! These wrap [`apply_edit_with_options`](crate::apply_edit_with_options) the
//! way an agent runtime needs it: paths are resolved against a repository
//! root and refused if they escape it, content is read and written through a
//! [`FileStore`], and results come back as a short transcript line plus
//! structured metadata.

use crate::{apply_edit_with_options, trim_diff, EditError, EditOptions};
use log::{debug, info, trace};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Where the repository is checked out inside a sandbox.
pub const DEFAULT_REPO_PATH: &str = "/home/user/repo";

/// Represents the errors the file tools can report.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The request did not name a file.
    #[error("file_path is required")]
    MissingFilePath,
    /// The path resolves outside the repository root.
    #[error("File path must be within repository directory: {}", .root.display())]
    OutsideRepository { path: PathBuf, root: PathBuf },
    /// The file to edit does not exist.
    #[error("File {} not found", .0.display())]
    FileNotFound(PathBuf),
    /// The user does not have permission to read or write to the specified path.
    #[error("Permission denied for path: {path:?}")]
    PermissionDenied { path: PathBuf },
    /// The target path exists but is a directory, not a file.
    #[error("Target path is a directory, not a file: {path:?}")]
    TargetIsDirectory { path: PathBuf },
    /// Any other I/O failure while reading or writing.
    #[error("I/O error while processing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The edit itself was rejected by the matching engine.
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Converts a `std::io::Error` into a more specific `ToolError`.
fn map_io_error(path: PathBuf, e: std::io::Error) -> ToolError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::FileNotFound(path),
        std::io::ErrorKind::PermissionDenied => ToolError::PermissionDenied { path },
        std::io::ErrorKind::IsADirectory => ToolError::TargetIsDirectory { path },
        _ => ToolError::Io { path, source: e },
    }
}

/// A tool-supplied path after it has been checked against the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The repository root, in the same form as `path`.
    pub root: PathBuf,
    /// The full path of the file.
    pub path: PathBuf,
}

impl ResolvedPath {
    /// The path relative to the repository root.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(self.path.as_path())
    }
}

/// Storage the tools read files from and write them back to.
///
/// In an agent deployment this is the sandbox's remote filesystem. The
/// engine never talks to it directly; only [`EditTool`] does, and only after
/// an edit has been accepted.
pub trait FileStore {
    /// Resolves `file_path` against `repo_root`, refusing anything that ends
    /// up outside it.
    ///
    /// The default only looks at the path text (see [`resolve_sandbox_path`]).
    /// Stores that can see links should override it and check where the path
    /// really leads.
    fn resolve(&self, repo_root: &Path, file_path: &str) -> Result<ResolvedPath, ToolError> {
        let (root, inside) = split_at_root(repo_root, file_path)?;
        Ok(ResolvedPath {
            path: join_inside(&root, &inside),
            root,
        })
    }
    /// Reads the full text of the file at `path`.
    fn read(&self, path: &Path) -> Result<String, ToolError>;
    /// Replaces the file at `path` with `content`, creating it if needed.
    fn write(&self, path: &Path, content: &str) -> Result<(), ToolError>;
}

/// A [`FileStore`] backed by the local filesystem.
///
/// Paths are resolved through the filesystem: the root and the deepest
/// existing part of the target are canonicalized, so a symlink inside the
/// repository cannot lead an edit outside of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn resolve(&self, repo_root: &Path, file_path: &str) -> Result<ResolvedPath, ToolError> {
        let (_, inside) = split_at_root(repo_root, file_path)?;
        let base =
            fs::canonicalize(repo_root).map_err(|e| map_io_error(repo_root.to_path_buf(), e))?;
        trace!(
            "  Checking '{}' against canonical root '{}'",
            inside.display(),
            base.display()
        );

        // Walk up to the deepest entry that exists. Everything below it is
        // created by the write, so it cannot be a link.
        let mut existing = join_inside(&base, &inside);
        let mut missing = Vec::new();
        while fs::symlink_metadata(&existing).is_err() {
            let Some(name) = existing.file_name().map(|name| name.to_os_string()) else {
                break;
            };
            missing.push(name);
            existing.pop();
        }

        let canonical = fs::canonicalize(&existing).map_err(|e| match e.kind() {
            // A dangling link: there is no way to tell where a write would land.
            std::io::ErrorKind::NotFound => ToolError::OutsideRepository {
                path: existing.clone(),
                root: repo_root.to_path_buf(),
            },
            _ => map_io_error(existing.clone(), e),
        })?;
        let path = missing
            .iter()
            .rev()
            .fold(canonical, |path, name| path.join(name));

        if !path.starts_with(&base) {
            debug!(
                "  '{}' leads to '{}', outside '{}'",
                file_path,
                path.display(),
                base.display()
            );
            return Err(ToolError::OutsideRepository {
                path,
                root: repo_root.to_path_buf(),
            });
        }
        Ok(ResolvedPath { root: base, path })
    }

    fn read(&self, path: &Path) -> Result<String, ToolError> {
        if path.is_dir() {
            return Err(ToolError::TargetIsDirectory {
                path: path.to_path_buf(),
            });
        }
        fs::read_to_string(path).map_err(|e| map_io_error(path.to_path_buf(), e))
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), ToolError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io_error(parent.to_path_buf(), e))?;
        }
        fs::write(path, content).map_err(|e| map_io_error(path.to_path_buf(), e))
    }
}

/// Normalizes a path without touching the filesystem: `.` is dropped and
/// `..` removes the previous component. Leading `..` of a relative path are
/// kept, and `..` at the filesystem root is ignored.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Splits a tool-supplied path into the normalized root and the part below
/// it. The part below may only contain plain names.
fn split_at_root(repo_root: &Path, file_path: &str) -> Result<(PathBuf, PathBuf), ToolError> {
    let root = normalize_lexically(repo_root);
    let joined = if file_path.is_empty() || file_path == "." {
        root.clone()
    } else {
        let path = Path::new(file_path);
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&root.join(path))
        }
    };

    let inside = joined
        .strip_prefix(&root)
        .ok()
        .filter(|rest| {
            rest.components()
                .all(|component| matches!(component, Component::Normal(_)))
        })
        .map(Path::to_path_buf);
    match inside {
        Some(inside) => Ok((root, inside)),
        None => Err(ToolError::OutsideRepository {
            path: joined,
            root: repo_root.to_path_buf(),
        }),
    }
}

fn join_inside(root: &Path, inside: &Path) -> PathBuf {
    if inside.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(inside)
    }
}

/// Resolves a tool-supplied path against the repository root.
///
/// An empty path or `.` means the root itself, absolute paths are taken as
/// given and relative paths are joined to the root. Both the root and the
/// result are normalized without touching the filesystem (`.` is dropped,
/// `..` removes the previous component) and the result must stay inside the
/// root. Links are not followed; [`LocalFileStore`] does that on top.
///
/// # Example
///
/// ```
/// # use fuzzedit::tool::{resolve_sandbox_path, ToolError};
/// # use std::path::{Path, PathBuf};
/// let root = Path::new("/home/user/repo");
///
/// assert_eq!(
///     resolve_sandbox_path(root, "src/main.rs").unwrap(),
///     PathBuf::from("/home/user/repo/src/main.rs")
/// );
/// assert_eq!(resolve_sandbox_path(root, ".").unwrap(), PathBuf::from("/home/user/repo"));
/// assert_eq!(
///     resolve_sandbox_path(Path::new("./repo"), "a.txt").unwrap(),
///     PathBuf::from("repo/a.txt")
/// );
/// assert!(matches!(
///     resolve_sandbox_path(root, "../secret.txt"),
///     Err(ToolError::OutsideRepository { .. })
/// ));
/// assert!(matches!(
///     resolve_sandbox_path(root, "/home/user/repo-other/file"),
///     Err(ToolError::OutsideRepository { .. })
/// ));
/// ```
pub fn resolve_sandbox_path(repo_root: &Path, file_path: &str) -> Result<PathBuf, ToolError> {
    let (root, inside) = split_at_root(repo_root, file_path)?;
    let resolved = join_inside(&root, &inside);
    trace!("  Resolved '{}' to '{}'", file_path, resolved.display());
    Ok(resolved)
}

/// A request to replace text in a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditRequest {
    /// The file to modify, absolute or relative to the repository root.
    pub file_path: String,
    /// The text to replace. Empty means "replace the whole file".
    pub old_string: String,
    /// The text to replace it with. Must differ from `old_string`.
    pub new_string: String,
    /// Replace every occurrence instead of requiring a unique one.
    pub replace_all: bool,
}

impl EditRequest {
    /// Creates a request that replaces a single occurrence.
    pub fn new(
        file_path: impl Into<String>,
        old_string: impl Into<String>,
        new_string: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            old_string: old_string.into(),
            new_string: new_string.into(),
            replace_all: false,
        }
    }

    /// Sets whether every occurrence should be replaced.
    pub fn replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = replace_all;
        self
    }
}

/// Before/after snapshot of an edited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// The full path of the edited file.
    pub file: PathBuf,
    /// The content before the edit. Empty on the whole-file path.
    pub before: String,
    /// The content after the edit.
    pub after: String,
    /// Lines added.
    pub additions: usize,
    /// Lines removed.
    pub deletions: usize,
}

/// Structured details of an edit, alongside the transcript text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMetadata {
    /// The de-indented unified diff of the change.
    pub diff: String,
    /// Before/after snapshot of the file.
    pub filediff: FileDiff,
}

/// What the edit tool reports back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutput {
    /// The edited file, relative to the repository root.
    pub title: String,
    /// The transcript line, followed by the diff when there is one.
    pub output: String,
    pub metadata: EditMetadata,
}

/// Structured details of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMetadata {
    /// The full path of the written file.
    pub filepath: PathBuf,
    /// Whether the file existed before it was written.
    pub exists: bool,
}

/// What the write tool reports back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutput {
    /// The written file, relative to the repository root.
    pub title: String,
    /// The transcript line: "File created: ..." or "File overwritten: ...".
    pub output: String,
    /// Where the file went and whether it was there before.
    pub metadata: WriteMetadata,
}

/// The edit and write tools, bound to a file store and a repository root.
#[derive(Debug, Clone)]
pub struct EditTool<S> {
    store: S,
    repo_root: PathBuf,
    dry_run: bool,
}

impl<S: FileStore> EditTool<S> {
    /// Creates tools that operate on files under `repo_root`.
    pub fn new(store: S, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            repo_root: repo_root.into(),
            dry_run: false,
        }
    }

    /// If `true`, edits are computed and reported but never written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The repository root paths are resolved against.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// The underlying file store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces text in a file and writes the result back.
    ///
    /// The file is only written once the edit has been accepted, so a
    /// rejected edit leaves it untouched. An empty `old_string` skips reading
    /// and writes `new_string` as the whole file.
    ///
    /// # Example
    ///
    /// ```
    /// # use fuzzedit::tool::{EditRequest, EditTool, LocalFileStore};
    /// # use std::fs;
    /// # use tempfile::tempdir;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let dir = tempdir()?;
    /// fs::write(dir.path().join("hello.txt"), "Hello, world!\n")?;
    ///
    /// let tool = EditTool::new(LocalFileStore, dir.path());
    /// let output = tool.edit(&EditRequest::new("hello.txt", "world", "fuzzedit"))?;
    ///
    /// assert_eq!(output.title, "hello.txt");
    /// assert!(output.output.starts_with("File edited: hello.txt\n\n"));
    /// assert_eq!(fs::read_to_string(dir.path().join("hello.txt"))?, "Hello, fuzzedit!\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn edit(&self, request: &EditRequest) -> Result<EditOutput, ToolError> {
        if request.file_path.is_empty() {
            return Err(ToolError::MissingFilePath);
        }
        if request.old_string == request.new_string {
            return Err(EditError::InvalidRequest.into());
        }

        let resolved = self.store.resolve(&self.repo_root, &request.file_path)?;
        let title = resolved.relative().display().to_string();
        let full_path = resolved.path;
        info!("Editing: {}", full_path.display());

        let before = if request.old_string.is_empty() {
            debug!("  Empty old_string. Writing the whole file.");
            String::new()
        } else {
            trace!("  Reading '{}'", full_path.display());
            self.store.read(&full_path)?
        };

        let options = EditOptions::builder()
            .replace_all(request.replace_all)
            .diff_label(full_path.display().to_string())
            .build();
        let result = apply_edit_with_options(
            &before,
            &request.old_string,
            &request.new_string,
            &options,
        )?;
        let diff = trim_diff(&result.diff);

        if self.dry_run {
            info!("  DRY RUN: Would write changes to '{}'", full_path.display());
        } else {
            self.store.write(&full_path, &result.new_content)?;
            info!("  Successfully wrote changes to '{}'", full_path.display());
        }

        let output = if diff.is_empty() {
            format!("File edited: {}", title)
        } else {
            format!("File edited: {}\n\n{}", title, diff)
        };

        Ok(EditOutput {
            title,
            output,
            metadata: EditMetadata {
                diff,
                filediff: FileDiff {
                    file: full_path,
                    before: result.original_content,
                    after: result.new_content,
                    additions: result.additions,
                    deletions: result.deletions,
                },
            },
        })
    }

    /// Writes `content` to a file, creating or overwriting it.
    pub fn write_file(&self, file_path: &str, content: &str) -> Result<WriteOutput, ToolError> {
        let resolved = self.store.resolve(&self.repo_root, file_path)?;
        let title = resolved.relative().display().to_string();
        let full_path = resolved.path;
        let exists = self.store.read(&full_path).is_ok();
        trace!(
            "  '{}' {}",
            full_path.display(),
            if exists { "exists" } else { "does not exist yet" }
        );

        if self.dry_run {
            info!("  DRY RUN: Would write '{}'", full_path.display());
        } else {
            self.store.write(&full_path, content)?;
            info!("  Wrote '{}'", full_path.display());
        }

        let output = if exists {
            format!("File overwritten: {}", title)
        } else {
            format!("File created: {}", title)
        };

        Ok(WriteOutput {
            title,
            output,
            metadata: WriteMetadata {
                filepath: full_path,
                exists,
            },
        })
    }
}

impl Default for EditTool<LocalFileStore> {
    fn default() -> Self {
        Self::new(LocalFileStore, DEFAULT_REPO_PATH)
    }
}
