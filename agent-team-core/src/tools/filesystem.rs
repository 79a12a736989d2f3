use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::tools::registry::ToolRegistry;
use crate::tools::schema::{ParamSpec, ParamType, ToolSignature};
use crate::tools::types::{required_str, Tool, ToolContext};

pub const FILE_CATEGORY: &str = "file";

const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;
const MAX_WRITE_BYTES: usize = 50 * 1024 * 1024;

/// Directory the file tools are confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens the workspace, creating the directory when it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|err| {
            Error::Config(format!(
                "failed to create workspace '{}': {err}",
                path.display()
            ))
        })?;
        let root = fs::canonicalize(path).map_err(|err| {
            Error::Config(format!(
                "failed to canonicalize workspace '{}': {err}",
                path.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    let _ = normalized.pop();
                }
                _ => normalized.push(component.as_os_str()),
            }
        }
        normalized
    }

    /// Resolves `raw_path` against the root and rejects anything that lands
    /// outside it, including through symlinks.
    pub fn resolve(&self, raw_path: &str) -> Result<PathBuf> {
        if raw_path.trim().is_empty() {
            return Err(Error::Tool("path must be non-empty".to_owned()));
        }

        let raw = Path::new(raw_path);
        let candidate = if raw.is_absolute() {
            Self::normalize_path(raw)
        } else {
            Self::normalize_path(&self.root.join(raw))
        };

        let mut existing = candidate.as_path();
        let mut missing = Vec::new();
        // symlink_metadata so a dangling link stops the walk instead of
        // being treated as a missing file.
        while fs::symlink_metadata(existing).is_err() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut effective = fs::canonicalize(existing).map_err(|err| {
            let dangling = fs::symlink_metadata(existing)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false);
            if dangling {
                Error::Tool(format!(
                    "path '{raw_path}' is a symlink whose target does not exist"
                ))
            } else {
                Error::Tool(format!(
                    "failed to canonicalize path '{}': {err}",
                    existing.display()
                ))
            }
        })?;
        for name in missing.iter().rev() {
            effective.push(name);
        }

        if !effective.starts_with(&self.root) {
            return Err(Error::Tool(format!(
                "path '{raw_path}' is outside the workspace"
            )));
        }

        Ok(effective)
    }
}

pub fn register_file_tools(registry: &mut ToolRegistry, workspace: &Workspace) -> Result<()> {
    registry.register(
        "read_file",
        Arc::new(ReadFileTool {
            workspace: workspace.clone(),
        }),
        [FILE_CATEGORY],
    )?;
    registry.register(
        "write_file",
        Arc::new(WriteFileTool {
            workspace: workspace.clone(),
        }),
        [FILE_CATEGORY],
    )?;
    registry.register(
        "list_directory",
        Arc::new(ListDirectoryTool {
            workspace: workspace.clone(),
        }),
        [FILE_CATEGORY],
    )
}

pub struct ReadFileTool {
    workspace: Workspace,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn signature(&self) -> ToolSignature {
        ToolSignature::new(
            "read_file",
            "Read the contents of a file.",
            vec![ParamSpec::new("path", ParamType::String)],
        )
    }

    async fn call(&self, _context: &ToolContext, args: Map<String, Value>) -> Result<Value> {
        let path = self.workspace.resolve(required_str(&args, "path")?)?;
        let metadata = fs::metadata(&path).map_err(|err| {
            Error::Tool(format!(
                "failed to read metadata for '{}': {err}",
                path.display()
            ))
        })?;
        if metadata.len() > MAX_READ_BYTES {
            return Err(Error::Tool(format!(
                "file '{}' is too large to read ({} bytes, limit {} bytes)",
                path.display(),
                metadata.len(),
                MAX_READ_BYTES
            )));
        }

        let content = fs::read_to_string(&path)
            .map_err(|err| Error::Tool(format!("failed to read '{}': {err}", path.display())))?;
        Ok(Value::String(content))
    }
}

pub struct WriteFileTool {
    workspace: Workspace,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn signature(&self) -> ToolSignature {
        ToolSignature::new(
            "write_file",
            "Write content to a file.",
            vec![
                ParamSpec::new("path", ParamType::String),
                ParamSpec::new("content", ParamType::String),
            ],
        )
    }

    async fn call(&self, _context: &ToolContext, args: Map<String, Value>) -> Result<Value> {
        let path = self.workspace.resolve(required_str(&args, "path")?)?;
        let content = required_str(&args, "content")?;
        if content.len() > MAX_WRITE_BYTES {
            return Err(Error::Tool(format!(
                "write payload is too large ({} bytes, limit {} bytes)",
                content.len(),
                MAX_WRITE_BYTES
            )));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::Tool(format!(
                    "failed to create parent directories for '{}': {err}",
                    path.display()
                ))
            })?;
        }

        fs::write(&path, content)
            .map_err(|err| Error::Tool(format!("failed to write '{}': {err}", path.display())))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "file written");
        Ok(Value::String("File written successfully.".to_owned()))
    }
}

pub struct ListDirectoryTool {
    workspace: Workspace,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn signature(&self) -> ToolSignature {
        ToolSignature::new(
            "list_directory",
            "List the entries of a directory.",
            vec![ParamSpec::new("path", ParamType::String)],
        )
    }

    async fn call(&self, _context: &ToolContext, args: Map<String, Value>) -> Result<Value> {
        let path = self.workspace.resolve(required_str(&args, "path")?)?;
        let entries = fs::read_dir(&path)
            .map_err(|err| Error::Tool(format!("failed to list '{}': {err}", path.display())))?;

        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::Tool(format!("failed to read entry in '{}': {err}", path.display()))
            })?;
            let kind = match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => "directory",
                Ok(file_type) if file_type.is_symlink() => "symlink",
                _ => "file",
            };
            listing.push((entry.file_name().to_string_lossy().into_owned(), kind));
        }
        listing.sort();

        Ok(Value::Array(
            listing
                .into_iter()
                .map(|(name, kind)| json!({ "name": name, "type": kind }))
                .collect(),
        ))
    }
}
