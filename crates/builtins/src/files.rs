//! File management tools confined to a workspace directory.
//!
//! Filenames and glob patterns are interpreted relative to the workspace
//! root. Absolute paths and `..` components are rejected before any
//! filesystem access.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use runtime::{Arguments, ParamType, Renderer, Tool, ToolDeclaration, ToolError};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

/// The four file operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    CreateFile,
    ListFiles,
    SearchInFiles,
    GetFileSizes,
}

impl FileOperation {
    pub const ALL: [FileOperation; 4] = [
        Self::CreateFile,
        Self::ListFiles,
        Self::SearchInFiles,
        Self::GetFileSizes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateFile => "create_file",
            Self::ListFiles => "list_files",
            Self::SearchInFiles => "search_in_files",
            Self::GetFileSizes => "get_file_sizes",
        }
    }

    fn declaration(self) -> ToolDeclaration {
        let decl = ToolDeclaration::new(self.name(), self.description());
        match self {
            Self::CreateFile => decl
                .param("filename", ParamType::String, "Name of the file to create")
                .optional("content", ParamType::String, "Content to write to the file"),
            Self::ListFiles => decl.optional(
                "pattern",
                ParamType::String,
                "Glob pattern to match files (e.g. \"*.py\", \"*.txt\")",
            ),
            Self::SearchInFiles => decl
                .param("search_term", ParamType::String, "Term to search for")
                .optional("file_pattern", ParamType::String, "Pattern of files to search in"),
            Self::GetFileSizes => {
                decl.optional("pattern", ParamType::String, "Glob pattern to match files")
            }
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::CreateFile => "Creates a new file with optional content.",
            Self::ListFiles => "Lists files matching the given pattern.",
            Self::SearchInFiles => "Searches for a term in files matching the pattern.",
            Self::GetFileSizes => "Gets sizes of files matching the pattern.",
        }
    }
}

/// Root directory the file tools operate in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, ToolError> {
        check_relative(relative)?;
        Ok(self.root.join(relative))
    }

    /// Paths matching `pattern`, sorted.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, ToolError> {
        check_relative(pattern)?;
        Pattern::new(pattern)
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern {pattern:?}: {e}")))?;
        let root = Pattern::escape(&self.root.to_string_lossy());
        let full = format!("{}/{pattern}", root.trim_end_matches('/'));

        let entries = glob::glob_with(&full, MatchOptions::new())
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern {pattern:?}: {e}")))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable path");
                    None
                }
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn display(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn check_relative(path: &str) -> Result<(), ToolError> {
    if path.trim().is_empty() {
        return Err(ToolError::InvalidInput("path must not be empty".into()));
    }
    let escapes = Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ToolError::execution(format!(
            "{path} is outside the workspace"
        )));
    }
    Ok(())
}

fn default_pattern() -> String {
    "*".to_string()
}

#[derive(Debug, Deserialize)]
struct CreateFileArgs {
    filename: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PatternArgs {
    #[serde(default = "default_pattern")]
    pattern: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    search_term: String,
    #[serde(default = "default_pattern")]
    file_pattern: String,
}

/// One file operation bound to a workspace.
#[derive(Debug, Clone)]
pub struct FileTool {
    operation: FileOperation,
    workspace: Arc<Workspace>,
}

impl FileTool {
    pub fn new(operation: FileOperation, workspace: Arc<Workspace>) -> Self {
        Self {
            operation,
            workspace,
        }
    }

    fn create_file(&self, args: CreateFileArgs) -> Result<Value, ToolError> {
        let path = self.workspace.resolve(&args.filename)?;
        fs::write(&path, args.content.as_bytes())
            .map_err(|e| ToolError::execution(format!("{}: {e}", args.filename)))?;
        Ok(json!({
            "filename": args.filename,
            "bytes": args.content.len(),
            "message": format!("Successfully created file: {}", args.filename),
        }))
    }

    fn list_files(&self, args: PatternArgs) -> Result<Value, ToolError> {
        let files: Vec<String> = self
            .workspace
            .glob(&args.pattern)?
            .iter()
            .map(|p| self.workspace.display(p))
            .collect();
        Ok(json!({ "pattern": args.pattern, "files": files }))
    }

    fn search_in_files(&self, args: SearchArgs) -> Result<Value, ToolError> {
        let needle = args.search_term.to_lowercase();
        let mut matches = Map::new();
        for path in self.workspace.glob(&args.file_pattern)? {
            if !path.is_file() {
                continue;
            }
            let Ok(text) = fs::read_to_string(&path) else {
                debug!(path = %path.display(), "skipping unreadable file");
                continue;
            };
            let lines: Vec<Value> = text
                .lines()
                .filter(|line| line.to_lowercase().contains(&needle))
                .map(|line| Value::from(line.trim()))
                .collect();
            if !lines.is_empty() {
                matches.insert(self.workspace.display(&path), Value::Array(lines));
            }
        }
        Ok(json!({
            "search_term": args.search_term,
            "pattern": args.file_pattern,
            "matches": matches,
        }))
    }

    fn get_file_sizes(&self, args: PatternArgs) -> Result<Value, ToolError> {
        let mut files = Map::new();
        for path in self.workspace.glob(&args.pattern)? {
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.insert(
                self.workspace.display(&path),
                json!({ "bytes": metadata.len(), "formatted": format_size(metadata.len()) }),
            );
        }
        Ok(json!({ "pattern": args.pattern, "files": files }))
    }
}

impl Tool for FileTool {
    fn declaration(&self) -> ToolDeclaration {
        self.operation.declaration()
    }

    fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        match self.operation {
            FileOperation::CreateFile => self.create_file(args.parse()?),
            FileOperation::ListFiles => self.list_files(args.parse()?),
            FileOperation::SearchInFiles => self.search_in_files(args.parse()?),
            FileOperation::GetFileSizes => self.get_file_sizes(args.parse()?),
        }
    }
}

/// All file tools bound to `workspace`.
pub fn tools(workspace: Workspace) -> impl Iterator<Item = FileTool> {
    let workspace = Arc::new(workspace);
    FileOperation::ALL
        .into_iter()
        .map(move |op| FileTool::new(op, Arc::clone(&workspace)))
}

/// Human-readable size with two decimals.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Add the file tool formatters to `renderer`.
pub fn formatters(renderer: Renderer) -> Renderer {
    renderer
        .with_formatter(FileOperation::CreateFile.name(), format_created)
        .with_formatter(FileOperation::ListFiles.name(), format_listing)
        .with_formatter(FileOperation::SearchInFiles.name(), format_matches)
        .with_formatter(FileOperation::GetFileSizes.name(), format_sizes)
}

fn format_created(value: &Value) -> Option<String> {
    value["message"].as_str().map(String::from)
}

fn format_listing(value: &Value) -> Option<String> {
    let pattern = value["pattern"].as_str()?;
    let files = value["files"].as_array()?;
    if files.is_empty() {
        return Some(format!("No files found matching pattern: {pattern}"));
    }
    let mut out = String::from("Files found:");
    for file in files {
        out.push_str(&format!("\n- {}", file.as_str()?));
    }
    Some(out)
}

fn format_matches(value: &Value) -> Option<String> {
    let term = value["search_term"].as_str()?;
    let pattern = value["pattern"].as_str()?;
    let matches = value["matches"].as_object()?;
    if matches.is_empty() {
        return Some(format!(
            "No matches found for '{term}' in files matching '{pattern}'"
        ));
    }
    let mut blocks = Vec::with_capacity(matches.len());
    for (file, lines) in matches {
        let mut block = format!("In {file}:");
        for line in lines.as_array()? {
            block.push_str(&format!("\n  {}", line.as_str()?));
        }
        blocks.push(block);
    }
    Some(blocks.join("\n\n"))
}

fn format_sizes(value: &Value) -> Option<String> {
    let pattern = value["pattern"].as_str()?;
    let files = value["files"].as_object()?;
    if files.is_empty() {
        return Some(format!("No files found matching pattern: {pattern}"));
    }
    let mut out = String::from("File sizes:");
    for (file, size) in files {
        out.push_str(&format!("\n- {file}: {}", size["formatted"].as_str()?));
    }
    Some(out)
}
