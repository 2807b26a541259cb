//! The sandboxed file workspace every file-touching tool works in.
//!
//! All paths are relative to a single data root and are resolved through
//! `scout_security::contain_path`, so nothing the model asks for can reach
//! outside it. Operations are self-contained reads or writes with no state
//! carried between calls, which makes a shared `Arc<Workspace>` safe for
//! concurrent requests.

use chrono::{DateTime, Utc};
use scout_security::{contain_path, relative_display, PathValidationError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directories created at startup and shown in the prompt's file snapshot.
pub const WELL_KNOWN_DIRS: &[(&str, &str)] = &[
    ("", "Root"),
    ("knowledge_base", "Knowledge Base"),
    ("output", "Output"),
    ("output/case_studies", "Case Studies"),
    ("output/emails", "Email Drafts"),
    ("output/slides", "Slides"),
    ("output/context", "Context Files"),
    ("logs", "Logs"),
];

/// Text files larger than this are skipped by content search.
const SEARCH_CONTENT_LIMIT: u64 = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error(transparent)]
    Path(#[from] PathValidationError),

    #[error("Path does not exist: {0}")]
    NotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Text '{0}' not found in file")]
    TextNotFound(String),

    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace task failed: {0}")]
    Task(String),
}

impl FsError {
    fn io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Wire shape of a workspace operation: `{ok: true, ...body}` or
/// `{ok: false, error}`.
#[derive(Debug, Serialize)]
pub struct FsResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub body: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> From<FsResult<T>> for FsResponse<T> {
    fn from(result: FsResult<T>) -> Self {
        match result {
            Ok(body) => Self {
                ok: true,
                body: Some(body),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                body: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Root-relative, `/`-separated
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub path: String,
    pub files: Vec<FileEntry>,
    pub directories: Vec<FileEntry>,
    pub total_files: usize,
    pub total_directories: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub path: String,
    /// `None` for binary files
    pub content: Option<String>,
    pub size: u64,
    pub mime_type: String,
    pub is_binary: bool,
    pub encoding: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Write,
    Append,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub path: String,
    pub size: u64,
    pub mode: WriteMode,
    pub encoding: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditReceipt {
    pub path: String,
    pub old_text: String,
    pub new_text: String,
    pub replacements: usize,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Filename,
    Content,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub search_path: String,
    pub matches: Vec<SearchMatch>,
    pub total_matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Removal {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub path: String,
}

/// A directory tree rooted at `data_root`.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (and create if needed) the workspace with its standard layout.
    pub fn open(root: impl AsRef<Path>) -> FsResult<Self> {
        let root = root.as_ref();
        for (dir, _) in WELL_KNOWN_DIRS {
            let path = root.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| FsError::io(&path.display().to_string(), e))?;
        }
        let root = root
            .canonicalize()
            .map_err(|e| FsError::io(&root.display().to_string(), e))?;
        info!(root = %root.display(), "Workspace ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path inside the root.
    pub fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        Ok(contain_path(&self.root, path)?)
    }

    fn relative(&self, path: &Path) -> String {
        relative_display(&self.root, path)
    }

    /// List a directory. Dotfiles are skipped unless `include_hidden`.
    pub async fn list_files(&self, path: &str, include_hidden: bool) -> FsResult<Listing> {
        let dir = self.resolve(path)?;
        let meta = tokio::fs::metadata(&dir).await.map_err(|e| FsError::io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }

        let mut files = Vec::new();
        let mut directories = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| FsError::io(path, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| FsError::io(path, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !include_hidden && name.starts_with('.') {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let item = self.entry(&entry.path(), name, &meta);
            match item.kind {
                EntryKind::Directory => directories.push(item),
                EntryKind::File => files.push(item),
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        directories.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(path, files = files.len(), dirs = directories.len(), "Listed directory");
        Ok(Listing {
            path: self.relative(&dir),
            total_files: files.len(),
            total_directories: directories.len(),
            files,
            directories,
        })
    }

    fn entry(&self, path: &Path, name: String, meta: &std::fs::Metadata) -> FileEntry {
        let kind = if meta.is_dir() { EntryKind::Directory } else { EntryKind::File };
        FileEntry {
            mime_type: match kind {
                EntryKind::File => Some(guess_mime(path).unwrap_or("application/octet-stream").to_string()),
                EntryKind::Directory => None,
            },
            name,
            path: self.relative(path),
            size: if kind == EntryKind::File { meta.len() } else { 0 },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            kind,
        }
    }

    /// Read a file as UTF-8 text; binary files report `is_binary` with no content.
    pub async fn read_file(&self, path: &str) -> FsResult<FileContent> {
        let file = self.resolve(path)?;
        let meta = tokio::fs::metadata(&file).await.map_err(|e| FsError::io(path, e))?;
        if !meta.is_file() {
            return Err(FsError::NotAFile(path.to_string()));
        }

        let mime = guess_mime(&file);
        let known_binary = mime.is_some_and(|m| !is_text_mime(m));
        let content = if known_binary {
            None
        } else {
            let bytes = tokio::fs::read(&file).await.map_err(|e| FsError::io(path, e))?;
            String::from_utf8(bytes).ok()
        };

        Ok(FileContent {
            path: self.relative(&file),
            is_binary: content.is_none(),
            content,
            size: meta.len(),
            mime_type: mime.unwrap_or("text/plain").to_string(),
            encoding: "utf-8",
        })
    }

    /// Write or append text, creating parent directories.
    pub async fn write_file(&self, path: &str, content: &str, append: bool) -> FsResult<WriteReceipt> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| FsError::io(path, e))?;
        }

        if append {
            use tokio::io::AsyncWriteExt;
            let mut handle = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file)
                .await
                .map_err(|e| FsError::io(path, e))?;
            handle.write_all(content.as_bytes()).await.map_err(|e| FsError::io(path, e))?;
            handle.flush().await.map_err(|e| FsError::io(path, e))?;
        } else {
            tokio::fs::write(&file, content).await.map_err(|e| FsError::io(path, e))?;
        }

        let size = tokio::fs::metadata(&file).await.map_err(|e| FsError::io(path, e))?.len();
        info!(path = %self.relative(&file), size, append, "Wrote file");
        Ok(WriteReceipt {
            path: self.relative(&file),
            size,
            mode: if append { WriteMode::Append } else { WriteMode::Write },
            encoding: "utf-8",
        })
    }

    /// Replace every occurrence of `old_text` with `new_text`.
    pub async fn edit_file(&self, path: &str, old_text: &str, new_text: &str) -> FsResult<EditReceipt> {
        let file = self.resolve(path)?;
        let content = match tokio::fs::read_to_string(&file).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::NotFound(path.to_string()));
            }
            Err(e) => return Err(FsError::io(path, e)),
        };

        let replacements = if old_text.is_empty() { 0 } else { content.matches(old_text).count() };
        if replacements == 0 {
            return Err(FsError::TextNotFound(old_text.to_string()));
        }

        let updated = content.replace(old_text, new_text);
        tokio::fs::write(&file, &updated).await.map_err(|e| FsError::io(path, e))?;
        info!(path = %self.relative(&file), replacements, "Edited file");

        Ok(EditReceipt {
            path: self.relative(&file),
            old_text: old_text.to_string(),
            new_text: new_text.to_string(),
            replacements,
            size: updated.len() as u64,
        })
    }

    /// Recursive, case-insensitive search: filename matches first, then
    /// text-file content matches.
    pub async fn search_files(&self, query: &str, path: &str) -> FsResult<SearchReport> {
        let dir = self.resolve(path)?;
        let meta = tokio::fs::metadata(&dir).await.map_err(|e| FsError::io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }

        let root = self.root.clone();
        let needle = query.to_lowercase();
        let matches = tokio::task::spawn_blocking(move || scan_tree(&root, &dir, &needle))
            .await
            .map_err(|e| FsError::Task(e.to_string()))?;

        Ok(SearchReport {
            query: query.to_string(),
            search_path: path.to_string(),
            total_matches: matches.len(),
            matches,
        })
    }

    /// Remove a file, or a directory only when it is empty.
    pub async fn delete(&self, path: &str) -> FsResult<Removal> {
        let target = self.resolve(path)?;
        if target == self.root {
            return Err(FsError::DirectoryNotEmpty(String::new()));
        }
        let meta = tokio::fs::metadata(&target).await.map_err(|e| FsError::io(path, e))?;
        let kind = if meta.is_dir() {
            let mut entries = tokio::fs::read_dir(&target).await.map_err(|e| FsError::io(path, e))?;
            if entries.next_entry().await.map_err(|e| FsError::io(path, e))?.is_some() {
                return Err(FsError::DirectoryNotEmpty(path.to_string()));
            }
            tokio::fs::remove_dir(&target).await.map_err(|e| FsError::io(path, e))?;
            EntryKind::Directory
        } else {
            tokio::fs::remove_file(&target).await.map_err(|e| FsError::io(path, e))?;
            EntryKind::File
        };
        info!(path, "Deleted");
        Ok(Removal {
            path: self.relative(&target),
            kind,
        })
    }

    pub async fn create_directory(&self, path: &str) -> FsResult<Created> {
        let dir = self.resolve(path)?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| FsError::io(path, e))?;
        Ok(Created {
            path: self.relative(&dir),
        })
    }

    pub async fn file_info(&self, path: &str) -> FsResult<FileEntry> {
        let target = self.resolve(path)?;
        let meta = tokio::fs::metadata(&target).await.map_err(|e| FsError::io(path, e))?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.entry(&target, name, &meta))
    }
}

fn scan_tree(root: &Path, dir: &Path, needle: &str) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();

        let match_type = if name.to_lowercase().contains(needle) {
            Some(MatchType::Filename)
        } else if meta.len() <= SEARCH_CONTENT_LIMIT
            && guess_mime(entry.path()).is_none_or(is_text_mime)
            && std::fs::read_to_string(entry.path())
                .map(|text| text.to_lowercase().contains(needle))
                .unwrap_or(false)
        {
            Some(MatchType::Content)
        } else {
            None
        };

        if let Some(match_type) = match_type {
            matches.push(SearchMatch {
                path: relative_display(root, entry.path()),
                name,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                match_type,
            });
        }
    }
    matches
}

/// MIME type from the file extension, if it is one we recognize.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/x-yaml",
        "toml" => "application/toml",
        "js" => "text/javascript",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "zip" => "application/zip",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    };
    Some(mime)
}

fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "application/xml" | "application/x-yaml" | "application/toml"
        )
}
