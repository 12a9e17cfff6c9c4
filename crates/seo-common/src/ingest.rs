/// Folder ingestion: turns a picked set of files into one bounded text document.
///
/// Files are sorted by relative path, filtered by path markers, extension and size, then
/// concatenated behind `/* --- FILE: path --- */` markers until the total cap is reached.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Substrings that mark dependency, build output or VCS paths. Any relative path
/// containing one of them is dropped, file names included.
pub const EXCLUDED_MARKERS: [&str; 5] = ["node_modules", ".git", "dist", "build", ".next"];

pub const TRUNCATION_MARKER: &str = "\n\n/* ... (Upload truncated due to size limit) ... */";

pub const DEFAULT_MAX_FILE_BYTES: u64 = 200_000;
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 1_000_000;

lazy_static! {
    static ref ALLOWED_EXTENSION: Regex =
        Regex::new(r"(?i)\.(html|htm|css|js|jsx|ts|tsx|json|php|py|rb|md|txt)$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no valid code files found in the uploaded folder")]
    Empty,

    #[error("total size limit of {max_total_bytes} bytes cannot hold {path}")]
    LimitTooSmall {
        max_total_bytes: usize,
        path: String,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("folder walk failed: {0}")]
    Walk(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    /// Files strictly larger than this are skipped.
    pub max_file_bytes: u64,
    /// Upper bound on the aggregated text, truncation marker included.
    pub max_total_bytes: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// One entry from a file picker.
#[async_trait]
pub trait PickedFile: Send + Sync {
    /// `/`-separated path, starting with the picked folder's own name.
    fn relative_path(&self) -> &str;
    fn size(&self) -> u64;
    async fn read_text(&self) -> std::io::Result<String>;
}

#[derive(Debug, Clone)]
pub struct DiskFile {
    relative_path: String,
    path: PathBuf,
    size: u64,
}

impl DiskFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PickedFile for DiskFile {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_text(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    ExcludedPath,
    UnsupportedExtension,
    TooLarge { size: u64 },
    Unreadable { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SkippedFile {
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub text: String,
    pub file_count: usize,
    pub skipped: Vec<SkippedFile>,
    pub truncated: bool,
}

pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_MARKERS.iter().any(|marker| path.contains(marker))
}

pub fn has_allowed_extension(path: &str) -> bool {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    ALLOWED_EXTENSION.is_match(name)
}

pub fn file_marker(path: &str) -> String {
    format!("\n\n/* --- FILE: {path} --- */\n\n")
}

/// Walk `root` and return every regular file as a [`DiskFile`].
///
/// Directories whose name contains an excluded marker are not descended into. Unreadable entries are logged and skipped.
pub fn collect_folder(root: &Path) -> Result<Vec<DiskFile>, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::NotADirectory(root.to_path_buf()));
    }
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !(entry.file_type().is_dir()
                && is_excluded_path(&entry.file_name().to_string_lossy()))
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable folder entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut relative_path = root_name.clone();
        for component in rel.components() {
            if !relative_path.is_empty() {
                relative_path.push('/');
            }
            relative_path.push_str(&component.as_os_str().to_string_lossy());
        }
        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(error = %e, path = %relative_path, "failed to stat file, skipping");
                continue;
            }
        };
        files.push(DiskFile {
            relative_path,
            path: entry.into_path(),
            size,
        });
    }
    debug!(root = %root.display(), files = files.len(), "folder collected");
    Ok(files)
}

/// Collect `root` on the blocking pool, then aggregate it.
pub async fn aggregate_folder(root: PathBuf, limits: IngestLimits) -> Result<Aggregate, IngestError> {
    let files = tokio::task::spawn_blocking(move || collect_folder(&root))
        .await
        .map_err(|e| IngestError::Walk(e.to_string()))??;
    aggregate(files, limits).await
}

pub async fn aggregate<F: PickedFile>(
    mut files: Vec<F>,
    limits: IngestLimits,
) -> Result<Aggregate, IngestError> {
    files.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));

    let budget = limits.max_total_bytes.saturating_sub(TRUNCATION_MARKER.len());
    let mut text = String::new();
    let mut file_count = 0usize;
    let mut skipped = Vec::new();
    let mut truncated = false;

    for file in &files {
        let path = file.relative_path();

        let reason = if is_excluded_path(path) {
            Some(SkipReason::ExcludedPath)
        } else if !has_allowed_extension(path) {
            Some(SkipReason::UnsupportedExtension)
        } else if file.size() > limits.max_file_bytes {
            Some(SkipReason::TooLarge { size: file.size() })
        } else {
            None
        };
        if let Some(reason) = reason {
            skipped.push(SkippedFile {
                path: path.to_string(),
                reason,
            });
            continue;
        }

        let content = match file.read_text().await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, path, "failed to read file, skipping");
                skipped.push(SkippedFile {
                    path: path.to_string(),
                    reason: SkipReason::Unreadable {
                        error: e.to_string(),
                    },
                });
                continue;
            }
        };

        let marker = file_marker(path);
        if text.len() + marker.len() + content.len() > budget {
            // A file is only started when its whole header and some content fit.
            let room = budget - text.len();
            if room > marker.len() {
                let cut = floor_char_boundary(&content, room - marker.len());
                if cut > 0 {
                    text.push_str(&marker);
                    text.push_str(&content[..cut]);
                    file_count += 1;
                }
            }
            if file_count == 0 {
                return Err(IngestError::LimitTooSmall {
                    max_total_bytes: limits.max_total_bytes,
                    path: path.to_string(),
                });
            }
            text.push_str(TRUNCATION_MARKER);
            truncated = true;
            break;
        }

        text.push_str(&marker);
        text.push_str(&content);
        file_count += 1;
    }

    if file_count == 0 {
        return Err(IngestError::Empty);
    }

    info!(
        files = file_count,
        skipped = skipped.len(),
        bytes = text.len(),
        truncated,
        "folder aggregated"
    );
    Ok(Aggregate {
        text,
        file_count,
        skipped,
        truncated,
    })
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut cut = index.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
