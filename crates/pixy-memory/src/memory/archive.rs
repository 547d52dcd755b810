use chrono::{Local, NaiveDate};
use regex::Regex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::config::{MemoryConfig, LONG_TERM_FILE_NAME, MEMORY_DIR_NAME};
use super::regex_safety::RegexSafetyValidator;
use super::search::{scan_files, MatcherSet, SearchQuery, SearchResult};

/// Errors that can occur in archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn daily_file_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}\.md$").ok())
        .as_ref()
}

/// Whether `name` is a daily note file name (`YYYY-MM-DD.md`).
pub fn is_daily_file_name(name: &str) -> bool {
    daily_file_name_pattern().is_some_and(|pattern| pattern.is_match(name))
}

/// File-backed store of dated daily notes plus one long-term note.
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    memory_dir: PathBuf,
    validator: RegexSafetyValidator,
}

impl MemoryArchive {
    /// Archive over `memory_dir`; touches nothing on disk.
    pub fn new(memory_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_dir: memory_dir.into(),
            validator: RegexSafetyValidator::new(),
        }
    }

    /// Archive for `<workspace>/memory`, creating the directory if needed.
    pub fn open(workspace: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let archive = Self::new(workspace.as_ref().join(MEMORY_DIR_NAME));
        archive.init()?;
        Ok(archive)
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self, ArchiveError> {
        Self::open(&config.workspace)
    }

    /// Initialize the memory directory.
    pub fn init(&self) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.memory_dir)
            .map_err(|error| ArchiveError::io(&self.memory_dir, error))
    }

    pub fn memory_dir(&self) -> &Path {
        &self.memory_dir
    }

    pub fn long_term_path(&self) -> PathBuf {
        self.memory_dir.join(LONG_TERM_FILE_NAME)
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.memory_dir.join(format!("{}.md", date.format("%Y-%m-%d")))
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn today_path(&self) -> PathBuf {
        self.daily_path(Self::today())
    }

    /// Daily note for `date`; empty when it does not exist yet.
    pub fn read_daily(&self, date: NaiveDate) -> Result<String, ArchiveError> {
        read_or_empty(&self.daily_path(date))
    }

    pub fn read_today(&self) -> Result<String, ArchiveError> {
        self.read_daily(Self::today())
    }

    /// Long-term note; empty when it does not exist yet.
    pub fn read_long_term(&self) -> Result<String, ArchiveError> {
        read_or_empty(&self.long_term_path())
    }

    /// Append `content` to the daily note for `date`, creating it with a
    /// `# YYYY-MM-DD` header on first write.
    pub fn append_daily(&self, date: NaiveDate, content: &str) -> Result<PathBuf, ArchiveError> {
        let path = self.daily_path(date);
        self.init()?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|error| ArchiveError::io(&path, error))?;
        let is_new_file = file
            .metadata()
            .map_err(|error| ArchiveError::io(&path, error))?
            .len()
            == 0;

        let mut text = String::new();
        if is_new_file {
            text.push_str(&format!("# {}\n\n", date.format("%Y-%m-%d")));
        }
        text.push_str(content.trim_end());
        text.push('\n');
        file.write_all(text.as_bytes())
            .map_err(|error| ArchiveError::io(&path, error))?;
        Ok(path)
    }

    /// Daily note files, newest date first. Other files are ignored and a
    /// missing directory yields an empty list.
    pub fn list_daily_files(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        if !self.memory_dir.exists() {
            return Ok(Vec::new());
        }
        if !self.memory_dir.is_dir() {
            return Err(ArchiveError::io(
                &self.memory_dir,
                io::Error::other("not a directory"),
            ));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.memory_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|error| {
                let path = error
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.memory_dir.clone());
                ArchiveError::Io {
                    path,
                    source: io::Error::other(error.to_string()),
                }
            })?;
            if !entry.path().is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(is_daily_file_name) {
                files.push(entry.into_path());
            }
        }
        files.sort_by(|left, right| right.file_name().cmp(&left.file_name()));
        Ok(files)
    }

    /// Long-term note and today's note as labeled blocks, for injection
    /// into a fresh session. Empty when neither exists.
    pub fn context_snapshot(&self) -> Result<String, ArchiveError> {
        let mut parts = Vec::new();

        let long_term = self.read_long_term()?;
        if !long_term.is_empty() {
            parts.push(format!("## Long-term Memory\n{long_term}"));
        }

        let today = self.read_today()?;
        if !today.is_empty() {
            parts.push(format!("## Today's Notes\n{today}"));
        }

        Ok(parts.join("\n\n"))
    }

    /// Line-level search over the daily notes, newest file first.
    pub fn search_daily(&self, query: &SearchQuery) -> SearchResult {
        if query.is_empty() {
            return SearchResult::default();
        }

        let files = match self.list_daily_files() {
            Ok(files) => files,
            Err(error) => {
                warn!(error = %error, "failed to list memory files");
                return SearchResult {
                    listing_error: Some(error.to_string()),
                    ..SearchResult::default()
                };
            }
        };
        if files.is_empty() {
            return SearchResult::default();
        }

        let matchers = MatcherSet::compile(query, &self.validator);
        if matchers.is_empty() {
            debug!(
                terms = query.describe_terms().as_str(),
                "no usable search terms after validation"
            );
            return SearchResult {
                hits: Vec::new(),
                files_available: files.len(),
                listing_error: None,
            };
        }

        SearchResult {
            hits: scan_files(&files, &matchers, query.max_results),
            files_available: files.len(),
            listing_error: None,
        }
    }
}

fn read_or_empty(path: &Path) -> Result<String, ArchiveError> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(error) => Err(ArchiveError::io(path, error)),
    }
}
