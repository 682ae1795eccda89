//! File-backed store for debates and judging results.
//!
//! Layout under the data directory:
//!
//! ```text
//! debates/<id>.json        one DebateInstance per file
//! judgments.jsonl          accepted JudgmentRecords, append-only
//! parse_failures.jsonl     failed judge attempts, append-only
//! exclusions.jsonl         runs dropped after exhausting their budget
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use debatebench_core::collector::AttemptFailure;
use debatebench_core::{DebateInstance, Exclusion, JudgmentRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

const DEBATES_DIR: &str = "debates";
const JUDGMENTS_FILE: &str = "judgments.jsonl";
const FAILURES_FILE: &str = "parse_failures.jsonl";
const EXCLUSIONS_FILE: &str = "exclusions.jsonl";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No debate matches '{0}'")]
    NotFound(String),

    #[error("'{0}' matches more than one debate")]
    Ambiguous(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open the store, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let debates = root.join(DEBATES_DIR);
        fs::create_dir_all(&debates).map_err(io_err(&debates))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn debate_path(&self, id: Uuid) -> PathBuf {
        self.root.join(DEBATES_DIR).join(format!("{}.json", id))
    }

    /// Write a debate, replacing any earlier snapshot of it.
    pub fn save_debate(&self, debate: &DebateInstance) -> Result<PathBuf, StoreError> {
        let path = self.debate_path(debate.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(debate).map_err(|source| StoreError::Json {
            path: path.clone(),
            line: 0,
            source,
        })?;
        fs::write(&tmp, json).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_err(&path))?;
        Ok(path)
    }

    pub fn load_debate(&self, id: Uuid) -> Result<DebateInstance, StoreError> {
        let path = self.debate_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        read_json(&path)
    }

    /// All stored debates, oldest first.
    pub fn list_debates(&self) -> Result<Vec<DebateInstance>, StoreError> {
        let dir = self.root.join(DEBATES_DIR);
        let mut debates = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let path = entry.map_err(io_err(&dir))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                debates.push(read_json::<DebateInstance>(&path)?);
            }
        }
        debates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(debates)
    }

    /// Look a debate up by full id or unique id prefix.
    pub fn find_debate(&self, id_or_prefix: &str) -> Result<DebateInstance, StoreError> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return self.load_debate(id);
        }
        let mut matches: Vec<DebateInstance> = self
            .list_debates()?
            .into_iter()
            .filter(|d| d.id.to_string().starts_with(id_or_prefix))
            .collect();
        match matches.len() {
            0 => Err(StoreError::NotFound(id_or_prefix.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(StoreError::Ambiguous(id_or_prefix.to_string())),
        }
    }

    pub fn append_judgments(&self, records: &[JudgmentRecord]) -> Result<(), StoreError> {
        append_lines(&self.root.join(JUDGMENTS_FILE), records)
    }

    pub fn load_judgments(&self) -> Result<Vec<JudgmentRecord>, StoreError> {
        read_lines(&self.root.join(JUDGMENTS_FILE))
    }

    pub fn append_failures(&self, failures: &[AttemptFailure]) -> Result<(), StoreError> {
        append_lines(&self.root.join(FAILURES_FILE), failures)
    }

    pub fn load_failures(&self) -> Result<Vec<AttemptFailure>, StoreError> {
        read_lines(&self.root.join(FAILURES_FILE))
    }

    pub fn append_exclusions(&self, exclusions: &[Exclusion]) -> Result<(), StoreError> {
        append_lines(&self.root.join(EXCLUSIONS_FILE), exclusions)
    }

    pub fn load_exclusions(&self) -> Result<Vec<Exclusion>, StoreError> {
        read_lines(&self.root.join(EXCLUSIONS_FILE))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(io_err(path))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        line: source.line(),
        source,
    })
}

fn append_lines<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    if items.is_empty() {
        return Ok(());
    }
    let mut buf = String::new();
    for (i, item) in items.iter().enumerate() {
        let line = serde_json::to_string(item).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        buf.push_str(&line);
        buf.push('\n');
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err(path))?;
    file.write_all(buf.as_bytes()).map_err(io_err(path))
}

/// Missing file reads as empty. Blank lines are skipped.
fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(io_err(path))?;
    let mut items = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err(path))?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?);
    }
    Ok(items)
}
