//! Purpose: Keyed table of Kaggle accounts loaded from a list or a CSV file.
//! Exports: `Account`, `AccountEntry`, `AccountSource`, `AccountStore`, `LoadOutcome`,
//! `LoadReport`, `LoadIssue`.
//! Role: Best-effort loader plus pure lookups used by the publisher and CLI.
//! Invariants: Duplicate keys are last-write-wins; the key keeps its first position.
//! Invariants: Loading never fails; problems are recorded in `LoadReport`.
//! Invariants: Secrets never appear in `Debug` output or log lines.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// In-memory account pair; `key` doubles as the lookup key and the secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountEntry {
    pub username: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct AccountRow {
    key: String,
    username: String,
    password: String,
}

const REQUIRED_COLUMNS: [&str; 3] = ["key", "username", "password"];

#[derive(Clone, Debug)]
pub enum AccountSource {
    List(Vec<AccountEntry>),
    File(PathBuf),
    /// Load the first existing path; the last candidate is attempted when none exist.
    Probe(Vec<PathBuf>),
}

impl AccountSource {
    /// Explicit list wins over explicit file; with neither, probe the candidates.
    pub fn resolve(
        list: Option<Vec<AccountEntry>>,
        file: Option<PathBuf>,
        candidates: Vec<PathBuf>,
    ) -> Self {
        match (list, file) {
            (Some(list), _) => AccountSource::List(list),
            (None, Some(file)) => AccountSource::File(file),
            (None, None) => AccountSource::Probe(candidates),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadIssue {
    pub line: Option<u64>,
    pub message: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// File the accounts came from; `None` for in-memory lists.
    pub source: Option<PathBuf>,
    pub rows_loaded: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, line: Option<u64>, message: impl Into<String>) {
        let issue = LoadIssue {
            line,
            message: message.into(),
        };
        tracing::warn!(source = ?self.source, "account load issue: {issue}");
        self.issues.push(issue);
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub store: AccountStore,
    pub report: LoadReport,
}

#[derive(Clone, Debug, Default)]
pub struct AccountStore {
    order: Vec<String>,
    accounts: HashMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(source: AccountSource) -> LoadOutcome {
        match source {
            AccountSource::List(entries) => {
                let mut store = Self::new();
                let rows_loaded = entries.len();
                for entry in entries {
                    store.insert(
                        entry.key.clone(),
                        Account {
                            username: entry.username,
                            secret: entry.key,
                        },
                    );
                }
                LoadOutcome {
                    store,
                    report: LoadReport {
                        rows_loaded,
                        ..LoadReport::default()
                    },
                }
            }
            AccountSource::File(path) => Self::load_csv(&path),
            AccountSource::Probe(candidates) => match pick_candidate(&candidates) {
                Some(path) => Self::load_csv(&path),
                None => {
                    let mut report = LoadReport::default();
                    report.issue(None, "no account file candidates configured");
                    LoadOutcome {
                        store: Self::new(),
                        report,
                    }
                }
            },
        }
    }

    pub fn load_csv(path: &Path) -> LoadOutcome {
        let mut store = Self::new();
        let mut report = LoadReport {
            source: Some(path.to_path_buf()),
            ..LoadReport::default()
        };

        let mut reader = match csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
        {
            Ok(reader) => reader,
            Err(err) => {
                report.issue(None, format!("failed to open accounts file: {err}"));
                return LoadOutcome { store, report };
            }
        };

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(err) => {
                report.issue(Some(1), format!("unreadable header: {err}"));
                return LoadOutcome { store, report };
            }
        };
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|header| header == **column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            report.issue(
                Some(1),
                format!("header is missing column(s): {}", missing.join(", ")),
            );
            return LoadOutcome { store, report };
        }

        let mut record = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    let line = err.position().map(|pos| pos.line());
                    let stop = matches!(err.kind(), csv::ErrorKind::Io(_));
                    report.issue(line, err.to_string());
                    if stop {
                        break;
                    }
                    continue;
                }
            }
            let line = record.position().map(|pos| pos.line());
            match record.deserialize::<AccountRow>(Some(&headers)) {
                Ok(row) if row.key.is_empty() => {
                    report.issue(line, format!("row for user {} has an empty key", row.username));
                }
                Ok(row) => {
                    store.insert(
                        row.key,
                        Account {
                            username: row.username,
                            secret: row.password,
                        },
                    );
                    report.rows_loaded += 1;
                }
                Err(err) => report.issue(line, err.to_string()),
            }
        }

        tracing::debug!(
            path = %path.display(),
            accounts = store.count(),
            "loaded accounts file"
        );
        LoadOutcome { store, report }
    }

    pub fn insert(&mut self, key: impl Into<String>, account: Account) {
        let key = key.into();
        if !self.accounts.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.accounts.insert(key, account);
    }

    /// Exact match on the key's string form; integers and strings are interchangeable.
    pub fn lookup(&self, key: impl fmt::Display) -> Option<&Account> {
        self.accounts.get(&key.to_string())
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn pick_candidate(candidates: &[PathBuf]) -> Option<PathBuf> {
    let chosen = candidates
        .iter()
        .find(|path| path.exists())
        .or_else(|| candidates.last())
        .cloned();
    if let Some(path) = &chosen {
        tracing::debug!(path = %path.display(), "account file probe selected");
    }
    chosen
}
