//! Purpose: Filesystem locations read or written by the publisher.
//! Exports: `Layout`, `account_file_candidates`, `home_dir`.
//! Role: Constructor-injected path configuration; no module-level state.
//! Invariants: Defaults mirror what the Kaggle CLI expects under `$HOME`.
//! Invariants: Environment is consulted only by `Layout::from_env` and `home_dir`.
//! Invariants: Every path is absolute; relative inputs resolve against the working directory.

use std::path::{Path, PathBuf};

pub const CREDENTIAL_FILE_NAME: &str = "kaggle.json";
pub const KERNEL_SCRIPT_NAME: &str = "kernel.py";
pub const METADATA_FILE_NAME: &str = "kernel-metadata.json";

/// Account files probed, in priority order, when no explicit source is given.
pub const ACCOUNT_FILE_NAMES: [&str; 2] = ["users-private.csv", "users.csv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub credential_path: PathBuf,
    pub kernel_dir: PathBuf,
    pub kernel_script_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Layout {
    /// `<home>/.kaggle/kaggle.json` plus a kernel workspace at `<home>/kaggle/kernel`.
    pub fn under_home(home: &Path) -> Self {
        Self::with_dirs(&home.join(".kaggle"), &home.join("kaggle").join("kernel"))
    }

    pub fn with_dirs(config_dir: &Path, kernel_dir: &Path) -> Self {
        let config_dir = absolutize(config_dir);
        let kernel_dir = absolutize(kernel_dir);
        Self {
            credential_path: config_dir.join(CREDENTIAL_FILE_NAME),
            kernel_dir: kernel_dir.to_path_buf(),
            kernel_script_path: kernel_dir.join(KERNEL_SCRIPT_NAME),
            metadata_path: kernel_dir.join(METADATA_FILE_NAME),
        }
    }

    /// Resolves `$HOME`, honoring `KAGGLE_CONFIG_DIR` for the credential file.
    pub fn from_env() -> Self {
        Self::from_home_and_config(&home_dir(), std::env::var_os("KAGGLE_CONFIG_DIR"))
    }

    pub fn from_home_and_config(home: &Path, config_dir: Option<std::ffi::OsString>) -> Self {
        let mut layout = Self::under_home(home);
        if let Some(dir) = config_dir.filter(|dir| !dir.is_empty()) {
            layout.credential_path = absolutize(Path::new(&dir)).join(CREDENTIAL_FILE_NAME);
        }
        layout
    }
}

// Falls back to the input when the working directory is unavailable.
fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn home_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home)
}

pub fn account_file_candidates(dir: &Path) -> Vec<PathBuf> {
    ACCOUNT_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .collect()
}
