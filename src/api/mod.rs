//! Purpose: Define the public Rust API boundary for kaggle-rotate.
//! Exports: Account store, layout, publisher, runner, and error types.
//! Role: Additive-only surface used by the CLI and integration tests.
//! Invariants: File-write helpers stay behind `core`; only caller-facing types are re-exported.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::accounts::{
    Account, AccountEntry, AccountSource, AccountStore, LoadIssue, LoadOutcome, LoadReport,
};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::layout::{Layout, account_file_candidates, home_dir};
pub use crate::core::metadata::KernelMetadata;
pub use crate::core::publisher::{CONFIG_DIR_ENV, DEFAULT_CLI, Publisher, PushOutcome, PushReport};
pub use crate::core::runner::{CommandOutput, CommandRunner, SystemRunner};
pub use crate::core::script::SCRIPT_MARKER;
