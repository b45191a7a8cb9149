//! Purpose: Switch the active Kaggle account, stage a kernel, and push it.
//! Exports: `Publisher`, `PushReport`, `PushOutcome`, `DEFAULT_CLI`.
//! Role: Orchestrates credential write -> metadata write -> script patch -> CLI push.
//! Invariants: Steps run in that order; a failed step stops later steps.
//! Invariants: Earlier side effects are never rolled back.
//! Invariants: Push failures are reported in `PushOutcome`, never raised.
//! Invariants: The pushed CLI reads the credential file this publisher wrote.
//! Invariants: Keys may be secrets, so they stay out of logs and error messages.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::accounts::AccountStore;
use super::error::{Error, ErrorKind};
use super::fsutil::write_private_file;
use super::layout::Layout;
use super::metadata::{KernelMetadata, write_metadata};
use super::runner::{CommandRunner, SystemRunner};
use super::script::patch_script_file;

pub const DEFAULT_CLI: &str = "kaggle";

/// Directory the Kaggle CLI reads `kaggle.json` from when set.
pub const CONFIG_DIR_ENV: &str = "KAGGLE_CONFIG_DIR";

/// On-disk shape of `kaggle.json`.
#[derive(Serialize)]
struct CredentialFile<'a> {
    username: &'a str,
    key: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed {
        stdout: String,
    },
    Rejected {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    LaunchFailed {
        message: String,
    },
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PushOutcome::Pushed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub username: String,
    pub kernel_id: String,
    pub kernel_dir: PathBuf,
    pub outcome: PushOutcome,
}

pub struct Publisher<R = SystemRunner> {
    store: AccountStore,
    layout: Layout,
    cli: OsString,
    runner: R,
}

impl<R> fmt::Debug for Publisher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("accounts", &self.store.count())
            .field("layout", &self.layout)
            .field("cli", &self.cli)
            .finish()
    }
}

impl Publisher<SystemRunner> {
    pub fn new(store: AccountStore, layout: Layout) -> Self {
        Self::with_runner(store, layout, SystemRunner)
    }
}

impl<R: CommandRunner> Publisher<R> {
    pub fn with_runner(store: AccountStore, layout: Layout, runner: R) -> Self {
        Self {
            store,
            layout,
            cli: OsString::from(DEFAULT_CLI),
            runner,
        }
    }

    pub fn with_cli(mut self, cli: impl Into<OsString>) -> Self {
        self.cli = cli.into();
        self
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Writes the account to the credential file and returns its username.
    pub fn select_account(&self, key: impl fmt::Display) -> Result<String, Error> {
        let key = key.to_string();
        let account = self.store.lookup(&key).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("no account matches the given key")
                .with_hint("List known keys with `kaggle-rotate accounts list`.")
        })?;
        let body = serde_json::to_vec(&CredentialFile {
            username: &account.username,
            key: &account.secret,
        })
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode credentials")
                .with_source(err)
        })?;
        let path = &self.layout.credential_path;
        write_private_file(path, &body, "failed to write credential file")?;
        tracing::info!(
            username = %account.username,
            path = %path.display(),
            "active account switched"
        );
        Ok(account.username.clone())
    }

    pub fn write_metadata(
        &self,
        kernel_name: &str,
        username: &str,
        gpu: bool,
    ) -> Result<PathBuf, Error> {
        let metadata =
            KernelMetadata::script(kernel_name, username, &self.layout.kernel_script_path, gpu);
        write_metadata(&self.layout.metadata_path, &metadata)?;
        Ok(self.layout.metadata_path.clone())
    }

    /// Copies `source` into the kernel directory with line 1 set to the new value.
    pub fn patch_script(&self, source: &Path, value: i64) -> Result<PathBuf, Error> {
        patch_script_file(source, &self.layout.kernel_script_path, value)?;
        Ok(self.layout.kernel_script_path.clone())
    }

    pub fn publish(
        &self,
        key: impl fmt::Display,
        script: &Path,
        value: i64,
        kernel_name: &str,
        gpu: bool,
    ) -> Result<PushReport, Error> {
        let username = self.select_account(key)?;
        self.write_metadata(kernel_name, &username, gpu)?;
        self.patch_script(script, value)?;
        let outcome = self.push();
        Ok(PushReport {
            kernel_id: format!("{username}/{kernel_name}"),
            username,
            kernel_dir: self.layout.kernel_dir.clone(),
            outcome,
        })
    }

    fn push(&self) -> PushOutcome {
        let args = push_args(&self.layout.kernel_dir);
        let envs = self.push_envs();
        tracing::debug!(cli = ?self.cli, args = ?args, envs = ?envs, "running kernel push");
        match self.runner.run(OsStr::new(&self.cli), &args, &envs) {
            Ok(output) if output.success() => {
                tracing::info!(stdout = %output.stdout.trim_end(), "kernel pushed");
                PushOutcome::Pushed {
                    stdout: output.stdout,
                }
            }
            Ok(output) => {
                tracing::warn!(
                    code = ?output.code,
                    stderr = %output.stderr.trim_end(),
                    "kernel push rejected"
                );
                PushOutcome::Rejected {
                    code: output.code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
            Err(err) => {
                tracing::warn!(cli = ?self.cli, error = %err, "kernel push could not start");
                PushOutcome::LaunchFailed {
                    message: format!("failed to run {}: {err}", self.cli.to_string_lossy()),
                }
            }
        }
    }
}

impl<R> Publisher<R> {
    fn push_envs(&self) -> Vec<(OsString, OsString)> {
        match self.layout.credential_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                vec![(OsString::from(CONFIG_DIR_ENV), dir.as_os_str().to_os_string())]
            }
            _ => Vec::new(),
        }
    }
}

fn push_args(kernel_dir: &Path) -> Vec<OsString> {
    vec![
        OsString::from("kernels"),
        OsString::from("push"),
        OsString::from("-p"),
        kernel_dir.as_os_str().to_os_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::{Publisher, PushOutcome};
    use crate::core::accounts::{Account, AccountEntry, AccountSource, AccountStore};
    use crate::core::error::ErrorKind;
    use crate::core::layout::Layout;
    use crate::core::runner::{CommandOutput, CommandRunner};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::ffi::{OsStr, OsString};
    use std::io;

    enum Reply {
        Exit(i32, &'static str, &'static str),
        Missing,
    }

    struct Call {
        program: OsString,
        args: Vec<OsString>,
        envs: Vec<(OsString, OsString)>,
    }

    struct FakeRunner {
        reply: Reply,
        calls: RefCell<Vec<Call>>,
    }

    impl FakeRunner {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(
            &self,
            program: &OsStr,
            args: &[OsString],
            envs: &[(OsString, OsString)],
        ) -> io::Result<CommandOutput> {
            self.calls.borrow_mut().push(Call {
                program: program.to_os_string(),
                args: args.to_vec(),
                envs: envs.to_vec(),
            });
            match self.reply {
                Reply::Exit(code, stdout, stderr) => Ok(CommandOutput {
                    code: Some(code),
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                }),
                Reply::Missing => Err(io::Error::new(io::ErrorKind::NotFound, "not found")),
            }
        }
    }

    fn store() -> AccountStore {
        let mut store = AccountStore::new();
        store.insert(
            "1",
            Account {
                username: "alice".to_string(),
                secret: "k1".to_string(),
            },
        );
        store.insert(
            "2",
            Account {
                username: "bob".to_string(),
                secret: "k2".to_string(),
            },
        );
        store
    }

    fn read_json(path: &std::path::Path) -> Value {
        let text = std::fs::read_to_string(path).expect("read");
        serde_json::from_str(&text).expect("json")
    }

    #[test]
    fn select_account_writes_credentials_and_returns_username() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let publisher =
            Publisher::with_runner(store(), layout.clone(), FakeRunner::new(Reply::Missing));

        let username = publisher.select_account("1").expect("select");
        assert_eq!(username, "alice");
        assert_eq!(
            std::fs::read_to_string(&layout.credential_path).expect("read"),
            r#"{"username":"alice","key":"k1"}"#
        );

        assert_eq!(publisher.select_account(2).expect("select"), "bob");
        assert_eq!(
            read_json(&layout.credential_path),
            json!({"username": "bob", "key": "k2"})
        );
    }

    #[test]
    fn unknown_key_is_not_found_and_writes_nothing() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let publisher =
            Publisher::with_runner(store(), layout.clone(), FakeRunner::new(Reply::Missing));

        let err = publisher.select_account("9").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!layout.credential_path.exists());
    }

    #[test]
    fn missing_secret_key_stays_out_of_error() {
        let home = tempfile::tempdir().expect("tempdir");
        let store = AccountStore::load(AccountSource::List(vec![AccountEntry {
            username: "alice".to_string(),
            key: "ksecret-alice".to_string(),
        }]))
        .store;
        let publisher = Publisher::with_runner(
            store,
            Layout::under_home(home.path()),
            FakeRunner::new(Reply::Missing),
        );

        let err = publisher
            .select_account("ksecret-bob")
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.to_string().contains("ksecret-bob"));
        assert!(!format!("{err:?}").contains("ksecret-bob"));
    }

    #[test]
    fn publish_runs_all_steps_and_pushes_kernel_dir() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let script = home.path().join("train.py");
        std::fs::write(&script, "KKK=5\nprint(KKK)\n").expect("seed");
        let publisher = Publisher::with_runner(
            store(),
            layout.clone(),
            FakeRunner::new(Reply::Exit(0, "Kernel version 3 pushed\n", "")),
        )
        .with_cli("kaggle-test");

        let report = publisher
            .publish("1", &script, 42, "train-v2", true)
            .expect("publish");
        assert_eq!(report.username, "alice");
        assert_eq!(report.kernel_id, "alice/train-v2");
        assert_eq!(
            report.outcome,
            PushOutcome::Pushed {
                stdout: "Kernel version 3 pushed\n".to_string()
            }
        );

        let metadata = read_json(&layout.metadata_path);
        assert_eq!(metadata["id"], "alice/train-v2");
        assert_eq!(metadata["enable_gpu"], "true");
        assert_eq!(
            metadata["code_file"],
            layout.kernel_script_path.display().to_string()
        );
        assert_eq!(
            std::fs::read_to_string(&layout.kernel_script_path).expect("read"),
            "KKK=42\nprint(KKK)\n"
        );

        let calls = publisher.runner().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, OsString::from("kaggle-test"));
        assert_eq!(
            calls[0].args,
            vec![
                OsString::from("kernels"),
                OsString::from("push"),
                OsString::from("-p"),
                layout.kernel_dir.clone().into_os_string(),
            ]
        );
        assert_eq!(
            calls[0].envs,
            vec![(
                OsString::from("KAGGLE_CONFIG_DIR"),
                home.path().join(".kaggle").into_os_string(),
            )]
        );
    }

    #[test]
    fn rejected_push_is_reported_not_raised() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let script = home.path().join("train.py");
        std::fs::write(&script, "KKK=5\n").expect("seed");
        let publisher = Publisher::with_runner(
            store(),
            layout,
            FakeRunner::new(Reply::Exit(1, "", "auth expired")),
        );

        let report = publisher
            .publish(1, &script, 6, "nb", false)
            .expect("publish completes");
        assert!(!report.outcome.is_success());
        match report.outcome {
            PushOutcome::Rejected { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "auth expired");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn launch_failure_is_reported_not_raised() {
        let home = tempfile::tempdir().expect("tempdir");
        let script = home.path().join("train.py");
        std::fs::write(&script, "KKK=5\n").expect("seed");
        let publisher = Publisher::with_runner(
            store(),
            Layout::under_home(home.path()),
            FakeRunner::new(Reply::Missing),
        );

        let report = publisher
            .publish("2", &script, 6, "nb", false)
            .expect("publish completes");
        match report.outcome {
            PushOutcome::LaunchFailed { message } => {
                assert!(message.contains("kaggle"));
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn bad_script_keeps_earlier_writes_and_skips_push() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let script = home.path().join("train.py");
        std::fs::write(&script, "X=5\n").expect("seed");
        let publisher = Publisher::with_runner(
            store(),
            layout.clone(),
            FakeRunner::new(Reply::Exit(0, "", "")),
        );

        let err = publisher
            .publish("1", &script, 42, "nb", false)
            .expect_err("validation");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(layout.credential_path.exists());
        assert!(layout.metadata_path.exists());
        assert!(!layout.kernel_script_path.exists());
        assert!(publisher.runner().calls.borrow().is_empty());
    }

    #[test]
    fn unknown_key_stops_before_metadata() {
        let home = tempfile::tempdir().expect("tempdir");
        let layout = Layout::under_home(home.path());
        let script = home.path().join("train.py");
        std::fs::write(&script, "KKK=5\n").expect("seed");
        let publisher = Publisher::with_runner(
            store(),
            layout.clone(),
            FakeRunner::new(Reply::Exit(0, "", "")),
        );

        let err = publisher
            .publish("missing", &script, 1, "nb", false)
            .expect_err("not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!layout.metadata_path.exists());
        assert!(publisher.runner().calls.borrow().is_empty());
    }

    #[test]
    fn push_report_serializes_with_status_tag() {
        let outcome = PushOutcome::Rejected {
            code: Some(1),
            stdout: String::new(),
            stderr: "auth expired".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&outcome).expect("json"),
            json!({"status": "rejected", "code": 1, "stdout": "", "stderr": "auth expired"})
        );
    }
}
