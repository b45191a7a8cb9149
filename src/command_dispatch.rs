//! Purpose: Hold top-level CLI command dispatch for `kaggle-rotate`.
//! Exports: `Context`, `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Accounts are loaded only by commands that need them.
//! Invariants: A push report is printed before any push failure is raised.

use super::*;

use kaggle_rotate::api::{
    AccountSource, AccountStore, LoadReport, PushOutcome, Publisher, account_file_candidates,
};
use kaggle_rotate::notice::load_notices;

pub(super) struct Context {
    pub(super) accounts_file: Option<PathBuf>,
    pub(super) accounts_dir: PathBuf,
    pub(super) layout: Layout,
    pub(super) kaggle_bin: OsString,
    pub(super) color_mode: ColorMode,
}

pub(super) fn dispatch_command(command: Command, context: &Context) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "kaggle-rotate", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Accounts { command } => {
            let (store, report) = load_accounts(context, "accounts");
            match command {
                AccountsCommand::List => {
                    let accounts = store
                        .keys()
                        .into_iter()
                        .filter_map(|key| {
                            store
                                .lookup(key)
                                .map(|account| json!({ "key": key, "username": account.username }))
                        })
                        .collect::<Vec<_>>();
                    emit_json(json!({
                        "accounts": accounts,
                        "source": report.source.map(|path| path.display().to_string()),
                        "complete": report.issues.is_empty(),
                    }));
                }
                AccountsCommand::Count => {
                    emit_json(json!({ "count": store.count() }));
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Use { key } => {
            let publisher = build_publisher(context, "use");
            let username = publisher.select_account(&key)?;
            emit_json(json!({
                "key": key,
                "username": username,
                "credential_path": context.layout.credential_path.display().to_string(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Metadata {
            kernel_name,
            username,
            gpu,
        } => {
            let publisher = Publisher::new(AccountStore::new(), context.layout.clone());
            let path = publisher.write_metadata(&kernel_name, &username, gpu)?;
            emit_json(json!({
                "id": format!("{username}/{kernel_name}"),
                "metadata_path": path.display().to_string(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Patch { script, value } => {
            let publisher = Publisher::new(AccountStore::new(), context.layout.clone());
            let path = publisher.patch_script(&script, value)?;
            emit_json(json!({
                "source": script.display().to_string(),
                "script_path": path.display().to_string(),
                "value": value,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Push {
            key,
            script,
            value,
            kernel_name,
            gpu,
        } => {
            let publisher = build_publisher(context, "push");
            let report = publisher.publish(&key, &script, value, &kernel_name, gpu)?;
            let value = serde_json::to_value(&report).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode push report")
                    .with_source(err)
            })?;
            emit_json(json!({ "push": value }));
            match report.outcome {
                PushOutcome::Pushed { .. } => Ok(RunOutcome::ok()),
                PushOutcome::Rejected { code, stderr, .. } => {
                    let detail = stderr.trim();
                    let message = match code {
                        Some(code) => format!("kaggle kernels push exited with status {code}"),
                        None => "kaggle kernels push was terminated by a signal".to_string(),
                    };
                    let message = if detail.is_empty() {
                        message
                    } else {
                        format!("{message}: {detail}")
                    };
                    Err(Error::new(ErrorKind::External)
                        .with_message(message)
                        .with_path(report.kernel_dir)
                        .with_hint("Check the account's API key and the kernel metadata."))
                }
                PushOutcome::LaunchFailed { message } => Err(Error::new(ErrorKind::External)
                    .with_message(message)
                    .with_hint("Install the Kaggle CLI or point --kaggle-bin at it.")),
            }
        }
    }
}

fn load_accounts(context: &Context, cmd: &str) -> (AccountStore, LoadReport) {
    let source = AccountSource::resolve(
        None,
        context.accounts_file.clone(),
        account_file_candidates(&context.accounts_dir),
    );
    let outcome = AccountStore::load(source);
    if !outcome.report.is_complete() {
        let time = notice_time_now();
        for notice in load_notices(&outcome.report, cmd, &time) {
            emit_notice(&notice, context.color_mode);
        }
    }
    (outcome.store, outcome.report)
}

fn build_publisher(context: &Context, cmd: &str) -> Publisher {
    let (store, _) = load_accounts(context, cmd);
    Publisher::new(store, context.layout.clone()).with_cli(context.kaggle_bin.clone())
}
