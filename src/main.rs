//! Purpose: `kaggle-rotate` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Command results are JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Errors are JSON on stderr when not a TTY; notices never touch stdout.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Environment (`HOME`, `KAGGLE_CONFIG_DIR`, `RUST_LOG`) is read only here.
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use kaggle_rotate::api::{DEFAULT_CLI, Error, ErrorKind, Layout, to_exit_code};
use kaggle_rotate::notice::{Notice, notice_json};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `kaggle-rotate --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let context = command_dispatch::Context {
        accounts_file: cli.accounts,
        accounts_dir: cli.accounts_dir.unwrap_or_else(|| PathBuf::from(".")),
        layout: match &cli.home {
            Some(home) => Layout::under_home(home),
            None => Layout::from_env(),
        },
        kaggle_bin: cli.kaggle_bin,
        color_mode,
    };

    command_dispatch::dispatch_command(cli.command, &context)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "kaggle-rotate",
    version,
    about = "Rotate Kaggle accounts and push script kernels",
    long_about = None,
    before_help = r#"Each push switches ~/.kaggle/kaggle.json to the chosen account, regenerates
kernel-metadata.json, copies the script with line 1 set to KKK=<value>, then runs
`kaggle kernels push -p ~/kaggle/kernel`.
"#,
    after_help = r#"EXAMPLES
  $ kaggle-rotate accounts list
  $ kaggle-rotate use 3
  $ kaggle-rotate push 3 train.py 42 train-v2 --gpu

ACCOUNTS
  Read from --accounts, else users-private.csv then users.csv in --accounts-dir.
  Header: key,username,password"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Accounts CSV with header key,username,password",
        value_hint = ValueHint::FilePath,
        conflicts_with = "accounts_dir"
    )]
    accounts: Option<PathBuf>,
    #[arg(
        long,
        help = "Directory probed for users-private.csv then users.csv (default: .)",
        value_hint = ValueHint::DirPath
    )]
    accounts_dir: Option<PathBuf>,
    #[arg(
        long,
        help = "Home holding .kaggle/ and kaggle/kernel/ (default: $HOME, honoring KAGGLE_CONFIG_DIR)",
        value_hint = ValueHint::DirPath
    )]
    home: Option<PathBuf>,
    #[arg(
        long,
        default_value = DEFAULT_CLI,
        help = "Kaggle CLI executable used for pushes",
        value_hint = ValueHint::CommandName
    )]
    kaggle_bin: OsString,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(arg_required_else_help = true, about = "Inspect the loaded accounts")]
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },
    #[command(about = "Make an account active by writing the Kaggle credential file")]
    Use { key: String },
    #[command(about = "Regenerate kernel-metadata.json in the kernel directory")]
    Metadata {
        kernel_name: String,
        #[arg(long, help = "Owner of the kernel (id becomes <username>/<kernel_name>)")]
        username: String,
        #[arg(long, help = "Request a GPU for the kernel")]
        gpu: bool,
    },
    #[command(about = "Copy a script into the kernel directory with line 1 set to KKK=<value>")]
    Patch {
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    #[command(about = "Switch account, stage metadata and script, then run `kaggle kernels push`")]
    Push {
        key: String,
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        #[arg(allow_negative_numbers = true)]
        value: i64,
        kernel_name: String,
        #[arg(long, help = "Request a GPU for the kernel")]
        gpu: bool,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum AccountsCommand {
    #[command(about = "List account keys and usernames in load order (secrets are never shown)")]
    List,
    #[command(about = "Print the number of loaded accounts")]
    Count,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check ownership of ~/.kaggle and the kernel directory, or use --home.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_LOG=debug and share the command if it persists.",
        ),
        _ => err,
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> String {
    use time::format_description::well_known::Rfc3339;
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| {
            time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()
        })
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_default()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Validation => "invalid input".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::External => "external tool failed".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
