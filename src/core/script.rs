//! Purpose: Copy-and-patch of the parameter line at the top of a kernel script.
//! Exports: `SCRIPT_MARKER`, `patch_first_line`, `patch_script_file`.
//! Role: Pure text transform plus the read/validate/write wrapper.
//! Invariants: Line 1 must start with `SCRIPT_MARKER`, else nothing is written.
//! Invariants: Every byte after line 1 is copied verbatim.

use std::fs;
use std::path::Path;

use super::error::{Error, ErrorKind, io_error_kind};
use super::fsutil::write_file;

pub const SCRIPT_MARKER: &str = "KKK";

pub fn patch_first_line(text: &str, value: i64) -> Result<String, Error> {
    let rest_start = text.find('\n').map_or(text.len(), |idx| idx + 1);
    let first = &text[..rest_start];
    if text.is_empty() || !first.starts_with(SCRIPT_MARKER) {
        return Err(Error::new(ErrorKind::Validation)
            .with_message(format!(
                "first line of the kernel script must start with {SCRIPT_MARKER}"
            ))
            .with_hint(format!("Put `{SCRIPT_MARKER}=<value>` on line 1 of the script.")));
    }
    let mut patched = format!("{SCRIPT_MARKER}={value}\n");
    patched.push_str(&text[rest_start..]);
    Ok(patched)
}

/// Reads `source`, patches line 1, and writes the result to `dest`.
pub fn patch_script_file(source: &Path, dest: &Path, value: i64) -> Result<(), Error> {
    let text = fs::read_to_string(source).map_err(|err| {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::InvalidData => ErrorKind::Validation,
            _ => io_error_kind(&err),
        };
        Error::new(kind)
            .with_message("failed to read kernel script")
            .with_path(source)
            .with_source(err)
    })?;
    let patched = patch_first_line(&text, value).map_err(|err| err.with_path(source))?;
    write_file(dest, patched.as_bytes(), "failed to write kernel script")?;
    tracing::info!(
        source = %source.display(),
        dest = %dest.display(),
        value,
        "kernel script updated"
    );
    Ok(())
}
