//! Purpose: Whole-file write helpers shared by the credential, metadata, and script writers.
//! Exports: `write_file`, `write_private_file`.
//! Role: Create missing parent directories, then overwrite the target in one write.
//! Invariants: Writes are whole-file overwrites; no append, no locking.
//! Invariants: Private files are mode 0600 on Unix, including pre-existing ones.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::error::Error;

pub fn write_file(path: &Path, contents: &[u8], context: &str) -> Result<(), Error> {
    ensure_parent(path)?;
    fs::write(path, contents).map_err(|err| Error::io(err, path).with_message(context))
}

pub fn write_private_file(path: &Path, contents: &[u8], context: &str) -> Result<(), Error> {
    ensure_parent(path)?;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|err| Error::io(err, path).with_message(context))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|err| Error::io(err, path).with_message(context))?;
    }
    file.write_all(contents)
        .map_err(|err| Error::io(err, path).with_message(context))
}

fn ensure_parent(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| Error::io(err, parent).with_message("failed to create directory")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{write_file, write_private_file};

    #[test]
    fn write_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b").join("out.txt");
        write_file(&path, b"first, longer", "write").expect("write");
        write_file(&path, b"second", "write").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "second");
    }

    #[cfg(unix)]
    #[test]
    fn private_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".kaggle").join("kaggle.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "{}").expect("seed");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");

        write_private_file(&path, b"{\"username\":\"a\"}", "write").expect("write");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "{\"username\":\"a\"}"
        );
    }
}
