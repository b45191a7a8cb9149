//! Purpose: Kernel metadata document consumed by `kaggle kernels push`.
//! Exports: `KernelMetadata`, `write_metadata`.
//! Role: Fixed-schema document builder and whole-file writer.
//! Invariants: Document is regenerated from scratch on every call; never merged.
//! Invariants: Boolean flags are written as the strings "true"/"false".

use std::path::Path;

use serde::{Serialize, Serializer};

use super::error::{Error, ErrorKind};
use super::fsutil::write_file;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KernelMetadata {
    pub id: String,
    pub title: String,
    pub code_file: String,
    pub language: &'static str,
    pub kernel_type: &'static str,
    #[serde(serialize_with = "bool_as_str")]
    pub is_private: bool,
    #[serde(serialize_with = "bool_as_str")]
    pub enable_gpu: bool,
    #[serde(serialize_with = "bool_as_str")]
    pub enable_tpu: bool,
    #[serde(serialize_with = "bool_as_str")]
    pub enable_internet: bool,
    pub dataset_sources: Vec<String>,
    pub competition_sources: Vec<String>,
    pub kernel_sources: Vec<String>,
    pub model_sources: Vec<String>,
}

impl KernelMetadata {
    /// Private Python script owned by `username`, with internet on and TPU off.
    pub fn script(kernel_name: &str, username: &str, code_file: &Path, gpu: bool) -> Self {
        Self {
            id: format!("{username}/{kernel_name}"),
            title: kernel_name.to_string(),
            code_file: code_file.display().to_string(),
            language: "python",
            kernel_type: "script",
            is_private: true,
            enable_gpu: gpu,
            enable_tpu: false,
            enable_internet: true,
            dataset_sources: Vec::new(),
            competition_sources: Vec::new(),
            kernel_sources: Vec::new(),
            model_sources: Vec::new(),
        }
    }
}

fn bool_as_str<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

pub fn write_metadata(path: &Path, metadata: &KernelMetadata) -> Result<(), Error> {
    let body = serde_json::to_vec(metadata).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode kernel metadata")
            .with_source(err)
    })?;
    write_file(path, &body, "failed to write kernel metadata")?;
    tracing::info!(path = %path.display(), id = %metadata.id, "kernel metadata written");
    Ok(())
}
