//! Tools for loading workflows from different file formats.

pub mod config;
mod dax_parser;
mod yaml_parser;

use std::path::Path;

use crate::error::LoadError;
use crate::workflow::Workflow;

use self::config::ParserConfig;

impl Workflow {
    /// Reads workflow from a file, choosing the format by extension:
    /// `.yaml`/`.yml` for YAML, `.dax`/`.xml` for DAX.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &ParserConfig) -> Result<Self, LoadError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "yaml" || ext == "yml" => Self::from_yaml(path),
            Some(ext) if ext == "dax" || ext == "xml" => Self::from_dax(path, config),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}
