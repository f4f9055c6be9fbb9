//! Configuration for a batch run

use std::path::{Path, PathBuf};

use crate::oem::{RowLayout, SectionOptions, SkipPolicy};
use crate::{Result, TelemetryError};

/// Default directory scanned for ephemeris files
pub const DEFAULT_INPUT_DIR: &str = "static/oem_files";

/// Default location of the JSON document
pub const DEFAULT_OUTPUT_PATH: &str = "processed_telemetry.json";

/// Default ephemeris file extension
pub const DEFAULT_EXTENSION: &str = ".oem";

/// Everything a batch run needs, passed in explicitly
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Directory listed by [`crate::batch::Aggregator::run`]
    pub input_dir: PathBuf,
    /// Where the JSON document is written
    pub output_path: PathBuf,
    /// File name suffix selecting ephemeris files (case-sensitive)
    pub extension: String,
    /// Options for each file's section parser
    pub section: SectionOptions,
}

impl BatchConfig {
    /// Create a config for the given input directory and output file
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_dir: P, output_path: Q) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the input directory
    pub fn with_input_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.input_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the output file
    pub fn with_output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the file extension filter
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the policy for malformed data lines
    pub fn with_skip_policy(mut self, skip_policy: SkipPolicy) -> Self {
        self.section.skip_policy = skip_policy;
        self
    }

    /// Set the accepted data row layout
    pub fn with_row_layout(mut self, row_layout: RowLayout) -> Self {
        self.section.row_layout = row_layout;
        self
    }

    /// Check the config for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(TelemetryError::ConfigError(
                "File extension must not be empty".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(TelemetryError::ConfigError(
                "Output path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `path` has a file name ending in the configured extension
    pub fn matches_extension<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.extension))
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            extension: DEFAULT_EXTENSION.to_string(),
            section: SectionOptions::default(),
        }
    }
}
