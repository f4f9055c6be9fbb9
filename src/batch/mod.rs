//! Batch aggregation of OEM files
//!
//! A batch run lists a directory, parses every ephemeris file in it one after
//! another and writes the concatenated records as one JSON document.
//!
//! Malformed lines inside a file are handled by the section parser's
//! [`SkipPolicy`](crate::oem::SkipPolicy). A file that cannot be opened or
//! read aborts the whole batch, so a partial document is never written.

mod cancel;
mod config;
mod listing;

pub use cancel::CancelToken;
pub use config::{BatchConfig, DEFAULT_EXTENSION, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_PATH};
pub use listing::{list_oem_file_names, list_oem_files};

use chrono::NaiveDateTime;
use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::oem::{SectionParser, TelemetryBatch, TelemetryRecord};
use crate::time::{parse_epoch, EPOCH_SUFFIX};
use crate::{io_err, Result, TelemetryError};

/// Outcome of parsing one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// File that was parsed
    pub path: PathBuf,
    /// Records contributed to the batch
    pub records: usize,
    /// Lines inside the data section that were skipped
    pub skipped_lines: usize,
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Per-file results, in processing order
    pub files: Vec<FileSummary>,
    /// Records in the written document
    pub total_records: usize,
    /// Earliest epoch among records whose epoch could be parsed
    pub first_epoch: Option<NaiveDateTime>,
    /// Latest epoch among records whose epoch could be parsed
    pub last_epoch: Option<NaiveDateTime>,
    /// Smallest and largest distance from the frame origin, in source units
    pub radius_range: Option<(f64, f64)>,
    /// Where the document was written
    pub output_path: PathBuf,
}

impl BatchSummary {
    fn new(files: Vec<FileSummary>, batch: &TelemetryBatch, output_path: PathBuf) -> Self {
        let epochs: Vec<NaiveDateTime> = batch
            .records()
            .iter()
            .filter_map(|record| record.epoch.strip_suffix(EPOCH_SUFFIX))
            .filter_map(parse_epoch)
            .collect();

        let radius_range = batch.records().iter().map(|r| r.radius()).fold(
            None,
            |range: Option<(f64, f64)>, radius| match range {
                Some((lo, hi)) => Some((lo.min(radius), hi.max(radius))),
                None => Some((radius, radius)),
            },
        );

        Self {
            files,
            total_records: batch.len(),
            first_epoch: epochs.iter().min().copied(),
            last_epoch: epochs.iter().max().copied(),
            radius_range,
            output_path,
        }
    }
}

/// Parses sets of OEM files into a single [`TelemetryBatch`]
///
/// Files are processed sequentially and each file is closed before the next
/// one is opened.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: BatchConfig,
    cancel: Option<CancelToken>,
}

impl Aggregator {
    /// Create an aggregator with the given configuration
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Check `token` before each file and stop once it is cancelled
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Parse one file, returning its records in file order
    pub fn parse_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(Vec<TelemetryRecord>, FileSummary)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let mut parser = SectionParser::new(BufReader::new(file).lines(), self.config.section);

        let mut records = Vec::new();
        for record in parser.by_ref() {
            records.push(record.map_err(|e| e.in_file(path))?);
        }

        let summary = FileSummary {
            path: path.to_path_buf(),
            records: records.len(),
            skipped_lines: parser.session().skipped_lines(),
        };
        Ok((records, summary))
    }

    /// Parse every path whose name ends with the configured extension
    ///
    /// Paths are processed in the order given; no sorting is applied. Any
    /// file-level failure aborts the batch.
    pub fn aggregate<I, P>(&self, paths: I) -> Result<TelemetryBatch>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Ok(self.aggregate_with_summary(paths)?.0)
    }

    /// Like [`Aggregator::aggregate`], also returning per-file summaries
    pub fn aggregate_with_summary<I, P>(
        &self,
        paths: I,
    ) -> Result<(TelemetryBatch, Vec<FileSummary>)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.config.validate()?;

        let mut batch = TelemetryBatch::new();
        let mut summaries = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if !self.config.matches_extension(path) {
                continue;
            }

            if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
                warn!("Batch cancelled after {} files", summaries.len());
                return Err(TelemetryError::Cancelled {
                    files_processed: summaries.len(),
                });
            }

            let (records, summary) = self.parse_file(path)?;
            if summary.records == 0 {
                warn!("No state vectors found in {}", path.display());
            } else {
                info!(
                    "Read {} records from {} (skipped {} lines)",
                    summary.records,
                    path.display(),
                    summary.skipped_lines
                );
            }

            batch.extend(records);
            summaries.push(summary);
        }

        Ok((batch, summaries))
    }

    /// List the input directory, aggregate it and write the JSON document
    pub fn run(&self) -> Result<BatchSummary> {
        self.config.validate()?;

        let paths = list_oem_files(&self.config.input_dir, &self.config.extension)?;
        info!(
            "Found {} ephemeris files in {}",
            paths.len(),
            self.config.input_dir.display()
        );

        let (batch, files) = self.aggregate_with_summary(&paths)?;
        batch.write_json(&self.config.output_path)?;
        info!(
            "Wrote {} records to {}",
            batch.len(),
            self.config.output_path.display()
        );

        Ok(BatchSummary::new(files, &batch, self.config.output_path.clone()))
    }
}

/// Aggregate `paths` with the default configuration
pub fn aggregate<I, P>(paths: I) -> Result<TelemetryBatch>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    Aggregator::default().aggregate(paths)
}
