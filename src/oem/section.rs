//! Extraction of the state-vector section from OEM text
//!
//! An OEM file carries its ephemeris rows between the end of a metadata block
//! (`META_STOP`) and the start of an optional covariance block
//! (`COVARIANCE_START`). The parser walks the lines once, moving through three
//! states:
//!
//! - [`SectionState::BeforeSection`]: waiting for `META_STOP`. That line is
//!   never data, even when it also contains `COVARIANCE_START`.
//! - [`SectionState::InSection`]: every line is a candidate row of the form
//!   `<epoch> <x> <y> <z>`. A line containing `COVARIANCE_START` ends the
//!   section.
//! - [`SectionState::Done`]: nothing more is read from the file.
//!
//! Reaching the end of input in any state is not an error; whatever records
//! were produced are the result.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::io;

use super::record::TelemetryRecord;
use crate::time::normalize_epoch;
use crate::{Result, TelemetryError};

/// Marker closing the metadata block and opening the data section
pub const META_STOP_MARKER: &str = "META_STOP";

/// Marker opening the covariance block and closing the data section
pub const COVARIANCE_START_MARKER: &str = "COVARIANCE_START";

/// Keyword introducing an OEM comment line
const COMMENT_KEYWORD: &str = "COMMENT";

lazy_static! {
    // Optional sign, digits with optional fraction (or a bare fraction), optional exponent.
    static ref NUMERIC_TOKEN: Regex =
        Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?$").expect("numeric pattern is valid");
}

/// Position of a [`ParseSession`] relative to the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    /// `META_STOP` not seen yet
    BeforeSection,
    /// Between `META_STOP` and `COVARIANCE_START`
    InSection,
    /// `COVARIANCE_START` seen; the rest of the file is ignored
    Done,
}

/// What to do with a line inside the section that is not a data row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Drop the line silently
    #[default]
    Lenient,
    /// Report the line as [`TelemetryError::MalformedLine`]
    ///
    /// Blank lines and `COMMENT` lines are still skipped.
    Strict,
}

/// Accepted column layout for data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLayout {
    /// Exactly `epoch x y z`
    #[default]
    PositionOnly,
    /// `epoch x y z` followed by any further columns (velocity, acceleration),
    /// which are ignored
    PositionPrefix,
}

/// Options controlling how a section is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionOptions {
    pub skip_policy: SkipPolicy,
    pub row_layout: RowLayout,
}

impl SectionOptions {
    /// Set the skip policy
    pub fn with_skip_policy(mut self, skip_policy: SkipPolicy) -> Self {
        self.skip_policy = skip_policy;
        self
    }

    /// Set the row layout
    pub fn with_row_layout(mut self, row_layout: RowLayout) -> Self {
        self.row_layout = row_layout;
        self
    }
}

/// Parse one candidate data row into a record
///
/// Returns `None` unless the line is an epoch token followed by three numeric
/// tokens (and, for [`RowLayout::PositionPrefix`], optionally more columns).
pub fn parse_row(line: &str, layout: RowLayout) -> Option<TelemetryRecord> {
    let mut tokens = line.split_whitespace();
    let epoch = tokens.next()?;

    let mut position = [0.0; 3];
    for slot in position.iter_mut() {
        let token = tokens.next()?;
        if !NUMERIC_TOKEN.is_match(token) {
            return None;
        }
        // Overflowing literals such as 1e400 parse to infinity
        *slot = token.parse::<f64>().ok().filter(|v| v.is_finite())?;
    }

    if layout == RowLayout::PositionOnly && tokens.next().is_some() {
        return None;
    }

    Some(TelemetryRecord::new(normalize_epoch(epoch), position))
}

/// Per-file parsing state
///
/// Created at the start of one file, fed line by line and discarded once the
/// file is finished.
#[derive(Debug, Clone)]
pub struct ParseSession {
    state: SectionState,
    options: SectionOptions,
    line_number: usize,
    records: usize,
    skipped_lines: usize,
}

impl ParseSession {
    /// Start a session in [`SectionState::BeforeSection`]
    pub fn new(options: SectionOptions) -> Self {
        Self {
            state: SectionState::BeforeSection,
            options,
            line_number: 0,
            records: 0,
            skipped_lines: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> SectionState {
        self.state
    }

    /// Whether the terminal marker has been seen
    pub fn is_done(&self) -> bool {
        self.state == SectionState::Done
    }

    /// Number of lines fed so far (1-based number of the last line)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Records produced so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Lines inside the section that did not form a record
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Feed the next line
    ///
    /// Returns `Ok(Some(record))` for a data row, `Ok(None)` for markers,
    /// lines outside the section and skipped lines. Only
    /// [`SkipPolicy::Strict`] produces errors.
    pub fn feed(&mut self, line: &str) -> Result<Option<TelemetryRecord>> {
        self.line_number += 1;

        match self.state {
            SectionState::BeforeSection => {
                if line.contains(META_STOP_MARKER) {
                    self.state = SectionState::InSection;
                }
                Ok(None)
            }
            SectionState::InSection => {
                if line.contains(COVARIANCE_START_MARKER) {
                    self.state = SectionState::Done;
                    return Ok(None);
                }

                if let Some(record) = parse_row(line, self.options.row_layout) {
                    self.records += 1;
                    return Ok(Some(record));
                }

                self.skipped_lines += 1;
                if self.options.skip_policy == SkipPolicy::Strict && !is_ignorable(line) {
                    return Err(TelemetryError::MalformedLine {
                        path: None,
                        line_number: self.line_number,
                        content: line.to_string(),
                    });
                }
                debug!("Skipping line {}: {:?}", self.line_number, line);
                Ok(None)
            }
            SectionState::Done => Ok(None),
        }
    }
}

impl Default for ParseSession {
    fn default() -> Self {
        Self::new(SectionOptions::default())
    }
}

/// Lines that never count as malformed, even under [`SkipPolicy::Strict`]
fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with(COMMENT_KEYWORD)
}

/// Lazy, single-pass iterator over the records of one file
///
/// Pulls lines from `lines` only until the section ends, so the tail of a
/// file after `COVARIANCE_START` is never read. The first error (I/O or a
/// strict-mode malformed line) is yielded once and ends iteration.
pub struct SectionParser<I> {
    lines: I,
    session: ParseSession,
    failed: bool,
}

impl<I> SectionParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    /// Create a parser over fallible lines, e.g. `BufRead::lines()`
    pub fn new(lines: I, options: SectionOptions) -> Self {
        Self {
            lines,
            session: ParseSession::new(options),
            failed: false,
        }
    }

    /// The underlying session, for state and counters
    pub fn session(&self) -> &ParseSession {
        &self.session
    }
}

impl<I> Iterator for SectionParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<TelemetryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && !self.session.is_done() {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(TelemetryError::IoError(e)));
                }
            };

            match self.session.feed(&line) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Parse in-memory lines with the default (lenient, position-only) options
///
/// ```
/// use oemfield::oem::parse_section;
///
/// let text = "META_STOP\n2021-01-01T00:00:00.000000 1.0 2.0 3.0\nCOVARIANCE_START\n";
/// let records: Vec<_> = parse_section(text.lines()).collect();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].epoch, "2021-01-01T00:00:00.000000Z");
/// ```
pub fn parse_section<I, S>(lines: I) -> impl Iterator<Item = TelemetryRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut session = ParseSession::default();
    lines
        .into_iter()
        .map_while(move |line| {
            if session.is_done() {
                return None;
            }
            // Lenient sessions never return errors
            Some(session.feed(line.as_ref()).ok().flatten())
        })
        .flatten()
}
