//! Orbit Ephemeris Message (OEM) reading
//!
//! OEM is the CCSDS text format for spacecraft ephemerides. This module only
//! reads the state-vector rows of a file; header, metadata values, velocity
//! columns and covariance blocks are skipped.
//!
//! # Main Components
//!
//! - `record`: [`TelemetryRecord`] and the [`TelemetryBatch`] collection
//! - `section`: the marker-driven section parser

pub mod record;
pub mod section;

pub use self::record::{TelemetryBatch, TelemetryRecord};
pub use self::section::{
    parse_row, parse_section, ParseSession, RowLayout, SectionOptions, SectionParser,
    SectionState, SkipPolicy, COVARIANCE_START_MARKER, META_STOP_MARKER,
};
