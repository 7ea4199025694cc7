use std::{fmt::Display, io};

use bevy_derive::{Deref, DerefMut};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{coordinate::CoordinateError, section::Section};

#[derive(Error, Debug)]
pub enum SctError {
    #[error("failed to read .sct file: {0:?}")]
    FileRead(#[from] io::Error),
}

/// Why a single line, record or airway could not be turned into data.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ParseErrorKind {
    #[error("unknown section header [{0}]")]
    UnknownSectionHeader(String),
    #[error("orphaned line outside of any section")]
    OrphanedLine,
    #[error("malformed {0} record")]
    MalformedRecord(Section),
    #[error("invalid coordinate format: {0}")]
    InvalidCoordinateFormat(#[from] CoordinateError),
    #[error("unknown fix name {0}")]
    UnresolvedFixReference(String),
    #[error("unknown airspace class {0}")]
    InvalidAirspaceClass(String),
    #[error("unexpected line {0} in INFO section")]
    InfoOverflow(usize),
    #[error("couldn't find any segments for airway {0}")]
    NoSegmentsForRoute(String),
    #[error("no suitable airport found for runway {0}/{1}")]
    NoSuitableAirportForRunway(String, String),
    #[error("no fix found within {tolerance_nm} NM of {coordinate}")]
    NoFixNearCoordinate {
        coordinate: String,
        tolerance_nm: f64,
    },
    #[error("fix {fix} found multiple times in airway {airway}")]
    CyclicOrMalformedAirway { airway: String, fix: String },
    #[error("unsupported topology in airway {airway}: {reason}")]
    UnsupportedAirwayTopology { airway: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParseError {
    pub line_number: usize,
    pub line: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line_number, self.kind, self.line)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn record(&mut self, line_number: usize, line: &str, kind: ParseErrorKind) {
        debug_assert!(line_number >= 1, "line numbers are 1-based");
        let error = ParseError {
            line_number,
            line: line.to_string(),
            kind,
        };
        debug!("{error}");
        self.0.push(error);
    }
}
