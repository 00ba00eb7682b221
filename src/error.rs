//! Errors and diagnostics produced while parsing hand histories.
//!
//! Failures are scoped to one hand: [`ParseFailure`] wraps a [`ParseError`] with
//! the stage that raised it and the raw block, and never stops the stream.
//! [`Warning`]s are non-fatal and travel next to the parsed value in [`Parsed`].

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::cards::Card;
use crate::parser::StreetType;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("cannot parse amount {0:?}")]
pub struct AmountParseError(pub String);

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("malformed seat line {line_no} {line:?}: {reason}")]
    MalformedSeatLine {
        line_no: usize,
        line: String,
        reason: String,
    },
    #[error("hand has no seat lines")]
    MissingSeats,
    #[error("line {line_no}: {source}")]
    AmountParse {
        line_no: usize,
        source: AmountParseError,
    },
    #[error("invalid card {0:?}")]
    InvalidCard(String),
    #[error("card {0} is dealt more than once")]
    DuplicateCard(Card),
    #[error("inconsistent board: {0}")]
    InconsistentBoard(String),
    #[error("malformed summary: {0}")]
    MalformedSummary(String),
    #[error("line {line_no}: {name:?} is not seated at this table")]
    UnknownPlayer { line_no: usize, name: String },
    #[error("action by {name:?} references undeclared seat {seat}")]
    PhantomSeat { name: String, seat: u32 },
    #[error("{what} does not balance: expected {expected}, found {actual}")]
    Unbalanced {
        what: &'static str,
        expected: f64,
        actual: f64,
    },
    #[error("{player} is knocked out but ends the hand with {stack} chips")]
    KnockoutWithoutBust { player: String, stack: f64 },
    #[error("{player} acts on the {street} after going all in")]
    ActionAfterElimination { player: String, street: StreetType },
    #[error("{player} ends the hand with a negative stack ({stack})")]
    NegativeStack { player: String, stack: f64 },
}

/// The step of `parse_hand` that rejected a block.
#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    Header,
    Seats,
    Actions,
    Board,
    Knockouts,
    Summary,
    Validation,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ParseStage::Header => "header",
                ParseStage::Seats => "seats",
                ParseStage::Actions => "actions",
                ParseStage::Board => "board",
                ParseStage::Knockouts => "knockouts",
                ParseStage::Summary => "summary",
                ParseStage::Validation => "validation",
            }
        )
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
#[error("hand #{index} (line {line}): {stage} stage failed: {error}")]
pub struct ParseFailure {
    /// Position of the block in its file, starting at 0.
    pub index: usize,
    /// Line of the block's first line in its file, starting at 1.
    pub line: usize,
    pub stage: ParseStage,
    #[source]
    pub error: ParseError,
    pub raw: String,
}

#[derive(Debug, Error, PartialEq, Eq, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("line {line_no}: unrecognized action {line:?}")]
    UnrecognizedAction { line_no: usize, line: String },
    #[error("line {line_no}: unrecognized summary line {line:?}")]
    UnrecognizedSummaryLine { line_no: usize, line: String },
    #[error("hand has no summary section")]
    MissingSummary,
}

/// A value together with the non-fatal diagnostics collected while parsing it.
#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Parsed<T> {
    #[serde(flatten)]
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Parsed<T> {
    pub fn new(value: T) -> Parsed<T> {
        Parsed {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Parsed<T> {
        Parsed { value, warnings }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{name} contains no hand histories")]
    EmptyFile { name: String },
}
