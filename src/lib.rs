//! Parser for Full Tilt Poker knockout tournament hand histories.
//!
//! A history file is split into hand blocks, each block is parsed on its own
//! into a [`Hand`] and checked for consistency. A block that fails yields a
//! [`ParseFailure`] and the blocks after it are still parsed.

pub mod blocks;
pub mod cards;
pub mod cli;
pub mod common;
pub mod context;
pub mod error;
pub mod exit_code;
pub mod ledger;
pub mod logging;
pub mod parser;
pub mod reader;
pub mod summary_parser;
mod validate;

pub use blocks::{split_into_hand_blocks, HandBlock, HandBlocks};
pub use context::{Elimination, StackDrift, TournamentContext};
pub use error::{ParseError, ParseFailure, ParseStage, Parsed, ReadError, Warning};
pub use parser::{
    parse_actions, parse_board, parse_finishes, parse_hand, parse_header, parse_knockouts,
    parse_seats, Hand,
};
pub use reader::{parse_file, parse_text, HandStream, HistoryFile, ParseOptions};
pub use summary_parser::{parse_summary, Summary};
