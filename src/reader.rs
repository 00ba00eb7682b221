use std::fs;
use std::iter::Take;
use std::path::Path;

use tracing::{debug, warn};

use crate::blocks::{split_into_hand_blocks, HandBlocks};
use crate::error::{ParseFailure, Parsed, ReadError};
use crate::parser::{parse_hand, Hand};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Stop after this many hand blocks.
    pub max_hands: Option<usize>,
}

/// Contents of one hand-history file, read once.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    name: String,
    text: String,
}

impl HistoryFile {
    pub fn open(path: impl AsRef<Path>) -> Result<HistoryFile, ReadError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let bytes = fs::read(path).map_err(|source| ReadError::Io {
            path: name.clone(),
            source,
        })?;
        debug!(file = %name, bytes = bytes.len(), "read hand history");
        // player names from older clients may be Latin-1
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %name, "replacing invalid UTF-8 sequences");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        HistoryFile::from_text(name, text)
    }

    /// Rejects input holding nothing but whitespace.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Result<HistoryFile, ReadError> {
        let name = name.into();
        let mut text = text.into();
        // exports from the client start with a byte order mark
        if text.starts_with('\u{feff}') {
            text.replace_range(..'\u{feff}'.len_utf8(), "");
        }
        if text.trim().is_empty() {
            return Err(ReadError::EmptyFile { name });
        }
        Ok(HistoryFile { name, text })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hands(&self, options: ParseOptions) -> HandStream<'_> {
        HandStream::new(&self.text, options)
    }
}

/// Lazily parses hand blocks in file order. A block that fails does not stop
/// the blocks after it.
#[derive(Debug, Clone)]
pub struct HandStream<'a> {
    blocks: Take<HandBlocks<'a>>,
}

impl<'a> HandStream<'a> {
    fn new(text: &'a str, options: ParseOptions) -> HandStream<'a> {
        HandStream {
            blocks: split_into_hand_blocks(text).take(options.max_hands.unwrap_or(usize::MAX)),
        }
    }
}

impl<'a> Iterator for HandStream<'a> {
    type Item = Result<Parsed<Hand>, ParseFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        self.blocks.next().map(parse_hand)
    }
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<HistoryFile, ReadError> {
    HistoryFile::open(path)
}

/// Parses in-memory text, for callers that already hold the file contents.
pub fn parse_text(text: &str, options: ParseOptions) -> Result<HandStream<'_>, ReadError> {
    if text.trim_start_matches('\u{feff}').trim().is_empty() {
        return Err(ReadError::EmptyFile {
            name: String::from("<text>"),
        });
    }
    Ok(HandStream::new(text.trim_start_matches('\u{feff}'), options))
}
