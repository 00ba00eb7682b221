/// Prefix of the header line that opens every hand.
pub const HAND_MARKER: &str = "Full Tilt Poker Game #";

/// Raw text of one hand, borrowed from the file contents.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HandBlock<'a> {
    pub index: usize,
    /// Line number of the block's first line in the file, starting at 1.
    pub line: usize,
    pub text: &'a str,
}

/// Iterator over the hand blocks of a history file.
///
/// Blocks that only hold whitespace are skipped. Text found before the first
/// header is still yielded so that it gets reported instead of vanishing.
#[derive(Debug, Clone)]
pub struct HandBlocks<'a> {
    rest: &'a str,
    line: usize,
    index: usize,
}

pub fn split_into_hand_blocks(text: &str) -> HandBlocks<'_> {
    HandBlocks {
        rest: text,
        line: 1,
        index: 0,
    }
}

fn is_hand_start(segment: &str) -> bool {
    segment.trim_start().starts_with(HAND_MARKER)
}

impl<'a> Iterator for HandBlocks<'a> {
    type Item = HandBlock<'a>;

    fn next(&mut self) -> Option<HandBlock<'a>> {
        while !self.rest.is_empty() {
            let start_line = self.line;
            let mut end = 0;
            for (i, segment) in self.rest.split_inclusive('\n').enumerate() {
                if i > 0 && is_hand_start(segment) {
                    break;
                }
                end += segment.len();
                self.line += 1;
            }
            let (text, rest) = self.rest.split_at(end);
            self.rest = rest;
            if text.trim().is_empty() {
                continue;
            }
            let block = HandBlock {
                index: self.index,
                line: start_line,
                text,
            };
            self.index += 1;
            return Some(block);
        }
        None
    }
}
