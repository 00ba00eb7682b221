use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1, take_until};
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, opt, rest, value};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::IResult;
use serde::Serialize;

use crate::cards::{format_cards, parse_cards, Card};
use crate::common::{amount_from_str, format_amount};
use crate::error::{ParseError, Parsed, Warning};
use crate::parser::{hand_lines, match_player, HandLine, Seat, Section};

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct SidePot {
    pub number: Option<u32>,
    pub amount: f64,
}

#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Run {
    First,
    Second,
}

impl Run {
    /// Position of the run-out in `Hand::boards`.
    pub fn index(self) -> usize {
        match self {
            Run::First => 0,
            Run::Second => 1,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct SummaryBoard {
    pub run: Option<Run>,
    pub cards: Vec<Card>,
}

impl SummaryBoard {
    pub fn run_index(&self) -> usize {
        self.run.map_or(0, Run::index)
    }
}

impl fmt::Display for SummaryBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.run {
            Some(Run::First) => write!(f, "FIRST ")?,
            Some(Run::Second) => write!(f, "SECOND ")?,
            None => {}
        }
        write!(f, "Board: {}", format_cards(&self.cards))
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Button,
    SmallBlind,
    BigBlind,
}

impl Position {
    fn parse(input: &str) -> IResult<&str, Position> {
        alt((
            value(Position::Button, tag(" (button)")),
            value(Position::SmallBlind, tag(" (small blind)")),
            value(Position::BigBlind, tag(" (big blind)")),
        ))(input)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Position::Button => "button",
                Position::SmallBlind => "small blind",
                Position::BigBlind => "big blind",
            }
        )
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum FoldPoint {
    BeforeFlop,
    Flop,
    Turn,
    River,
    DidNotBet,
}

#[derive(Debug, PartialEq, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Showed {
        cards: Vec<Card>,
        won: Option<f64>,
        description: Option<String>,
    },
    Folded {
        point: FoldPoint,
    },
    Collected {
        amount: f64,
        mucked: bool,
    },
    Mucked {
        cards: Vec<Card>,
    },
    SittingOut,
    Other {
        text: String,
    },
}

impl Outcome {
    /// Cards this outcome reveals, if any.
    pub fn cards(&self) -> &[Card] {
        match self {
            Outcome::Showed { cards, .. } | Outcome::Mucked { cards } => cards,
            _ => &[],
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Showed {
                cards,
                won,
                description,
            } => {
                write!(f, "showed {}", format_cards(cards))?;
                match won {
                    Some(amount) => write!(f, " and won ({})", format_amount(*amount))?,
                    None => write!(f, " and lost")?,
                }
                if let Some(description) = description {
                    write!(f, " with {}", description)?;
                }
                Ok(())
            }
            Outcome::Folded { point } => match point {
                FoldPoint::BeforeFlop => write!(f, "folded before the Flop"),
                FoldPoint::Flop => write!(f, "folded on the Flop"),
                FoldPoint::Turn => write!(f, "folded on the Turn"),
                FoldPoint::River => write!(f, "folded on the River"),
                FoldPoint::DidNotBet => write!(f, "didn't bet (folded)"),
            },
            Outcome::Collected { amount, mucked } => {
                write!(f, "collected ({})", format_amount(*amount))?;
                if *mucked {
                    write!(f, ", mucked")?;
                }
                Ok(())
            }
            Outcome::Mucked { cards } if cards.is_empty() => write!(f, "mucked"),
            Outcome::Mucked { cards } => write!(f, "mucked {}", format_cards(cards)),
            Outcome::SittingOut => write!(f, "is sitting out"),
            Outcome::Other { text } => write!(f, "{}", text),
        }
    }
}

/// Outcome as matched by the grammar, before amounts and cards are checked.
#[derive(Debug, PartialEq, Clone, Copy)]
enum RawOutcome<'a> {
    Showed {
        cards: &'a str,
        won: Option<&'a str>,
        description: Option<&'a str>,
    },
    Folded(FoldPoint),
    Collected {
        amount: &'a str,
        mucked: bool,
    },
    Mucked(Option<&'a str>),
    SittingOut,
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_until("]"), char(']'))(input)
}

fn description(input: &str) -> IResult<&str, Option<&str>> {
    opt(preceded(tag(" with "), rest))(input)
}

impl<'a> RawOutcome<'a> {
    fn parse(input: &'a str) -> IResult<&'a str, RawOutcome<'a>> {
        let won = map(
            tuple((
                delimited(tag(" and won ("), take_until(")"), char(')')),
                description,
            )),
            |(amount, description)| (Some(amount), description),
        );
        let lost = map(preceded(tag(" and lost"), description), |description| {
            (None, description)
        });
        alt((
            map(
                tuple((preceded(tag("showed "), bracketed), alt((won, lost)))),
                |(cards, (won, description))| RawOutcome::Showed {
                    cards,
                    won,
                    description,
                },
            ),
            map(
                alt((
                    value(FoldPoint::BeforeFlop, tag("folded before the Flop")),
                    value(FoldPoint::Flop, tag("folded on the Flop")),
                    value(FoldPoint::Turn, tag("folded on the Turn")),
                    value(FoldPoint::River, tag("folded on the River")),
                    value(FoldPoint::DidNotBet, tag("didn't bet (folded)")),
                )),
                RawOutcome::Folded,
            ),
            map(
                tuple((
                    delimited(tag("collected ("), take_until(")"), char(')')),
                    opt(tag(", mucked")),
                )),
                |(amount, mucked): (&str, Option<&str>)| RawOutcome::Collected {
                    amount,
                    mucked: mucked.is_some(),
                },
            ),
            map(
                preceded(tag("mucked"), opt(preceded(char(' '), bracketed))),
                RawOutcome::Mucked,
            ),
            value(RawOutcome::SittingOut, tag("is sitting out")),
        ))(input)
    }

    fn into_outcome(self, line_no: usize) -> Result<Outcome, ParseError> {
        let amount = |text: &str| {
            amount_from_str(text).map_err(|source| ParseError::AmountParse { line_no, source })
        };
        let outcome = match self {
            RawOutcome::Showed {
                cards,
                won,
                description,
            } => Outcome::Showed {
                cards: parse_cards(cards)?,
                won: won.map(amount).transpose()?,
                description: description.map(str::to_owned),
            },
            RawOutcome::Folded(point) => Outcome::Folded { point },
            RawOutcome::Collected { amount: a, mucked } => Outcome::Collected {
                amount: amount(a)?,
                mucked,
            },
            RawOutcome::Mucked(cards) => Outcome::Mucked {
                cards: cards.map(parse_cards).transpose()?.unwrap_or_default(),
            },
            RawOutcome::SittingOut => Outcome::SittingOut,
        };
        Ok(outcome)
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct SummarySeat {
    pub seat_number: u32,
    pub player_name: String,
    pub position: Option<Position>,
    pub outcome: Outcome,
}

impl fmt::Display for SummarySeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seat {}: {}", self.seat_number, self.player_name)?;
        if let Some(position) = self.position {
            write!(f, " ({})", position)?;
        }
        write!(f, " {}", self.outcome)
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Summary {
    pub total_pot: f64,
    pub main_pot: Option<f64>,
    pub side_pots: Vec<SidePot>,
    pub rake: Option<f64>,
    pub boards: Vec<SummaryBoard>,
    pub seats: Vec<SummarySeat>,
}

impl Summary {
    pub fn seat(&self, player_name: &str) -> Option<&SummarySeat> {
        self.seats
            .iter()
            .find(|seat| seat.player_name == player_name)
    }

    pub fn pot_line(&self) -> String {
        let mut line = format!("Total pot {}", format_amount(self.total_pot));
        if let Some(main_pot) = self.main_pot {
            line.push_str(&format!(" Main pot {}.", format_amount(main_pot)));
        }
        for side_pot in &self.side_pots {
            match side_pot.number {
                Some(n) => line.push_str(&format!(
                    " Side pot {} {}.",
                    n,
                    format_amount(side_pot.amount)
                )),
                None => line.push_str(&format!(" Side pot {}.", format_amount(side_pot.amount))),
            }
        }
        match self.rake {
            Some(rake) => line.push_str(&format!(" | Rake {}", format_amount(rake))),
            None => line.push_str(" | No rake"),
        }
        line
    }

    /// The summary section as the site prints it, without the `*** SUMMARY ***` marker.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.pot_line()];
        lines.extend(self.boards.iter().map(SummaryBoard::to_string));
        lines.extend(self.seats.iter().map(SummarySeat::to_string));
        lines
    }
}

/// Pot line with its amounts still as text.
struct RawPotLine<'a> {
    total: &'a str,
    main: Option<&'a str>,
    sides: Vec<(Option<u32>, &'a str)>,
    rake: Option<&'a str>,
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ')(input)
}

impl<'a> RawPotLine<'a> {
    /// `Total pot 2,400 Main pot 1,200. Side pot 1,200. | Rake 0`
    fn parse(input: &'a str) -> IResult<&'a str, RawPotLine<'a>> {
        let side_pot = tuple((
            tag(" Side pot "),
            opt(terminated(nom::character::complete::u32, char(' '))),
            token,
        ));
        let (input, (total, main, sides, _, rake)) = tuple((
            preceded(tag("Total pot "), token),
            opt(preceded(tag(" Main pot "), token)),
            many0(map(side_pot, |(_, number, amount)| (number, amount))),
            tag(" | "),
            alt((
                map(preceded(tag("Rake "), rest), Some),
                value(None, tag("No rake")),
            )),
        ))(input)?;
        Ok((
            input,
            RawPotLine {
                total,
                main,
                sides,
                rake,
            },
        ))
    }
}

fn parse_pot_line(
    line_no: usize,
    text: &str,
) -> Result<(f64, Option<f64>, Vec<SidePot>, Option<f64>), ParseError> {
    let (_, raw) = all_consuming(RawPotLine::parse)(text).map_err(|_| {
        ParseError::MalformedSummary(format!("line {}: unreadable pot line {:?}", line_no, text))
    })?;
    // main and side pots end their sentence with a dot
    let amount = |text: &str| {
        amount_from_str(text.strip_suffix('.').unwrap_or(text))
            .map_err(|source| ParseError::AmountParse { line_no, source })
    };
    let mut side_pots = Vec::with_capacity(raw.sides.len());
    for (number, a) in raw.sides {
        side_pots.push(SidePot {
            number,
            amount: amount(a)?,
        });
    }
    Ok((
        amount(raw.total)?,
        raw.main.map(amount).transpose()?,
        side_pots,
        raw.rake.map(amount).transpose()?,
    ))
}

fn summary_board(input: &str) -> IResult<&str, (Option<Run>, &str)> {
    tuple((
        opt(alt((
            value(Run::First, tag("FIRST ")),
            value(Run::Second, tag("SECOND ")),
        ))),
        preceded(tag("Board: "), bracketed),
    ))(input)
}

fn seat_number(input: &str) -> IResult<&str, u32> {
    delimited(tag("Seat "), nom::character::complete::u32, tag(": "))(input)
}

fn parse_summary_seat(
    line: &HandLine<'_>,
    seats: &[Seat],
    warnings: &mut Vec<Warning>,
) -> Result<Option<SummarySeat>, ParseError> {
    let Ok((text, seat_number)) = seat_number(line.text) else {
        return Ok(None);
    };
    let Some((seat, text)) = match_player(seats, text) else {
        let name = text.split(" (").next().unwrap_or(text);
        return Err(ParseError::UnknownPlayer {
            line_no: line.line_no,
            name: name.to_owned(),
        });
    };
    let (text, position) = opt(Position::parse)(text).unwrap_or((text, None));
    let text = text.strip_prefix(' ').unwrap_or(text);
    let outcome = match all_consuming(RawOutcome::parse)(text) {
        Ok((_, raw)) => raw.into_outcome(line.line_no)?,
        Err(_) => {
            warnings.push(Warning::UnrecognizedSummaryLine {
                line_no: line.line_no,
                line: line.text.to_owned(),
            });
            Outcome::Other {
                text: text.to_owned(),
            }
        }
    };
    Ok(Some(SummarySeat {
        seat_number,
        player_name: seat.player_name.clone(),
        position,
        outcome,
    }))
}

/// Reads the `*** SUMMARY ***` section. A hand without one parses to `None`
/// with a warning.
pub fn parse_summary(block: &str, seats: &[Seat]) -> Result<Parsed<Option<Summary>>, ParseError> {
    let mut lines = hand_lines(block)
        .filter(|line| line.section == Section::Summary)
        .peekable();
    if lines.peek().is_none() {
        return Ok(Parsed::with_warnings(None, vec![Warning::MissingSummary]));
    }
    let mut pots = None;
    let mut boards = Vec::new();
    let mut summary_seats = Vec::new();
    let mut warnings = Vec::new();
    for line in lines.filter(|line| !line.marker) {
        if pots.is_none() && line.text.starts_with("Total pot ") {
            pots = Some(parse_pot_line(line.line_no, line.text)?);
        } else if let Ok((_, (run, cards))) = all_consuming(summary_board)(line.text) {
            boards.push(SummaryBoard {
                run,
                cards: parse_cards(cards)?,
            });
        } else if let Some(seat) = parse_summary_seat(&line, seats, &mut warnings)? {
            summary_seats.push(seat);
        } else {
            warnings.push(Warning::UnrecognizedSummaryLine {
                line_no: line.line_no,
                line: line.text.to_owned(),
            });
        }
    }
    let (total_pot, main_pot, side_pots, rake) =
        pots.ok_or_else(|| ParseError::MalformedSummary(String::from("missing pot line")))?;
    let summary = Summary {
        total_pot,
        main_pot,
        side_pots,
        rake,
        boards,
        seats: summary_seats,
    };
    Ok(Parsed::with_warnings(Some(summary), warnings))
}
