use std::collections::HashSet;
use std::fmt;
use std::iter::Enumerate;
use std::str::Lines;

use chrono::NaiveDateTime;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1, take_until, take_while1};
use nom::character::complete::{alpha1, char};
use nom::combinator::{all_consuming, map, map_res, opt, rest, value};
use nom::sequence::{delimited, preceded, separated_pair, terminated, tuple};
use nom::{IResult, Parser};
use serde::Serialize;
use tracing::{debug, trace};

use crate::blocks::{HandBlock, HAND_MARKER};
use crate::cards::{bracket_groups, parse_cards, Card};
use crate::common::{amount_from_str, parse_amount, PokerType};
use crate::error::{ParseError, ParseFailure, ParseStage, Parsed, Warning};
use crate::ledger::{settle, PlayerResult};
use crate::summary_parser::{parse_summary, Summary};
use crate::validate::validate;

const MAX_BOARD_CARDS: usize = 5;
const ALL_IN_SUFFIX: &str = ", and is all in";

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct BuyIn {
    pub buy_in: f64,
    pub fee: f64,
    pub bounty: Option<f64>,
}

impl BuyIn {
    fn parse(input: &str) -> IResult<&str, BuyIn> {
        let (input, ((buy_in, fee), bounty)) = tuple((
            separated_pair(parse_amount, tag(" + "), parse_amount),
            opt(preceded(tag(" + "), parse_amount)),
        ))(input)?;
        Ok((input, BuyIn { buy_in, fee, bounty }))
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct TournamentInfo {
    pub id: u64,
    pub name: String,
    pub buy_in: BuyIn,
}

impl TournamentInfo {
    /// Knockout tournaments either carry a bounty in the buy-in or say so in their name.
    pub fn is_knockout(&self) -> bool {
        self.buy_in.bounty.is_some()
            || self.name.contains("Knockout")
            || self.name.split_whitespace().any(|word| word == "KO")
    }
}

/// `"90 Player Knockout (218459123"`: the id sits in the last parenthesis.
fn split_tournament(text: &str) -> Result<(String, u64), &'static str> {
    let (name, id) = text.rsplit_once(" (").ok_or("missing tournament id")?;
    let id = id.parse::<u64>().map_err(|_| "tournament id is not numeric")?;
    Ok((name.to_owned(), id))
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Blinds {
    pub ante: Option<f64>,
    pub small_blind: f64,
    pub big_blind: f64,
}

impl Blinds {
    fn parse(input: &str) -> IResult<&str, Blinds> {
        let (input, ((small_blind, big_blind), ante)) = tuple((
            separated_pair(parse_amount, char('/'), parse_amount),
            opt(preceded(tag(" Ante "), parse_amount)),
        ))(input)?;
        Ok((
            input,
            Blinds {
                ante,
                small_blind,
                big_blind,
            },
        ))
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct HandHeader {
    pub hand_id: u64,
    pub tournament: TournamentInfo,
    pub table: String,
    pub blinds: Blinds,
    pub poker_type: PokerType,
    pub datetime: NaiveDateTime,
    pub timezone: String,
    pub button_seat: Option<u32>,
}

fn timestamp(input: &str) -> IResult<&str, (NaiveDateTime, &str)> {
    let time = take_while1(|c: char| c.is_ascii_digit() || c == ':');
    let date = take_while1(|c: char| c.is_ascii_digit() || c == '/');
    map_res(
        tuple((time, char(' '), alpha1, tag(" - "), date)),
        |(time, _, timezone, _, date): (&str, char, &str, &str, &str)| {
            NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y/%m/%d %H:%M:%S")
                .map(|datetime| (datetime, timezone))
        },
    )(input)
}

impl HandHeader {
    fn parse(input: &str) -> IResult<&str, HandHeader> {
        let (input, (hand_id, buy_in, (name, id))) = tuple((
            delimited(
                tag(HAND_MARKER),
                nom::character::complete::u64,
                tag(": "),
            ),
            terminated(BuyIn::parse, char(' ')),
            terminated(
                map_res(take_until("), Table "), split_tournament),
                tag("), Table "),
            ),
        ))(input)?;
        let (input, (table, blinds, poker_type, (datetime, timezone))) = tuple((
            terminated(take_until(" - "), tag(" - ")),
            terminated(Blinds::parse, tag(" - ")),
            terminated(PokerType::parse, tag(" - ")),
            timestamp,
        ))(input)?;
        Ok((
            input,
            HandHeader {
                hand_id,
                tournament: TournamentInfo { id, name, buy_in },
                table: table.to_owned(),
                blinds,
                poker_type,
                datetime,
                timezone: timezone.to_owned(),
                button_seat: None,
            },
        ))
    }
}

fn button_seat(input: &str) -> IResult<&str, u32> {
    preceded(
        tag("The button is in seat #"),
        nom::character::complete::u32,
    )(input)
}

/// Reads the header line and the button line of a hand.
pub fn parse_header(block: &str) -> Result<HandHeader, ParseError> {
    let line = block
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ParseError::MalformedHeader(String::from("empty hand block")))?;
    if !line.starts_with(HAND_MARKER) {
        return Err(ParseError::MalformedHeader(format!(
            "expected a line starting with {:?}, found {:?}",
            HAND_MARKER, line
        )));
    }
    let (_, mut header) = all_consuming(HandHeader::parse)(line).map_err(|_| {
        ParseError::MalformedHeader(format!("missing or unreadable fields in {:?}", line))
    })?;
    header.button_seat = block
        .lines()
        .find_map(|line| button_seat(line.trim()).ok().map(|(_, seat)| seat));
    Ok(header)
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Seat {
    pub seat_number: u32,
    pub player_name: String,
    pub stack: f64,
    pub sitting_out: bool,
}

fn seat_prefix(input: &str) -> IResult<&str, u32> {
    delimited(tag("Seat "), nom::character::complete::u32, tag(": "))(input)
}

impl Seat {
    /// Names may contain parentheses, so the stack is taken from the last ` (`.
    fn parse_line(line_no: usize, line: &str) -> Result<Seat, ParseError> {
        let malformed = |reason: &str| ParseError::MalformedSeatLine {
            line_no,
            line: line.to_owned(),
            reason: reason.to_owned(),
        };
        let (body, seat_number) = seat_prefix(line).map_err(|_| malformed("missing seat number"))?;
        let (body, sitting_out) = match body.strip_suffix(", is sitting out") {
            Some(body) => (body, true),
            None => (body, false),
        };
        let (player_name, stack) = body
            .strip_suffix(')')
            .and_then(|body| body.rsplit_once(" ("))
            .ok_or_else(|| malformed("stack is not in parentheses"))?;
        if player_name.trim().is_empty() {
            return Err(malformed("missing player name"));
        }
        let stack = amount_from_str(stack).map_err(|e| malformed(&e.to_string()))?;
        Ok(Seat {
            seat_number,
            player_name: player_name.to_owned(),
            stack,
            sitting_out,
        })
    }
}

pub fn parse_seats(block: &str) -> Result<Vec<Seat>, ParseError> {
    let mut seats: Vec<Seat> = Vec::new();
    for line in hand_lines(block).filter(|line| line.section == Section::Seats) {
        let seat = Seat::parse_line(line.line_no, line.text)?;
        let clash = if seats.iter().any(|s| s.seat_number == seat.seat_number) {
            Some("seat is declared twice")
        } else if seats.iter().any(|s| s.player_name == seat.player_name) {
            Some("player is seated twice")
        } else {
            None
        };
        if let Some(reason) = clash {
            return Err(ParseError::MalformedSeatLine {
                line_no: line.line_no,
                line: line.text.to_owned(),
                reason: reason.to_owned(),
            });
        }
        seats.push(seat);
    }
    if seats.is_empty() {
        return Err(ParseError::MissingSeats);
    }
    Ok(seats)
}

#[derive(Debug, PartialEq, Eq, Serialize, Clone, Copy)]
pub enum StreetType {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl StreetType {
    fn board_size(self) -> usize {
        match self {
            StreetType::Preflop => 0,
            StreetType::Flop => 3,
            StreetType::Turn => 4,
            StreetType::River | StreetType::Showdown => 5,
        }
    }

    fn previous_board_size(self) -> usize {
        match self {
            StreetType::Turn => 3,
            StreetType::River | StreetType::Showdown => 4,
            StreetType::Preflop | StreetType::Flop => 0,
        }
    }
}

impl fmt::Display for StreetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StreetType::Preflop => "preflop",
                StreetType::Flop => "flop",
                StreetType::Turn => "turn",
                StreetType::River => "river",
                StreetType::Showdown => "showdown",
            }
        )
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum Marker<'a> {
    HoleCards,
    Street {
        street: StreetType,
        run: usize,
        cards: &'a str,
    },
    ShowDown,
    Summary,
}

impl<'a> Marker<'a> {
    fn parse(input: &'a str) -> IResult<&'a str, Marker<'a>> {
        let run = map(
            opt(alt((value(0usize, tag("FIRST ")), value(1usize, tag("SECOND "))))),
            |run: Option<usize>| run.unwrap_or(0),
        );
        let street = alt((
            value(StreetType::Flop, tag("FLOP")),
            value(StreetType::Turn, tag("TURN")),
            value(StreetType::River, tag("RIVER")),
        ));
        alt((
            value(Marker::HoleCards, tag("*** HOLE CARDS ***")),
            value(Marker::ShowDown, tag("*** SHOW DOWN ***")),
            value(Marker::Summary, tag("*** SUMMARY ***")),
            map(
                tuple((tag("*** "), run, street, tag(" ***"), rest)),
                |(_, run, street, _, cards): (&str, usize, StreetType, &str, &str)| Marker::Street {
                    street,
                    run,
                    cards: cards.trim(),
                },
            ),
        ))(input)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Section {
    Header,
    Seats,
    Play,
    Summary,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HandLine<'a> {
    pub line_no: usize,
    pub text: &'a str,
    pub section: Section,
    pub street: StreetType,
    pub marker: bool,
}

/// Walks a hand block line by line, tracking the section and street each line belongs to.
pub(crate) struct HandLines<'a> {
    lines: Enumerate<Lines<'a>>,
    section: Option<Section>,
    street: StreetType,
}

pub(crate) fn hand_lines(block: &str) -> HandLines<'_> {
    HandLines {
        lines: block.lines().enumerate(),
        section: None,
        street: StreetType::Preflop,
    }
}

impl<'a> Iterator for HandLines<'a> {
    type Item = HandLine<'a>;

    fn next(&mut self) -> Option<HandLine<'a>> {
        for (i, raw) in self.lines.by_ref() {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let mut marker = false;
            let section = match self.section {
                None => Section::Header,
                Some(_) if text.starts_with("*** ") => match Marker::parse(text) {
                    Ok((_, found)) => {
                        marker = true;
                        match found {
                            Marker::HoleCards => self.street = StreetType::Preflop,
                            Marker::Street { street, .. } => self.street = street,
                            Marker::ShowDown => self.street = StreetType::Showdown,
                            Marker::Summary => {}
                        }
                        if found == Marker::Summary {
                            Section::Summary
                        } else {
                            Section::Play
                        }
                    }
                    Err(_) => match self.section {
                        Some(Section::Summary) => Section::Summary,
                        _ => Section::Play,
                    },
                },
                Some(Section::Header) | Some(Section::Seats) if text.starts_with("Seat ") => {
                    Section::Seats
                }
                Some(Section::Header) | Some(Section::Seats) => Section::Play,
                Some(section) => section,
            };
            self.section = Some(section);
            return Some(HandLine {
                line_no: i + 1,
                text,
                section,
                street: self.street,
                marker,
            });
        }
        None
    }
}

/// Finds the seated player a line starts with, preferring the longest name.
///
/// Names are matched against the seat list instead of being split out of the
/// line, so names containing spaces, quotes or parentheses stay intact.
pub(crate) fn match_player<'s, 'l>(seats: &'s [Seat], text: &'l str) -> Option<(&'s Seat, &'l str)> {
    seats
        .iter()
        .filter_map(|seat| {
            let rest = text.strip_prefix(seat.player_name.as_str())?;
            (rest.starts_with(' ') || rest.starts_with(':')).then_some((seat, rest))
        })
        .max_by_key(|(seat, _)| seat.player_name.len())
}

fn find_seat<'s>(seats: &'s [Seat], name: &str) -> Option<&'s Seat> {
    seats.iter().find(|seat| seat.player_name == name)
}

#[derive(Debug, PartialEq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Blind {
    SmallBlind,
    BigBlind,
    Ante,
    Other,
}

#[derive(Debug, PartialEq, Serialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PotLabel {
    Pot,
    MainPot,
    SidePot(Option<u32>),
}

impl PotLabel {
    fn parse(input: &str) -> IResult<&str, PotLabel> {
        alt((
            value(PotLabel::MainPot, tag("the main pot")),
            map(
                preceded(
                    tag("the side pot"),
                    opt(preceded(tag(" #"), nom::character::complete::u32)),
                ),
                PotLabel::SidePot,
            ),
            map(
                preceded(tag("side pot #"), nom::character::complete::u32),
                |n| PotLabel::SidePot(Some(n)),
            ),
            value(PotLabel::Pot, tag("the pot")),
        ))(input)
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionType {
    Post { blind: Blind, amount: f64 },
    Fold,
    Check,
    Call { amount: f64 },
    Bet { amount: f64 },
    Raise { to: f64 },
    Shows { cards: Vec<Card> },
    Mucks { cards: Vec<Card> },
    Collect { pot: PotLabel, amount: f64 },
    UncalledBetReturned { amount: f64 },
    SitOut,
    Return,
    TimeOut,
    Disconnect,
    Reconnect,
}

impl ActionType {
    /// Actions that put chips in or give up the hand.
    pub fn is_betting(&self) -> bool {
        matches!(
            self,
            ActionType::Post { .. }
                | ActionType::Fold
                | ActionType::Check
                | ActionType::Call { .. }
                | ActionType::Bet { .. }
                | ActionType::Raise { .. }
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ActionType::Post { .. } => "post",
                ActionType::Fold => "fold",
                ActionType::Check => "check",
                ActionType::Call { .. } => "call",
                ActionType::Bet { .. } => "bet",
                ActionType::Raise { .. } => "raise",
                ActionType::Shows { .. } => "show",
                ActionType::Mucks { .. } => "muck",
                ActionType::Collect { .. } => "collect",
                ActionType::UncalledBetReturned { .. } => "uncalled bet returned",
                ActionType::SitOut => "sit out",
                ActionType::Return => "return",
                ActionType::TimeOut => "time out",
                ActionType::Disconnect => "disconnect",
                ActionType::Reconnect => "reconnect",
            }
        )
    }
}

/// An action as matched by the grammar; amounts and cards are still text.
#[derive(Debug, PartialEq, Clone, Copy)]
enum RawAction<'a> {
    Post(Blind, &'a str),
    Fold,
    Check,
    Call(&'a str),
    Bet(&'a str),
    Raise(&'a str),
    Shows(&'a str),
    Mucks(Option<&'a str>),
    Collect(PotLabel, &'a str),
    SitOut,
    Return,
    TimeOut,
    Disconnect,
    Reconnect,
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_until("]"), char(']'))(input)
}

impl<'a> RawAction<'a> {
    fn parse(input: &'a str) -> IResult<&'a str, RawAction<'a>> {
        alt((
            map(preceded(tag("antes "), rest), |a| RawAction::Post(Blind::Ante, a)),
            map(preceded(tag("posts the small blind of "), rest), |a| {
                RawAction::Post(Blind::SmallBlind, a)
            }),
            map(preceded(tag("posts the big blind of "), rest), |a| {
                RawAction::Post(Blind::BigBlind, a)
            }),
            map(preceded(tag("posts "), rest), |a| RawAction::Post(Blind::Other, a)),
            value(RawAction::Fold, tag("folds")),
            value(RawAction::Check, tag("checks")),
            map(preceded(tag("calls "), rest), RawAction::Call),
            map(preceded(tag("bets "), rest), RawAction::Bet),
            map(preceded(tag("raises to "), rest), RawAction::Raise),
            // the hand description after the cards is not kept
            map(terminated(preceded(tag("shows "), bracketed), rest), RawAction::Shows),
            map(
                preceded(tag("mucks"), opt(preceded(char(' '), bracketed))),
                RawAction::Mucks,
            ),
            map(
                tuple((
                    alt((tag("wins "), tag("ties for "))),
                    PotLabel::parse,
                    delimited(tag(" ("), take_until(")"), char(')')),
                    rest,
                )),
                |(_, pot, amount, _)| RawAction::Collect(pot, amount),
            ),
            value(RawAction::SitOut, tag("is sitting out")),
            value(RawAction::Return, tag("has returned")),
            value(RawAction::TimeOut, tag("has timed out")),
            value(RawAction::Disconnect, tag("has been disconnected")),
            value(RawAction::Reconnect, tag("has reconnected")),
        ))(input)
    }

    fn into_action_type(self, line_no: usize) -> Result<ActionType, ParseError> {
        let amount = |text: &str| {
            amount_from_str(text).map_err(|source| ParseError::AmountParse { line_no, source })
        };
        let action = match self {
            RawAction::Post(blind, a) => ActionType::Post {
                blind,
                amount: amount(a)?,
            },
            RawAction::Fold => ActionType::Fold,
            RawAction::Check => ActionType::Check,
            RawAction::Call(a) => ActionType::Call { amount: amount(a)? },
            RawAction::Bet(a) => ActionType::Bet { amount: amount(a)? },
            RawAction::Raise(a) => ActionType::Raise { to: amount(a)? },
            RawAction::Shows(cards) => ActionType::Shows {
                cards: parse_cards(cards)?,
            },
            RawAction::Mucks(cards) => ActionType::Mucks {
                cards: cards.map(parse_cards).transpose()?.unwrap_or_default(),
            },
            RawAction::Collect(pot, a) => ActionType::Collect {
                pot,
                amount: amount(a)?,
            },
            RawAction::SitOut => ActionType::SitOut,
            RawAction::Return => ActionType::Return,
            RawAction::TimeOut => ActionType::TimeOut,
            RawAction::Disconnect => ActionType::Disconnect,
            RawAction::Reconnect => ActionType::Reconnect,
        };
        Ok(action)
    }
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Action {
    pub street: StreetType,
    pub seat_number: u32,
    pub player_name: String,
    pub action: ActionType,
    pub is_all_in: bool,
}

impl Action {
    pub fn amount(&self) -> Option<f64> {
        match self.action {
            ActionType::Post { amount, .. }
            | ActionType::Call { amount }
            | ActionType::Bet { amount }
            | ActionType::Collect { amount, .. }
            | ActionType::UncalledBetReturned { amount } => Some(amount),
            ActionType::Raise { to } => Some(to),
            _ => None,
        }
    }
}

/// What a line in the play section turned out to be.
#[derive(Debug)]
enum PlayLine<'s, 'l> {
    Action {
        seat: &'s Seat,
        raw: RawAction<'l>,
        is_all_in: bool,
    },
    Uncalled {
        seat: &'s Seat,
        amount: &'l str,
    },
    DealtTo {
        seat: &'s Seat,
        cards: &'l str,
    },
    Knockout {
        eliminator: &'s Seat,
        bounty: &'l str,
        eliminated: &'l str,
    },
    Finish {
        seat: &'s Seat,
        place: u32,
        prize: Option<&'l str>,
    },
    UnknownEliminator(&'l str),
    Chat,
    Dealer,
    UnknownPlayer(&'l str),
    Unrecognized,
}

fn classify<'s, 'l>(seats: &'s [Seat], text: &'l str) -> PlayLine<'s, 'l> {
    if button_seat(text).is_ok() {
        return PlayLine::Dealer;
    }
    if let Some(dealt) = text.strip_prefix("Dealt to ") {
        return dealt
            .strip_suffix(']')
            .and_then(|dealt| dealt.rsplit_once(" ["))
            .and_then(|(name, cards)| find_seat(seats, name).map(|seat| (seat, cards)))
            .map_or(PlayLine::Unrecognized, |(seat, cards)| PlayLine::DealtTo { seat, cards });
    }
    if let Some(uncalled) = text.strip_prefix("Uncalled bet of ") {
        return match uncalled.split_once(" returned to ") {
            Some((amount, name)) => match find_seat(seats, name) {
                Some(seat) => PlayLine::Uncalled { seat, amount },
                None => PlayLine::UnknownPlayer(name),
            },
            None => PlayLine::Unrecognized,
        };
    }
    let Some((seat, rest)) = match_player(seats, text) else {
        return classify_unseated(text);
    };
    if rest.starts_with(": ") {
        return PlayLine::Chat;
    }
    if let Ok((_, (bounty, eliminated))) = all_consuming(knockout_tail)(rest) {
        return PlayLine::Knockout {
            eliminator: seat,
            bounty,
            eliminated: eliminated.strip_suffix('.').unwrap_or(eliminated),
        };
    }
    let finish = rest.strip_suffix('.').unwrap_or(rest);
    if let Ok((_, (place, prize))) = all_consuming(finish_tail)(finish) {
        return PlayLine::Finish { seat, place, prize };
    }
    let rest = &rest[1..];
    let (rest, is_all_in) = match rest.strip_suffix(ALL_IN_SUFFIX) {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    match all_consuming(RawAction::parse)(rest) {
        Ok((_, raw)) => PlayLine::Action {
            seat,
            raw,
            is_all_in,
        },
        Err(_) => PlayLine::Unrecognized,
    }
}

/// Lines that start with no seated name: railbird chat, or a knockout
/// credited to someone who is not at the table.
fn classify_unseated<'s, 'l>(text: &'l str) -> PlayLine<'s, 'l> {
    if text.split_once(": ").is_some_and(|(speaker, _)| !speaker.is_empty()) {
        return PlayLine::Chat;
    }
    match text.split_once(" wins ") {
        Some((name, _)) if all_consuming(knockout_tail)(&text[name.len()..]).is_ok() => {
            PlayLine::UnknownEliminator(name)
        }
        _ => PlayLine::Unrecognized,
    }
}

fn play_lines(block: &str) -> impl Iterator<Item = HandLine<'_>> {
    hand_lines(block).filter(|line| line.section == Section::Play && !line.marker)
}

/// Collects actions in file order. Unknown lines are skipped with a warning.
pub fn parse_actions(block: &str, seats: &[Seat]) -> Result<Parsed<Vec<Action>>, ParseError> {
    let mut actions = Vec::new();
    let mut warnings = Vec::new();
    for line in play_lines(block) {
        let (seat, action, is_all_in) = match classify(seats, line.text) {
            PlayLine::Action {
                seat,
                raw,
                is_all_in,
            } => (seat, raw.into_action_type(line.line_no)?, is_all_in),
            PlayLine::Uncalled { seat, amount } => {
                let amount = amount_from_str(amount).map_err(|source| ParseError::AmountParse {
                    line_no: line.line_no,
                    source,
                })?;
                (seat, ActionType::UncalledBetReturned { amount }, false)
            }
            PlayLine::UnknownPlayer(name) => {
                return Err(ParseError::UnknownPlayer {
                    line_no: line.line_no,
                    name: name.to_owned(),
                })
            }
            PlayLine::Unrecognized => {
                debug!(line_no = line.line_no, line = line.text, "skipping unrecognized line");
                warnings.push(Warning::UnrecognizedAction {
                    line_no: line.line_no,
                    line: line.text.to_owned(),
                });
                continue;
            }
            PlayLine::Chat => {
                trace!(line_no = line.line_no, "ignoring chat");
                continue;
            }
            PlayLine::DealtTo { .. }
            | PlayLine::Knockout { .. }
            | PlayLine::Finish { .. }
            | PlayLine::UnknownEliminator(_)
            | PlayLine::Dealer => continue,
        };
        actions.push(Action {
            street: line.street,
            seat_number: seat.seat_number,
            player_name: seat.player_name.clone(),
            action,
            is_all_in,
        });
    }
    Ok(Parsed::with_warnings(actions, warnings))
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct DealtToHero {
    pub player_name: String,
    pub cards: Vec<Card>,
}

pub fn parse_dealt_to(block: &str, seats: &[Seat]) -> Result<Option<DealtToHero>, ParseError> {
    for line in play_lines(block) {
        if let PlayLine::DealtTo { seat, cards } = classify(seats, line.text) {
            return Ok(Some(DealtToHero {
                player_name: seat.player_name.clone(),
                cards: parse_cards(cards)?,
            }));
        }
    }
    Ok(None)
}

#[derive(Debug, PartialEq, Serialize, Clone, Default)]
pub struct Board {
    pub cards: Vec<Card>,
}

impl Board {
    /// The last street whose cards are on this board.
    pub fn street(&self) -> StreetType {
        match self.cards.len() {
            0..=2 => StreetType::Preflop,
            3 => StreetType::Flop,
            4 => StreetType::Turn,
            _ => StreetType::River,
        }
    }
}

/// Reads the board of every run-out from the street markers.
pub fn parse_board(block: &str) -> Result<Vec<Board>, ParseError> {
    let mut boards: Vec<Board> = Vec::new();
    for line in hand_lines(block).filter(|line| line.marker) {
        let Ok((_, Marker::Street { street, run, cards })) = Marker::parse(line.text) else {
            continue;
        };
        let inconsistent = |reason: String| {
            ParseError::InconsistentBoard(format!("line {}: {}", line.line_no, reason))
        };
        let (_, groups) = all_consuming(bracket_groups)(cards)
            .map_err(|_| inconsistent(format!("no cards after the {} marker", street)))?;
        let mut dealt = Vec::new();
        for group in groups {
            dealt.extend(parse_cards(group)?);
        }
        if dealt.len() > MAX_BOARD_CARDS {
            return Err(inconsistent(format!("{} cards on the board", dealt.len())));
        }
        if dealt.len() != street.board_size() {
            return Err(inconsistent(format!(
                "{} cards dealt by the {}",
                dealt.len(),
                street
            )));
        }
        let mut seen = HashSet::new();
        if let Some(card) = dealt.iter().find(|card| !seen.insert(**card)) {
            return Err(ParseError::DuplicateCard(*card));
        }
        while boards.len() <= run {
            // a later run-out shares every street dealt before it split off
            let shared = boards
                .first()
                .map(|board| &board.cards[..board.cards.len().min(street.previous_board_size())])
                .unwrap_or_default()
                .to_vec();
            boards.push(Board { cards: shared });
        }
        let board = &mut boards[run];
        if dealt.len() <= board.cards.len() || !dealt.starts_with(&board.cards) {
            return Err(inconsistent(format!(
                "the {} does not extend the cards already dealt",
                street
            )));
        }
        board.cards = dealt;
    }
    Ok(boards)
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct KnockoutEvent {
    pub eliminated: String,
    pub eliminator: String,
    pub bounty: f64,
}

/// `" wins the $0.30 bounty for eliminating Bob"` -> `("$0.30", "Bob")`
fn knockout_tail(input: &str) -> IResult<&str, (&str, &str)> {
    map(
        tuple((
            tag(" wins "),
            opt(alt((tag("the "), tag("a ")))),
            take_till1(|c| c == ' '),
            opt(tag(" bounty")),
            tag(" for eliminating "),
            rest,
        )),
        |(_, _, bounty, _, _, eliminated)| (bounty, eliminated),
    )(input)
}

pub fn parse_knockouts(block: &str, seats: &[Seat]) -> Result<Vec<KnockoutEvent>, ParseError> {
    let mut knockouts = Vec::new();
    for line in play_lines(block) {
        let unknown = |name: &str| ParseError::UnknownPlayer {
            line_no: line.line_no,
            name: name.to_owned(),
        };
        let (eliminator, bounty, eliminated) = match classify(seats, line.text) {
            PlayLine::Knockout {
                eliminator,
                bounty,
                eliminated,
            } => (eliminator, bounty, eliminated),
            PlayLine::UnknownEliminator(name) => return Err(unknown(name)),
            _ => continue,
        };
        let eliminated = find_seat(seats, eliminated).ok_or_else(|| unknown(eliminated))?;
        let bounty = amount_from_str(bounty).map_err(|source| ParseError::AmountParse {
            line_no: line.line_no,
            source,
        })?;
        knockouts.push(KnockoutEvent {
            eliminated: eliminated.player_name.clone(),
            eliminator: eliminator.player_name.clone(),
            bounty,
        });
    }
    Ok(knockouts)
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Finish {
    pub player_name: String,
    pub place: u32,
    pub prize: Option<f64>,
}

/// `" finished the tournament in 9th place and received $1.50"`
fn finish_tail(input: &str) -> IResult<&str, (u32, Option<&str>)> {
    map(
        tuple((
            tag(" finished the tournament in "),
            nom::character::complete::u32,
            alt((tag("st"), tag("nd"), tag("rd"), tag("th"))),
            tag(" place"),
            opt(preceded(tag(" and received "), rest)),
        )),
        |(_, place, _, _, prize)| (place, prize),
    )
    .parse(input)
}

pub fn parse_finishes(block: &str, seats: &[Seat]) -> Result<Vec<Finish>, ParseError> {
    let mut finishes = Vec::new();
    for line in play_lines(block) {
        let PlayLine::Finish { seat, place, prize } = classify(seats, line.text) else {
            continue;
        };
        let prize = prize
            .map(amount_from_str)
            .transpose()
            .map_err(|source| ParseError::AmountParse {
                line_no: line.line_no,
                source,
            })?;
        finishes.push(Finish {
            player_name: seat.player_name.clone(),
            place,
            prize,
        });
    }
    Ok(finishes)
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Hand {
    pub header: HandHeader,
    pub seats: Vec<Seat>,
    pub dealt_to_hero: Option<DealtToHero>,
    pub actions: Vec<Action>,
    pub boards: Vec<Board>,
    pub knockouts: Vec<KnockoutEvent>,
    pub finishes: Vec<Finish>,
    pub summary: Option<Summary>,
    pub results: Vec<PlayerResult>,
}

impl Hand {
    pub fn seat(&self, player_name: &str) -> Option<&Seat> {
        find_seat(&self.seats, player_name)
    }

    pub fn result(&self, player_name: &str) -> Option<&PlayerResult> {
        self.results
            .iter()
            .find(|result| result.player_name == player_name)
    }

    pub fn street_actions(&self, street: StreetType) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(move |action| action.street == street)
    }

    /// Summary section rebuilt from the parsed values.
    pub fn summary_lines(&self) -> Vec<String> {
        self.summary
            .as_ref()
            .map(Summary::lines)
            .unwrap_or_default()
    }
}

/// Parses one hand block. Each stage runs in order and the first error is
/// reported together with the stage that raised it.
pub fn parse_hand(block: HandBlock<'_>) -> Result<Parsed<Hand>, ParseFailure> {
    let failure = |stage: ParseStage, error: ParseError| ParseFailure {
        index: block.index,
        line: block.line,
        stage,
        error,
        raw: block.text.to_owned(),
    };
    let text = block.text;

    let header = parse_header(text).map_err(|e| failure(ParseStage::Header, e))?;
    let seats = parse_seats(text).map_err(|e| failure(ParseStage::Seats, e))?;
    let Parsed {
        value: actions,
        mut warnings,
    } = parse_actions(text, &seats).map_err(|e| failure(ParseStage::Actions, e))?;
    let dealt_to_hero =
        parse_dealt_to(text, &seats).map_err(|e| failure(ParseStage::Actions, e))?;
    let boards = parse_board(text).map_err(|e| failure(ParseStage::Board, e))?;
    let knockouts =
        parse_knockouts(text, &seats).map_err(|e| failure(ParseStage::Knockouts, e))?;
    let finishes = parse_finishes(text, &seats).map_err(|e| failure(ParseStage::Knockouts, e))?;
    let summary = parse_summary(text, &seats).map_err(|e| failure(ParseStage::Summary, e))?;
    warnings.extend(summary.warnings);

    let results = settle(&seats, &actions, summary.value.as_ref());
    let hand = Hand {
        header,
        seats,
        dealt_to_hero,
        actions,
        boards,
        knockouts,
        finishes,
        summary: summary.value,
        results,
    };
    validate(&hand).map_err(|e| failure(ParseStage::Validation, e))?;

    debug!(
        hand_id = hand.header.hand_id,
        actions = hand.actions.len(),
        knockouts = hand.knockouts.len(),
        warnings = warnings.len(),
        "parsed hand"
    );
    Ok(Parsed::with_warnings(hand, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::split_into_hand_blocks;
    use crate::cards::{Rank, Suit};
    use chrono::NaiveDate;

    const HEADER: &str = "Full Tilt Poker Game #33728803961: $1 + $0.10 + $0.30 Knockout Sit & Go (218459123), Table 3 - 15/30 - No Limit Hold'em - 22:14:37 ET - 2011/08/03";

    fn seats() -> Vec<Seat> {
        vec![
            Seat {
                seat_number: 3,
                player_name: String::from("Alice"),
                stack: 1500.0,
                sitting_out: false,
            },
            Seat {
                seat_number: 5,
                player_name: String::from("Al"),
                stack: 900.0,
                sitting_out: false,
            },
            Seat {
                seat_number: 7,
                player_name: String::from("Bob (the builder)"),
                stack: 600.0,
                sitting_out: false,
            },
        ]
    }

    fn card(token: &str) -> Card {
        token.parse().unwrap()
    }

    #[test]
    fn test_parse_buy_in_with_bounty() {
        let input = "$1 + $0.10 + $0.30 Knockout";
        let expected = BuyIn {
            buy_in: 1.0,
            fee: 0.10,
            bounty: Some(0.30),
        };
        let (rest, actual) = BuyIn::parse(input).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(rest, " Knockout");
    }

    #[test]
    fn test_parse_buy_in_without_bounty() {
        let input = "$5 + $0.50 Sit & Go";
        let expected = BuyIn {
            buy_in: 5.0,
            fee: 0.50,
            bounty: None,
        };
        let (_, actual) = BuyIn::parse(input).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_parse_blinds() {
        let (_, actual) = Blinds::parse("15/30").unwrap();
        assert_eq!(
            actual,
            Blinds {
                ante: None,
                small_blind: 15.0,
                big_blind: 30.0,
            }
        );
        let (_, actual) = Blinds::parse("1,000/2,000 Ante 250").unwrap();
        assert_eq!(
            actual,
            Blinds {
                ante: Some(250.0),
                small_blind: 1000.0,
                big_blind: 2000.0,
            }
        );
    }

    #[test]
    fn test_parse_header_line() {
        let expected = HandHeader {
            hand_id: 33728803961,
            tournament: TournamentInfo {
                id: 218459123,
                name: String::from("Knockout Sit & Go"),
                buy_in: BuyIn {
                    buy_in: 1.0,
                    fee: 0.10,
                    bounty: Some(0.30),
                },
            },
            table: String::from("3"),
            blinds: Blinds {
                ante: None,
                small_blind: 15.0,
                big_blind: 30.0,
            },
            poker_type: PokerType::HoldemNoLimit,
            datetime: NaiveDate::from_ymd_opt(2011, 8, 3)
                .unwrap()
                .and_hms_opt(22, 14, 37)
                .unwrap(),
            timezone: String::from("ET"),
            button_seat: None,
        };
        let (_, actual) = HandHeader::parse(HEADER).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_parse_header_tournament_name_with_parentheses() {
        let input = "Full Tilt Poker Game #1: $10 + $1 90 Player (Turbo) KO (99), Table 12 - 50/100 - Pot Limit Omaha - 3:05:09 ET - 2011/08/04";
        let (_, actual) = HandHeader::parse(input).unwrap();
        assert_eq!(actual.tournament.name, "90 Player (Turbo) KO");
        assert_eq!(actual.tournament.id, 99);
        assert!(actual.tournament.is_knockout());
        assert_eq!(actual.poker_type, PokerType::OmahaPotLimit);
        assert_eq!(
            actual.datetime,
            NaiveDate::from_ymd_opt(2011, 8, 4)
                .unwrap()
                .and_hms_opt(3, 5, 9)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_header_reads_button() {
        let block = format!("{}\nSeat 3: Alice (1,500)\nThe button is in seat #7\n", HEADER);
        let header = parse_header(&block).unwrap();
        assert_eq!(header.button_seat, Some(7));
        assert_eq!(header.hand_id, 33728803961);
    }

    #[test]
    fn test_parse_header_missing_fields() {
        let block = "Full Tilt Poker Game #33728803961: $1 + $0.10 Sit & Go, Table 3\n";
        assert!(matches!(
            parse_header(block),
            Err(ParseError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_header("PokerStars Hand #1\n"),
            Err(ParseError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_parse_seat_line() {
        let expected = Seat {
            seat_number: 3,
            player_name: String::from("Alice"),
            stack: 1500.0,
            sitting_out: false,
        };
        let actual = Seat::parse_line(2, "Seat 3: Alice (1,500)").unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_parse_seat_line_name_with_parentheses() {
        let actual = Seat::parse_line(2, "Seat 7: Bob (the builder) (600)").unwrap();
        assert_eq!(actual.player_name, "Bob (the builder)");
        assert_eq!(actual.stack, 600.0);
    }

    #[test]
    fn test_parse_seat_line_sitting_out() {
        let actual = Seat::parse_line(5, "Seat 6: Gina (1,500), is sitting out").unwrap();
        assert_eq!(actual.player_name, "Gina");
        assert!(actual.sitting_out);
    }

    #[test]
    fn test_parse_seat_line_bad_stack() {
        let actual = Seat::parse_line(4, "Seat 4: Ivan (1,5x0)");
        assert_eq!(
            actual,
            Err(ParseError::MalformedSeatLine {
                line_no: 4,
                line: String::from("Seat 4: Ivan (1,5x0)"),
                reason: String::from("cannot parse amount \"1,5x0\""),
            })
        );
    }

    #[test]
    fn test_parse_seats_skips_gaps() {
        let block = format!(
            "{}\nSeat 1: A (100)\nSeat 5: B (200)\nSeat 9: C (300)\nA posts the small blind of 15\n*** SUMMARY ***\nSeat 1: A didn't bet (folded)\n",
            HEADER
        );
        let seats = parse_seats(&block).unwrap();
        let numbers: Vec<u32> = seats.iter().map(|seat| seat.seat_number).collect();
        assert_eq!(numbers, vec![1, 5, 9]);
    }

    #[test]
    fn test_parse_seats_rejects_duplicates() {
        let block = format!("{}\nSeat 1: A (100)\nSeat 1: B (200)\n", HEADER);
        assert!(matches!(
            parse_seats(&block),
            Err(ParseError::MalformedSeatLine { line_no: 3, .. })
        ));
        assert_eq!(parse_seats(HEADER), Err(ParseError::MissingSeats));
    }

    #[test]
    fn test_parse_marker() {
        let (_, actual) = Marker::parse("*** TURN *** [Ah Kd 7h] [Qc]").unwrap();
        assert_eq!(
            actual,
            Marker::Street {
                street: StreetType::Turn,
                run: 0,
                cards: "[Ah Kd 7h] [Qc]",
            }
        );
        let (_, actual) = Marker::parse("*** SECOND FLOP *** [3c 4c Qh]").unwrap();
        assert_eq!(
            actual,
            Marker::Street {
                street: StreetType::Flop,
                run: 1,
                cards: "[3c 4c Qh]",
            }
        );
        assert_eq!(
            Marker::parse("*** SHOW DOWN ***").unwrap().1,
            Marker::ShowDown
        );
    }

    #[test]
    fn test_parse_raw_actions() {
        let cases = [
            ("folds", RawAction::Fold),
            ("checks", RawAction::Check),
            ("calls 585", RawAction::Call("585")),
            ("bets 1,000", RawAction::Bet("1,000")),
            ("raises to 600", RawAction::Raise("600")),
            ("antes 10", RawAction::Post(Blind::Ante, "10")),
            (
                "posts the small blind of 15",
                RawAction::Post(Blind::SmallBlind, "15"),
            ),
            (
                "posts the big blind of 30",
                RawAction::Post(Blind::BigBlind, "30"),
            ),
            ("posts 30", RawAction::Post(Blind::Other, "30")),
            ("shows [As 9s] a pair of Aces", RawAction::Shows("As 9s")),
            ("mucks", RawAction::Mucks(None)),
            ("mucks [2c 3d]", RawAction::Mucks(Some("2c 3d"))),
            (
                "wins the pot (1,230) with a pair of Aces",
                RawAction::Collect(PotLabel::Pot, "1,230"),
            ),
            (
                "wins the side pot (1,200)",
                RawAction::Collect(PotLabel::SidePot(None), "1,200"),
            ),
            (
                "wins side pot #2 (300)",
                RawAction::Collect(PotLabel::SidePot(Some(2)), "300"),
            ),
            (
                "ties for the main pot (600)",
                RawAction::Collect(PotLabel::MainPot, "600"),
            ),
            ("is sitting out", RawAction::SitOut),
            ("has returned", RawAction::Return),
            ("has timed out", RawAction::TimeOut),
            ("has been disconnected", RawAction::Disconnect),
            ("has reconnected", RawAction::Reconnect),
        ];
        for (input, expected) in cases {
            let (_, actual) = all_consuming(RawAction::parse)(input).unwrap();
            assert_eq!(expected, actual, "{}", input);
        }
    }

    #[test]
    fn test_match_player_prefers_longest_name() {
        let seats = seats();
        let (seat, rest) = match_player(&seats, "Alice folds").unwrap();
        assert_eq!(seat.seat_number, 3);
        assert_eq!(rest, " folds");
        let (seat, _) = match_player(&seats, "Al folds").unwrap();
        assert_eq!(seat.seat_number, 5);
        let (seat, rest) = match_player(&seats, "Bob (the builder) calls 10").unwrap();
        assert_eq!(seat.seat_number, 7);
        assert_eq!(rest, " calls 10");
        assert!(match_player(&seats, "Alicia folds").is_none());
    }

    #[test]
    fn test_parse_actions_tracks_streets_and_all_in() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\nSeat 5: Al (900)\nSeat 7: Bob (the builder) (600)\n\
             Alice posts the small blind of 15\nAl posts the big blind of 30\n\
             *** HOLE CARDS ***\nBob (the builder) raises to 600, and is all in\nAlice calls 585\nAl folds\n\
             *** FLOP *** [Ah Kd 7h]\n*** SHOW DOWN ***\nBob (the builder) shows [Jh Jd]\n",
            HEADER
        );
        let parsed = parse_actions(&block, &seats()).unwrap();
        assert!(parsed.warnings.is_empty());
        let actions = parsed.value;
        assert_eq!(actions.len(), 6);
        assert_eq!(
            actions[2],
            Action {
                street: StreetType::Preflop,
                seat_number: 7,
                player_name: String::from("Bob (the builder)"),
                action: ActionType::Raise { to: 600.0 },
                is_all_in: true,
            }
        );
        assert_eq!(actions[3].action, ActionType::Call { amount: 585.0 });
        assert_eq!(actions[5].street, StreetType::Showdown);
        assert_eq!(
            actions[5].action,
            ActionType::Shows {
                cards: vec![card("Jh"), card("Jd")],
            }
        );
    }

    #[test]
    fn test_parse_actions_warns_on_unknown_lines() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\nSeat 5: Al (900)\n*** HOLE CARDS ***\n\
             Alice: good luck\nAlice requests time\nSomebody joins the table\nAl checks\n",
            HEADER
        );
        let parsed = parse_actions(&block, &seats()).unwrap();
        assert_eq!(parsed.value.len(), 1);
        assert_eq!(
            parsed.warnings,
            vec![
                Warning::UnrecognizedAction {
                    line_no: 6,
                    line: String::from("Alice requests time"),
                },
                Warning::UnrecognizedAction {
                    line_no: 7,
                    line: String::from("Somebody joins the table"),
                },
            ]
        );
    }

    #[test]
    fn test_parse_actions_bad_amount() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nAlice calls 5x5\n",
            HEADER
        );
        assert_eq!(
            parse_actions(&block, &seats()),
            Err(ParseError::AmountParse {
                line_no: 4,
                source: crate::error::AmountParseError(String::from("5x5")),
            })
        );
    }

    #[test]
    fn test_parse_actions_uncalled_bet() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nUncalled bet of 1,200 returned to Alice\nUncalled bet of 5 returned to Zed\n",
            HEADER
        );
        assert_eq!(
            parse_actions(&block, &seats()),
            Err(ParseError::UnknownPlayer {
                line_no: 5,
                name: String::from("Zed"),
            })
        );
    }

    #[test]
    fn test_parse_dealt_to() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nDealt to Alice [Ts 2c]\n",
            HEADER
        );
        let expected = DealtToHero {
            player_name: String::from("Alice"),
            cards: vec![
                Card {
                    rank: Rank::Ten,
                    suit: Suit::Spades,
                },
                Card {
                    rank: Rank::Two,
                    suit: Suit::Clubs,
                },
            ],
        };
        assert_eq!(parse_dealt_to(&block, &seats()), Ok(Some(expected)));
    }

    #[test]
    fn test_parse_board_progressive() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\n*** FLOP *** [Ah Kd 7h]\n\
             *** TURN *** [Ah Kd 7h] [Qc]\n*** RIVER *** [Ah Kd 7h Qc] [2s]\n*** SUMMARY ***\n",
            HEADER
        );
        let boards = parse_board(&block).unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(
            boards[0].cards,
            vec![card("Ah"), card("Kd"), card("7h"), card("Qc"), card("2s")]
        );
        assert_eq!(boards[0].street(), StreetType::River);
    }

    #[test]
    fn test_parse_board_run_twice() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\n*** FLOP *** [2h 7d 9s]\n\
             *** FIRST TURN *** [2h 7d 9s] [Jc]\n*** FIRST RIVER *** [2h 7d 9s Jc] [Kd]\n\
             *** SECOND TURN *** [2h 7d 9s] [3c]\n*** SECOND RIVER *** [2h 7d 9s 3c] [8d]\n",
            HEADER
        );
        let boards = parse_board(&block).unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].cards.len(), 5);
        assert_eq!(
            boards[1].cards,
            vec![card("2h"), card("7d"), card("9s"), card("3c"), card("8d")]
        );
    }

    #[test]
    fn test_parse_board_run_twice_after_shared_flop() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\n*** FLOP *** [2h 7d 9s]\n\
             *** FIRST TURN *** [2h 7d 9s] [Jc]\n*** FIRST RIVER *** [2h 7d 9s Jc] [Kd]\n\
             *** SECOND TURN *** [2h 7d 9s] [3c]\n*** SECOND RIVER *** [2h 7d 9s 3c] [Kh]\n",
            HEADER
        );
        let boards = parse_board(&block).unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(&boards[1].cards[..3], &boards[0].cards[..3]);

        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\n*** FLOP *** [2h 7d 9s]\n\
             *** FIRST TURN *** [2h 7d 9s] [Jc]\n*** FIRST RIVER *** [2h 7d 9s Jc] [Kd]\n\
             *** SECOND TURN *** [3c 4c Qh] [Ts]\n*** SECOND RIVER *** [3c 4c Qh Ts] [Kh]\n",
            HEADER
        );
        assert!(matches!(
            parse_board(&block),
            Err(ParseError::InconsistentBoard(_))
        ));
    }

    #[test]
    fn test_parse_board_duplicate_card() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** FLOP *** [Ah Kd Ah]\n",
            HEADER
        );
        assert_eq!(
            parse_board(&block),
            Err(ParseError::DuplicateCard(card("Ah")))
        );
    }

    #[test]
    fn test_parse_board_must_extend_previous_street() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** FLOP *** [Ah Kd 7h]\n*** TURN *** [Ah Kd 8h] [Qc]\n",
            HEADER
        );
        assert!(matches!(
            parse_board(&block),
            Err(ParseError::InconsistentBoard(_))
        ));
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** FLOP *** [Ah Kd 7h] [Qc 2s 3s]\n",
            HEADER
        );
        assert!(matches!(
            parse_board(&block),
            Err(ParseError::InconsistentBoard(_))
        ));
    }

    #[test]
    fn test_parse_board_invalid_card() {
        let block = format!("{}\nSeat 3: Alice (1,500)\n*** FLOP *** [Ah Kd 1h]\n", HEADER);
        assert_eq!(
            parse_board(&block),
            Err(ParseError::InvalidCard(String::from("1h")))
        );
    }

    #[test]
    fn test_parse_knockouts() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\nSeat 7: Bob (the builder) (600)\n*** HOLE CARDS ***\n\
             Alice wins the $0.30 bounty for eliminating Bob (the builder)\n",
            HEADER
        );
        let actual = parse_knockouts(&block, &seats()).unwrap();
        assert_eq!(
            actual,
            vec![KnockoutEvent {
                eliminated: String::from("Bob (the builder)"),
                eliminator: String::from("Alice"),
                bounty: 0.30,
            }]
        );
    }

    #[test]
    fn test_parse_knockouts_short_form() {
        let (_, actual) = knockout_tail(" wins $2 for eliminating Al").unwrap();
        assert_eq!(actual, ("$2", "Al"));
    }

    #[test]
    fn test_parse_knockouts_unknown_player() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nAlice wins $0.30 for eliminating Zed\n",
            HEADER
        );
        assert_eq!(
            parse_knockouts(&block, &seats()),
            Err(ParseError::UnknownPlayer {
                line_no: 4,
                name: String::from("Zed"),
            })
        );
    }

    #[test]
    fn test_parse_knockouts_absent() {
        let block = format!("{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nAlice folds\n", HEADER);
        assert!(parse_knockouts(&block, &seats()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_knockouts_unknown_eliminator() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nZed wins the $0.30 bounty for eliminating Alice\n",
            HEADER
        );
        assert_eq!(
            parse_knockouts(&block, &seats()),
            Err(ParseError::UnknownPlayer {
                line_no: 4,
                name: String::from("Zed"),
            })
        );
    }

    #[test]
    fn test_chat_about_eliminations_is_ignored() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\nSeat 7: Bob (the builder) (600)\n*** HOLE CARDS ***\n\
             rail_bird: nice, Alice wins a $0.30 bounty for eliminating Bob soon\n\
             Alice: Bob (the builder) finished the tournament in 9th place\n\
             Bob (the builder): gg, Alice wins the $0.30 bounty for eliminating me\n\
             Alice folds\n",
            HEADER
        );
        assert!(parse_knockouts(&block, &seats()).unwrap().is_empty());
        assert!(parse_finishes(&block, &seats()).unwrap().is_empty());
        let parsed = parse_actions(&block, &seats()).unwrap();
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.value.len(), 1);
        assert_eq!(parsed.value[0].action, ActionType::Fold);
    }

    #[test]
    fn test_malformed_knockout_line_is_a_warning() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\n*** HOLE CARDS ***\nAlice wins for eliminating nobody\n",
            HEADER
        );
        assert!(parse_knockouts(&block, &seats()).unwrap().is_empty());
        let parsed = parse_actions(&block, &seats()).unwrap();
        assert_eq!(
            parsed.warnings,
            vec![Warning::UnrecognizedAction {
                line_no: 4,
                line: String::from("Alice wins for eliminating nobody"),
            }]
        );
    }

    #[test]
    fn test_parse_finishes() {
        let block = format!(
            "{}\nSeat 3: Alice (1,500)\nSeat 5: Al (900)\n*** HOLE CARDS ***\n\
             Al finished the tournament in 2nd place and received $15.50.\n\
             Alice finished the tournament in 1st place\n",
            HEADER
        );
        let actual = parse_finishes(&block, &seats()).unwrap();
        assert_eq!(
            actual,
            vec![
                Finish {
                    player_name: String::from("Al"),
                    place: 2,
                    prize: Some(15.50),
                },
                Finish {
                    player_name: String::from("Alice"),
                    place: 1,
                    prize: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_hand_ko_scenario() {
        let data = include_str!("../samples/ko_tournament.txt");
        let block = split_into_hand_blocks(data).next().unwrap();
        let parsed = parse_hand(block).unwrap();
        assert!(parsed.warnings.is_empty());
        let hand = parsed.value;
        assert!(hand.header.tournament.is_knockout());
        assert_eq!(hand.header.button_seat, Some(7));
        assert_eq!(hand.seat("Alice").unwrap().seat_number, 3);
        assert_eq!(hand.seat("Alice").unwrap().stack, 1500.0);
        assert_eq!(
            hand.knockouts,
            vec![KnockoutEvent {
                eliminated: String::from("Bob"),
                eliminator: String::from("Alice"),
                bounty: 0.30,
            }]
        );
        assert_eq!(hand.result("Bob").unwrap().final_stack, 0.0);
        assert_eq!(hand.result("Alice").unwrap().final_stack, 2130.0);
        assert_eq!(hand.result("Carol").unwrap().final_stack, 1170.0);
        assert_eq!(
            hand.finishes,
            vec![Finish {
                player_name: String::from("Bob"),
                place: 9,
                prize: None,
            }]
        );
        assert_eq!(hand.street_actions(StreetType::Showdown).count(), 3);
    }

    #[test]
    fn test_parse_hands() {
        let data = include_str!("../samples/ko_tournament.txt");
        let hands: Vec<_> = split_into_hand_blocks(data).map(parse_hand).collect();
        assert_eq!(hands.len(), 4);
        assert!(hands.iter().all(Result::is_ok));
    }

    #[test]
    fn test_parse_hand_is_idempotent() {
        let data = include_str!("../samples/ko_tournament.txt");
        for block in split_into_hand_blocks(data) {
            assert_eq!(parse_hand(block), parse_hand(block));
        }
    }
}
