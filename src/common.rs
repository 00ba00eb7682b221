use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded, tuple};
use nom::{IResult, Parser};
use serde::Serialize;

use crate::error::AmountParseError;

/// Digits with optional `,` thousands separators and an optional fraction.
///
/// A separator is only consumed when digits follow it, so `"1,500, and is all in"`
/// stops right after `500`.
fn decorated_number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        digit1,
        many0(preceded(char(','), digit1)),
        opt(pair(char('.'), digit1)),
    )))(input)
}

/// Parses a chip or money amount, stripping currency symbols and separators.
pub fn parse_amount(input: &str) -> IResult<&str, f64> {
    let (input, (_, amount, _)) = tuple((
        opt(one_of("$€£")),
        map_res(decorated_number, |s: &str| s.replace(',', "").parse::<f64>()),
        opt(tag("€")),
    ))(input)?;
    Ok((input, amount))
}

/// Parses a complete amount token such as `"1,500"` or `"$0.30"`.
pub fn amount_from_str(text: &str) -> Result<f64, AmountParseError> {
    let trimmed = text.trim();
    match all_consuming(parse_amount)(trimmed) {
        Ok((_, amount)) => Ok(amount),
        Err(_) => Err(AmountParseError(trimmed.to_owned())),
    }
}

fn group_thousands(whole: i64) -> String {
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Formats chips the way the hand history prints them: `1,230`, `12.50`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let grouped = group_thousands(cents / 100);
    match (cents % 100).abs() {
        0 => grouped,
        frac => format!("{}.{:02}", grouped, frac),
    }
}

/// Compares amounts to the cent.
pub fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

#[derive(Debug, PartialEq, Serialize, Clone, Copy)]
pub enum PokerType {
    HoldemNoLimit,
    HoldemPotLimit,
    HoldemLimit,
    OmahaPotLimit,
}

impl PokerType {
    pub fn parse(input: &str) -> IResult<&str, PokerType> {
        let (input, poker_type) = alt((
            map(tag("No Limit Hold'em"), |_| PokerType::HoldemNoLimit),
            map(tag("Pot Limit Hold'em"), |_| PokerType::HoldemPotLimit),
            map(tag("Limit Hold'em"), |_| PokerType::HoldemLimit),
            map(tag("Pot Limit Omaha"), |_| PokerType::OmahaPotLimit),
        ))
        .parse(input)?;
        Ok((input, poker_type))
    }
}

impl fmt::Display for PokerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let poker_type = match self {
            PokerType::HoldemNoLimit => "No Limit Hold'em",
            PokerType::HoldemPotLimit => "Pot Limit Hold'em",
            PokerType::HoldemLimit => "Limit Hold'em",
            PokerType::OmahaPotLimit => "Pot Limit Omaha",
        };
        write!(f, "{}", poker_type)
    }
}
