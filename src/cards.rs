use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{char, space0};
use nom::combinator::{all_consuming, map};
use nom::multi::many1;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;
use serde::Serialize;

use crate::error::ParseError;

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Clone, Copy)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    fn parse(input: &str) -> IResult<&str, Rank> {
        let (input, rank) = alt((
            map(tag("2"), |_| Rank::Two),
            map(tag("3"), |_| Rank::Three),
            map(tag("4"), |_| Rank::Four),
            map(tag("5"), |_| Rank::Five),
            map(tag("6"), |_| Rank::Six),
            map(tag("7"), |_| Rank::Seven),
            map(tag("8"), |_| Rank::Eight),
            map(tag("9"), |_| Rank::Nine),
            map(tag("T"), |_| Rank::Ten),
            map(tag("J"), |_| Rank::Jack),
            map(tag("Q"), |_| Rank::Queen),
            map(tag("K"), |_| Rank::King),
            map(tag("A"), |_| Rank::Ace),
        ))(input)?;
        Ok((input, rank))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Rank::Two => "2",
                Rank::Three => "3",
                Rank::Four => "4",
                Rank::Five => "5",
                Rank::Six => "6",
                Rank::Seven => "7",
                Rank::Eight => "8",
                Rank::Nine => "9",
                Rank::Ten => "T",
                Rank::Jack => "J",
                Rank::Queen => "Q",
                Rank::King => "K",
                Rank::Ace => "A",
            }
        )
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Clone, Copy)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    fn parse(input: &str) -> IResult<&str, Suit> {
        let (input, suit) = alt((
            map(tag("s"), |_| Suit::Spades),
            map(tag("h"), |_| Suit::Hearts),
            map(tag("d"), |_| Suit::Diamonds),
            map(tag("c"), |_| Suit::Clubs),
        ))(input)?;
        Ok((input, suit))
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Suit::Spades => "s",
                Suit::Hearts => "h",
                Suit::Diamonds => "d",
                Suit::Clubs => "c",
            }
        )
    }
}

/// One of the 52 cards, serialized as its two-character token (`"Ah"`).
#[derive(Debug, PartialEq, Eq, Hash, Serialize, Clone, Copy)]
#[serde(into = "String")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn parse(input: &str) -> IResult<&str, Card> {
        let (input, (rank, suit)) = tuple((Rank::parse, Suit::parse))(input)?;
        Ok((input, Card { rank, suit }))
    }
}

impl FromStr for Card {
    type Err = ParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        all_consuming(Card::parse)(token)
            .map(|(_, card)| card)
            .map_err(|_| ParseError::InvalidCard(token.to_owned()))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl From<Card> for String {
    fn from(card: Card) -> String {
        card.to_string()
    }
}

/// Contents of every `[...]` group at the start of `input`, in order.
pub fn bracket_groups(input: &str) -> IResult<&str, Vec<&str>> {
    many1(preceded(
        space0,
        delimited(char('['), take_until("]"), char(']')),
    ))(input)
}

/// Validates a space separated card list such as `"Ah Kd 7h"`.
pub fn parse_cards(text: &str) -> Result<Vec<Card>, ParseError> {
    text.split_whitespace().map(Card::from_str).collect()
}

pub fn format_cards(cards: &[Card]) -> String {
    let tokens: Vec<String> = cards.iter().map(Card::to_string).collect();
    format!("[{}]", tokens.join(" "))
}
