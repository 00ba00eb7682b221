//! Consistency checks run on a fully parsed hand.

use std::collections::{HashMap, HashSet};

use crate::cards::Card;
use crate::common::same_amount;
use crate::error::ParseError;
use crate::parser::{ActionType, Hand};

pub fn validate(hand: &Hand) -> Result<(), ParseError> {
    check_seats(hand)?;
    check_cards(hand)?;
    check_boards(hand)?;
    check_stacks(hand)?;
    check_pots(hand)?;
    check_knockouts(hand)
}

/// Every seat referenced by an action or the summary was declared.
fn check_seats(hand: &Hand) -> Result<(), ParseError> {
    let declared = |seat_number: u32, name: &str| {
        hand.seats
            .iter()
            .any(|seat| seat.seat_number == seat_number && seat.player_name == name)
    };
    let summary_seats = hand.summary.iter().flat_map(|summary| {
        summary
            .seats
            .iter()
            .map(|seat| (seat.seat_number, seat.player_name.as_str()))
    });
    let mut referenced = hand
        .actions
        .iter()
        .map(|action| (action.seat_number, action.player_name.as_str()))
        .chain(summary_seats);
    match referenced.find(|(seat_number, name)| !declared(*seat_number, *name)) {
        Some((seat, name)) => Err(ParseError::PhantomSeat {
            name: name.to_owned(),
            seat,
        }),
        None => Ok(()),
    }
}

/// Hole cards by player, from every place a hand can reveal them.
fn holdings(hand: &Hand) -> HashMap<&str, HashSet<Card>> {
    let mut holdings: HashMap<&str, HashSet<Card>> = HashMap::new();
    if let Some(dealt) = &hand.dealt_to_hero {
        holdings
            .entry(dealt.player_name.as_str())
            .or_default()
            .extend(dealt.cards.iter().copied());
    }
    for action in &hand.actions {
        if let ActionType::Shows { cards } | ActionType::Mucks { cards } = &action.action {
            holdings
                .entry(action.player_name.as_str())
                .or_default()
                .extend(cards.iter().copied());
        }
    }
    if let Some(summary) = &hand.summary {
        for seat in &summary.seats {
            holdings
                .entry(seat.player_name.as_str())
                .or_default()
                .extend(seat.outcome.cards().iter().copied());
        }
    }
    holdings
}

fn check_cards(hand: &Hand) -> Result<(), ParseError> {
    let mut seen = HashSet::new();
    for cards in holdings(hand).values() {
        if let Some(card) = cards.iter().find(|card| !seen.insert(**card)) {
            return Err(ParseError::DuplicateCard(*card));
        }
    }
    for board in &hand.boards {
        if let Some(card) = board.cards.iter().find(|card| seen.contains(*card)) {
            return Err(ParseError::DuplicateCard(*card));
        }
    }
    Ok(())
}

fn check_boards(hand: &Hand) -> Result<(), ParseError> {
    let Some(summary) = &hand.summary else {
        return Ok(());
    };
    for board in &summary.boards {
        let dealt = hand
            .boards
            .get(board.run_index())
            .map(|dealt| dealt.cards.as_slice())
            .unwrap_or_default();
        if dealt != board.cards.as_slice() {
            return Err(ParseError::InconsistentBoard(format!(
                "summary shows {} but the streets dealt {} cards",
                board,
                dealt.len()
            )));
        }
    }
    Ok(())
}

fn check_stacks(hand: &Hand) -> Result<(), ParseError> {
    match hand.results.iter().find(|result| result.final_stack < 0.0) {
        Some(result) => Err(ParseError::NegativeStack {
            player: result.player_name.clone(),
            stack: result.final_stack,
        }),
        None => Ok(()),
    }
}

fn balanced(what: &'static str, expected: f64, actual: f64) -> Result<(), ParseError> {
    if same_amount(expected, actual) {
        Ok(())
    } else {
        Err(ParseError::Unbalanced {
            what,
            expected,
            actual,
        })
    }
}

/// Chips in equal the pot, and the pot equals chips out plus rake.
fn check_pots(hand: &Hand) -> Result<(), ParseError> {
    let Some(summary) = &hand.summary else {
        return Ok(());
    };
    let contributed: f64 = hand
        .results
        .iter()
        .map(|result| result.invested - result.returned)
        .sum();
    balanced("pot contributions", summary.total_pot, contributed)?;
    let collected: f64 = hand.results.iter().map(|result| result.collected).sum();
    balanced(
        "pot distribution",
        summary.total_pot,
        collected + summary.rake.unwrap_or(0.0),
    )?;
    if let Some(main_pot) = summary.main_pot {
        let side_pots: f64 = summary.side_pots.iter().map(|pot| pot.amount).sum();
        balanced("side pots", summary.total_pot, main_pot + side_pots)?;
    }
    Ok(())
}

fn check_knockouts(hand: &Hand) -> Result<(), ParseError> {
    for knockout in &hand.knockouts {
        let player = knockout.eliminated.as_str();
        if let Some(result) = hand.result(player) {
            if !same_amount(result.final_stack, 0.0) {
                return Err(ParseError::KnockoutWithoutBust {
                    player: player.to_owned(),
                    stack: result.final_stack,
                });
            }
        }
        let own_actions: Vec<_> = hand
            .actions
            .iter()
            .filter(|action| action.player_name == player)
            .collect();
        let Some(all_in) = own_actions.iter().rposition(|action| action.is_all_in) else {
            continue;
        };
        if let Some(action) = own_actions[all_in + 1..]
            .iter()
            .find(|action| action.action.is_betting())
        {
            return Err(ParseError::ActionAfterElimination {
                player: player.to_owned(),
                street: action.street,
            });
        }
    }
    Ok(())
}
