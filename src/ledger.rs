use std::collections::HashMap;

use serde::Serialize;

use crate::parser::{Action, ActionType, Blind, Seat, StreetType};
use crate::summary_parser::{Outcome, Summary};

/// Chip movements of one player over a hand.
#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct PlayerResult {
    pub seat_number: u32,
    pub player_name: String,
    pub starting_stack: f64,
    /// Chips put in the pot, antes included.
    pub invested: f64,
    /// Uncalled bets given back.
    pub returned: f64,
    pub collected: f64,
    pub final_stack: f64,
    pub outcome: Option<Outcome>,
}

impl PlayerResult {
    pub fn net(&self) -> f64 {
        self.final_stack - self.starting_stack
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    invested: f64,
    returned: f64,
    collected: f64,
    /// Chips in front of the player on the current street.
    committed: f64,
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Replays the actions to compute every seat's final stack.
///
/// `raises to` amounts are street totals, so only the part above what the
/// player already committed on that street is added.
pub fn settle(seats: &[Seat], actions: &[Action], summary: Option<&Summary>) -> Vec<PlayerResult> {
    let mut tallies: HashMap<u32, Tally> = HashMap::new();
    let mut street = StreetType::Preflop;
    for action in actions {
        if action.street != street {
            street = action.street;
            tallies.values_mut().for_each(|tally| tally.committed = 0.0);
        }
        let tally = tallies.entry(action.seat_number).or_default();
        match action.action {
            ActionType::Post {
                blind: Blind::Ante,
                amount,
            } => tally.invested += amount,
            ActionType::Post { amount, .. }
            | ActionType::Call { amount }
            | ActionType::Bet { amount } => {
                tally.invested += amount;
                tally.committed += amount;
            }
            ActionType::Raise { to } => {
                tally.invested += to - tally.committed;
                tally.committed = to;
            }
            ActionType::UncalledBetReturned { amount } => tally.returned += amount,
            ActionType::Collect { amount, .. } => tally.collected += amount,
            _ => {}
        }
    }

    seats
        .iter()
        .map(|seat| {
            let tally = tallies.get(&seat.seat_number).copied().unwrap_or_default();
            PlayerResult {
                seat_number: seat.seat_number,
                player_name: seat.player_name.clone(),
                starting_stack: seat.stack,
                invested: cents(tally.invested),
                returned: cents(tally.returned),
                collected: cents(tally.collected),
                final_stack: cents(seat.stack - tally.invested + tally.returned + tally.collected),
                outcome: summary
                    .and_then(|summary| summary.seat(&seat.player_name))
                    .map(|seat| seat.outcome.clone()),
            }
        })
        .collect()
}
