use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::common::same_amount;
use crate::parser::Hand;

/// A seat whose starting stack disagrees with where the player ended the
/// previous hand.
#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct StackDrift {
    pub player_name: String,
    pub hand_id: u64,
    pub expected: f64,
    pub actual: f64,
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Elimination {
    pub player_name: String,
    pub hand_id: u64,
    pub eliminated_by: String,
    pub bounty: f64,
    pub place: Option<u32>,
}

/// State carried from hand to hand within one tournament.
#[derive(Debug, Default, Clone)]
pub struct TournamentContext {
    tournament_id: u64,
    stacks: HashMap<String, f64>,
    eliminations: Vec<Elimination>,
    hands_seen: usize,
}

impl TournamentContext {
    pub fn new(tournament_id: u64) -> TournamentContext {
        TournamentContext {
            tournament_id,
            ..TournamentContext::default()
        }
    }

    pub fn tournament_id(&self) -> u64 {
        self.tournament_id
    }

    /// Stack a player carried out of the last hand they played.
    pub fn stack(&self, player_name: &str) -> Option<f64> {
        self.stacks.get(player_name).copied()
    }

    pub fn eliminations(&self) -> &[Elimination] {
        &self.eliminations
    }

    pub fn hands_seen(&self) -> usize {
        self.hands_seen
    }

    /// Checks the hand's starting stacks against the carried ones, then
    /// carries the hand's final stacks forward. Knocked out players are
    /// dropped from the table.
    pub fn observe(&mut self, hand: &Hand) -> Vec<StackDrift> {
        let hand_id = hand.header.hand_id;
        if hand.header.tournament.id != self.tournament_id {
            warn!(
                hand_id,
                tournament_id = hand.header.tournament.id,
                expected = self.tournament_id,
                "hand belongs to another tournament"
            );
            return Vec::new();
        }
        let drifts: Vec<StackDrift> = hand
            .seats
            .iter()
            .filter_map(|seat| {
                let expected = self.stack(&seat.player_name)?;
                (!same_amount(expected, seat.stack)).then(|| StackDrift {
                    player_name: seat.player_name.clone(),
                    hand_id,
                    expected,
                    actual: seat.stack,
                })
            })
            .collect();

        for result in &hand.results {
            self.stacks
                .insert(result.player_name.clone(), result.final_stack);
        }
        for knockout in &hand.knockouts {
            self.stacks.remove(&knockout.eliminated);
            let place = hand
                .finishes
                .iter()
                .find(|finish| finish.player_name == knockout.eliminated)
                .map(|finish| finish.place);
            debug!(hand_id, player = %knockout.eliminated, ?place, "player eliminated");
            self.eliminations.push(Elimination {
                player_name: knockout.eliminated.clone(),
                hand_id,
                eliminated_by: knockout.eliminator.clone(),
                bounty: knockout.bounty,
                place,
            });
        }
        self.hands_seen += 1;
        drifts
    }
}
