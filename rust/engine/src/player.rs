use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// What a player did on their turn, after the requested amount was classified.
/// Amounts are the total committed this street.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    SmallBlind(u32),
    BigBlind(u32),
    Fold,
    Check,
    Call(u32),
    Bet(u32),
    Raise(u32),
    AllIn(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Still in the hand.
    Active,
    /// Folded for the rest of the current round.
    Folded,
    /// Busted; takes no further part in the tournament.
    Out,
}

/// A seat at the table. Chips committed this street live in `current_bet`
/// and stay part of `stack` until the pot collects them.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub status: Status,
    pub stack: u32,
    #[serde(rename = "bet")]
    pub current_bet: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
}

impl Player {
    pub fn new(name: impl Into<String>, stack: u32) -> Self {
        Self {
            name: name.into(),
            status: Status::Active,
            stack,
            current_bet: 0,
            cards: Vec::new(),
        }
    }

    /// Raises the commitment for this street to `to`, capped at the stack.
    /// Never lowers an existing commitment.
    pub fn bet(&mut self, to: u32) {
        if to > self.stack {
            self.current_bet = self.stack;
        } else if to > self.current_bet {
            self.current_bet = to;
        }
    }

    /// Moves the street's commitment out of the stack and returns it.
    pub fn collect_bet(&mut self) -> u32 {
        let chips = self.current_bet;
        self.current_bet = 0;
        self.stack -= chips;
        chips
    }

    pub fn add_to_stack(&mut self, chips: u32) {
        self.stack += chips;
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_all_in(&self) -> bool {
        self.is_active() && self.current_bet == self.stack
    }

    pub fn is_going_all_in(&self, to: u32) -> bool {
        self.is_active() && to >= self.stack
    }

    pub fn fold(&mut self) {
        self.status = Status::Folded;
    }

    pub fn out(&mut self) {
        self.status = Status::Out;
    }

    pub fn activate(&mut self) {
        self.status = Status::Active;
    }

    pub fn take_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn clear_cards(&mut self) {
        self.cards.clear();
    }
}
