use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};
use crate::errors::EngineError;

/// A 52-card deck dealt from the top.
///
/// Every deck is shuffled on construction; a seeded deck produces the same
/// order for the same seed, which keeps recorded rounds reproducible.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
    position: usize,
}

impl Deck {
    pub fn new() -> Self {
        Self::shuffled_with(&mut ChaCha20Rng::from_os_rng())
    }

    pub fn new_with_seed(seed: u64) -> Self {
        Self::shuffled_with(&mut ChaCha20Rng::seed_from_u64(seed))
    }

    /// A deck that deals `cards` in the given order. Used to replay fixed boards.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, position: 0 }
    }

    fn shuffled_with(rng: &mut ChaCha20Rng) -> Self {
        let mut cards = full_deck();
        cards.shuffle(rng);
        Self { cards, position: 0 }
    }

    pub fn deal_card(&mut self) -> Result<Card, EngineError> {
        let card = self
            .cards
            .get(self.position)
            .copied()
            .ok_or(EngineError::DeckExhausted)?;
        self.position += 1;
        Ok(card)
    }

    pub fn deal(&mut self, count: usize) -> Result<Vec<Card>, EngineError> {
        (0..count).map(|_| self.deal_card()).collect()
    }

    pub fn burn_card(&mut self) -> Result<(), EngineError> {
        self.deal_card().map(|_| ())
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.position)
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
