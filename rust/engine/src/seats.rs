use crate::errors::EngineError;
use crate::player::{Player, Status};

/// Turn cursor for one betting round.
///
/// Walks the play-order snapshot cyclically and remembers the last
/// aggressive action, which is how the round notices it has closed.
#[derive(Debug, Clone)]
pub struct Seats {
    order: Vec<usize>,
    position: usize,
    last_bet: u32,
    last_betting_player: Option<usize>,
}

impl Seats {
    pub fn new(order: Vec<usize>) -> Self {
        Self {
            order,
            position: 0,
            last_bet: 0,
            last_betting_player: None,
        }
    }

    /// Puts the cursor on `seat` if it is part of the order.
    pub fn start_at(&mut self, seat: usize) {
        if let Some(pos) = self.order.iter().position(|&s| s == seat) {
            self.position = pos;
        }
    }

    pub fn current(&self) -> usize {
        self.order[self.position]
    }

    /// Moves to the next seat in the order, whatever its status.
    pub fn advance(&mut self) -> usize {
        self.position = (self.position + 1) % self.order.len();
        self.current()
    }

    /// Moves to the next ACTIVE seat. Returns `None` when the search comes
    /// back to the seat it started from.
    pub fn next_active(&mut self, players: &[Player]) -> Result<Option<usize>, EngineError> {
        if self.order.iter().all(|&s| players[s].status == Status::Out) {
            return Err(EngineError::NoActivePlayers);
        }
        let initial = self.current();
        for _ in 0..self.order.len() {
            let seat = self.advance();
            if players[seat].status == Status::Active {
                return Ok((seat != initial).then_some(seat));
            }
        }
        Ok(None)
    }

    pub fn active_count(&self, players: &[Player]) -> usize {
        self.order
            .iter()
            .filter(|&&s| players[s].status == Status::Active)
            .count()
    }

    pub fn last_bet(&self) -> u32 {
        self.last_bet
    }

    pub fn last_betting_player(&self) -> Option<usize> {
        self.last_betting_player
    }

    /// Records the seat under the cursor as the last aggressor at its current bet.
    pub fn set_last_bet_to_current(&mut self, players: &[Player]) {
        let seat = self.current();
        self.last_bet = players[seat].current_bet;
        self.last_betting_player = Some(seat);
    }
}
