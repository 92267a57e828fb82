use thiserror::Error;

/// Violated engine preconditions. Any of these aborts the hand in progress.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("No active player left at the table")]
    NoActivePlayers,
    #[error("At least two players are needed, got {0}")]
    NotEnoughPlayers(usize),
    #[error("The deck is exhausted")]
    DeckExhausted,
    #[error("A hand needs at least 5 cards, got {0}")]
    NotEnoughCards(usize),
    #[error("Seat {seat} does not exist (table has {seats} seats)")]
    UnknownSeat { seat: usize, seats: usize },
    #[error("No decision source for seat {0}")]
    MissingProvider(usize),
}

/// Failures of a decision source. The betting round turns every one of
/// these into a bet of 0.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Unreachable(String),
    #[error("no answer within {0} ms")]
    Timeout(u64),
    #[error("malformed answer: {0}")]
    Malformed(String),
    #[error("player is disconnected")]
    Disconnected,
    #[error("blocked for tournament {0}")]
    Blocked(u64),
    #[error("strike {strike}: {reason}")]
    Struck { strike: u32, reason: Box<ProviderError> },
}
