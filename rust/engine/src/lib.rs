//! # dealer-engine: No-limit Texas Hold'em tournament engine
//!
//! Plays single-table tournaments between decision sources ("bots") down to
//! one survivor. The engine is synchronous; the only blocking call is asking
//! a decision source for a bet.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation (Suit, Rank, Card)
//! - [`deck`] - ChaCha20-shuffled deck, seedable for replays
//! - [`hand`] - Hand evaluation into comparable scores
//! - [`player`] / [`table`] - Table state and the per-player redacted view
//! - [`seats`] - Turn rotation inside a betting round
//! - [`betting`] - Blinds and one street of betting
//! - [`pot`] - Side-pot accumulation and payout
//! - [`round`] - One hand from deal to showdown
//! - [`tournament`] - Rounds until a single player is left
//! - [`provider`] - Decision sources and the strike guard
//! - [`logger`] - Round log lines and JSONL hand records
//! - [`errors`] - Error types
//!
//! ## Quick Start
//!
//! ```rust
//! use dealer_engine::cards::{Card, Rank, Suit};
//! use dealer_engine::hand::{evaluate, Category};
//!
//! let cards = [
//!     Card::new(Rank::Ace, Suit::Spades),
//!     Card::new(Rank::Two, Suit::Hearts),
//!     Card::new(Rank::Three, Suit::Clubs),
//!     Card::new(Rank::Four, Suit::Diamonds),
//!     Card::new(Rank::Five, Suit::Spades),
//! ];
//! let score = evaluate(&cards).unwrap();
//! assert_eq!(score.category, Category::Straight);
//! assert_eq!(score.rank, vec![4, 5]);
//! ```
//!
//! ## Running a tournament
//!
//! ```rust
//! use dealer_engine::provider::constant;
//! use dealer_engine::round::RoundReport;
//! use dealer_engine::tournament::{Seat, Tournament, TournamentObserver};
//!
//! struct Quiet;
//! impl TournamentObserver for Quiet {
//!     fn round_completed(&mut self, _: &RoundReport) {}
//! }
//!
//! let seats = vec![Seat::new("caller", constant(10)), Seat::new("pusher", constant(1_000))];
//! let mut tournament = Tournament::new(1, seats).unwrap().with_seed(7);
//! let outcome = tournament.run(&mut Quiet, &|| false).unwrap();
//! assert_eq!(outcome.winners.len(), 1);
//! ```

pub mod betting;
pub mod cards;
pub mod deck;
pub mod errors;
pub mod hand;
pub mod logger;
pub mod player;
pub mod pot;
pub mod provider;
pub mod round;
pub mod seats;
pub mod table;
pub mod tournament;
