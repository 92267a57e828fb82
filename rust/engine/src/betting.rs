use crate::errors::{EngineError, ProviderError};
use crate::logger::{ActionRecord, RoundLog, Street};
use crate::player::{PlayerAction, Status};
use crate::provider::ActionProvider;
use crate::seats::Seats;
use crate::table::{redact, Table};

/// Drives one street of betting to completion.
///
/// Pre-flop the first seat of the play order posts the small blind and the
/// next active seat the big blind. After the flop the first active seat left
/// of the dealer acts first and the dealer closes the action. The round ends
/// when only one active player is left or the action is back at the last
/// aggressor; the player who would close an unraised round still gets to
/// check or raise once.
pub struct BetRound {
    street: Street,
    order: Vec<usize>,
    actions: Vec<ActionRecord>,
}

impl BetRound {
    /// `order` is the play order snapshot of the hand (see
    /// [`Table::players_in_play_order`]).
    pub fn new(street: Street, order: Vec<usize>) -> Self {
        Self {
            street,
            order,
            actions: Vec::new(),
        }
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<ActionRecord> {
        self.actions
    }

    /// Runs the street. Returns the winner if everybody else folded.
    ///
    /// `providers` is indexed by seat.
    pub fn run<P: ActionProvider>(
        &mut self,
        table: &mut Table,
        providers: &[P],
        log: &mut RoundLog,
    ) -> Result<Option<usize>, EngineError> {
        if self.order.len() < 2 {
            return Err(EngineError::NotEnoughPlayers(self.order.len()));
        }
        if let Some(&seat) = self.order.iter().find(|&&s| s >= table.players.len()) {
            return Err(EngineError::UnknownSeat {
                seat,
                seats: table.players.len(),
            });
        }

        log.log("Starting bet round.");
        let mut seats = Seats::new(self.order.clone());
        if self.street == Street::Preflop {
            self.post_blinds(table, &mut seats, log)?;
        } else if let Some(&dealer) = self.order.last() {
            seats.start_at(dealer);
        }
        seats.set_last_bet_to_current(&table.players);
        table.set_minimum_bet(table.big_blind());
        let mut option_open = true;

        loop {
            let seat = seats.advance();
            let closes = seats.last_betting_player() == Some(seat);

            if table.players[seat].status != Status::Active {
                if closes {
                    break;
                }
                continue;
            }

            table.active_player = seat;
            if seats.active_count(&table.players) == 1 {
                log.log(format!(
                    "Ending bet round with winner: {}",
                    table.players[seat].name
                ));
                return Ok(Some(seat));
            }

            if table.players[seat].is_all_in() {
                if closes {
                    break;
                }
                continue;
            }

            if closes {
                if !option_open {
                    break;
                }
                option_open = false;
                self.ask(seat, table, providers, log)?;
                if table.players[seat].current_bet <= seats.last_bet() {
                    break;
                }
                seats.set_last_bet_to_current(&table.players);
                table.set_minimum_bet(seats.last_bet());
            } else {
                self.ask(seat, table, providers, log)?;
                if table.players[seat].current_bet > seats.last_bet() {
                    seats.set_last_bet_to_current(&table.players);
                    table.set_minimum_bet(seats.last_bet());
                    option_open = false;
                }
            }
        }

        log.log("Ending bet round.");
        Ok(None)
    }

    fn post_blinds(
        &mut self,
        table: &mut Table,
        seats: &mut Seats,
        log: &mut RoundLog,
    ) -> Result<(), EngineError> {
        let small = seats.current();
        let amount = table.small_blind;
        self.post_blind(table, small, amount, "small", log);

        let big = seats
            .next_active(&table.players)?
            .ok_or(EngineError::NotEnoughPlayers(1))?;
        let amount = table.big_blind();
        self.post_blind(table, big, amount, "big", log);
        Ok(())
    }

    fn post_blind(&mut self, table: &mut Table, seat: usize, amount: u32, kind: &str, log: &mut RoundLog) {
        let player = &mut table.players[seat];
        player.bet(amount);
        if player.is_all_in() {
            log.log(format!(
                "Player {} goes all in for {} blind with {}.",
                player.name, kind, player.current_bet
            ));
        } else {
            log.log(format!(
                "Player {} pays {} blind of {}.",
                player.name, kind, player.current_bet
            ));
        }
        let action = if kind == "small" {
            PlayerAction::SmallBlind(player.current_bet)
        } else {
            PlayerAction::BigBlind(player.current_bet)
        };
        let record = ActionRecord {
            player: player.name.clone(),
            street: self.street,
            action,
        };
        self.actions.push(record);
    }

    fn ask<P: ActionProvider>(
        &mut self,
        seat: usize,
        table: &mut Table,
        providers: &[P],
        log: &mut RoundLog,
    ) -> Result<PlayerAction, EngineError> {
        let provider = providers
            .get(seat)
            .ok_or(EngineError::MissingProvider(seat))?;
        let name = table.players[seat].name.clone();

        let requested = match provider.request_bet(&redact(table, seat)) {
            Ok(bet) => bet,
            Err(err) => {
                tracing::warn!(player = %name, error = %err, "decision source failed, betting 0");
                log_failure(&name, &err, log);
                0
            }
        };
        tracing::debug!(player = %name, requested, "decision received");

        let action = perform_action(table, seat, requested, log);
        self.actions.push(ActionRecord {
            player: name,
            street: self.street,
            action,
        });
        Ok(action)
    }
}

fn log_failure(name: &str, err: &ProviderError, log: &mut RoundLog) {
    match err {
        ProviderError::Blocked(_) => log.log(format!(
            "Player {name} is blocked from this tournament and cannot bet."
        )),
        ProviderError::Struck { strike, .. } => log.log(format!(
            "Request to player {name} failed or took too long - Strike {strike}"
        )),
        other => log.log(format!("Request to player {name} failed: {other}")),
    }
}

/// Classifies the amount a player asked for and applies it to the table.
///
/// The amount is first raised to the player's current commitment. With no
/// bet on the table anything from the minimum bet up is a bet, less is a
/// check. Otherwise the minimum raise makes a raise, and a player who
/// already matches every other commitment checks. The minimum bet (or the
/// whole stack) calls, anything short of that folds. An amount the player
/// cannot cover puts them all in.
pub fn perform_action(table: &mut Table, seat: usize, requested: u32, log: &mut RoundLog) -> PlayerAction {
    let no_bets_yet = table.no_bets_yet();
    let minimum_bet = table.minimum_bet();
    let minimum_raise = table.minimum_raise();
    let highest_other = table
        .players
        .iter()
        .enumerate()
        .filter(|(i, p)| *i != seat && p.status == Status::Active)
        .map(|(_, p)| p.current_bet)
        .max()
        .unwrap_or(0);
    let player = &mut table.players[seat];
    let bet = requested.max(player.current_bet);

    if no_bets_yet {
        if bet >= minimum_bet && bet > 0 {
            return commit(player, bet, log, |name, amount| {
                format!("Player {name} bets {amount}.")
            })
            .unwrap_or(PlayerAction::Bet(bet));
        }
        log.log(format!("Player {} checks.", player.name));
        return PlayerAction::Check;
    }

    if bet >= minimum_raise {
        commit(player, bet, log, |name, amount| {
            format!("Player {name} raises to {amount}.")
        })
        .unwrap_or(PlayerAction::Raise(bet))
    } else if bet == player.current_bet && bet >= highest_other {
        // a short all-in left nothing to call
        log.log(format!("Player {} checks.", player.name));
        PlayerAction::Check
    } else if bet >= minimum_bet || bet >= player.stack {
        if bet == player.current_bet {
            log.log(format!("Player {} checks.", player.name));
            PlayerAction::Check
        } else {
            commit(player, minimum_bet, log, |name, amount| {
                format!("Player {name} calls the bet of {amount}.")
            })
            .unwrap_or(PlayerAction::Call(minimum_bet))
        }
    } else {
        log.log(format!("Player {} folds.", player.name));
        player.fold();
        PlayerAction::Fold
    }
}

// Puts `to` in front of the player. Returns `Some(AllIn)` when the stack
// does not cover it, `None` after logging `describe` otherwise.
fn commit(
    player: &mut crate::player::Player,
    to: u32,
    log: &mut RoundLog,
    describe: impl FnOnce(&str, u32) -> String,
) -> Option<PlayerAction> {
    if player.is_going_all_in(to) {
        player.bet(to);
        log.log(format!(
            "Player {} goes all in with {}.",
            player.name, player.current_bet
        ));
        return Some(PlayerAction::AllIn(player.current_bet));
    }
    log.log(describe(&player.name, to));
    player.bet(to);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;

    fn table(stacks: &[u32]) -> Table {
        let players = stacks
            .iter()
            .enumerate()
            .map(|(i, &s)| Player::new(format!("p{i}"), s))
            .collect();
        Table::new(1, players, 5)
    }

    #[test]
    fn opening_below_minimum_is_a_check() {
        let mut t = table(&[100, 100]);
        let mut log = RoundLog::new(1);
        assert_eq!(perform_action(&mut t, 0, 5, &mut log), PlayerAction::Check);
        assert_eq!(perform_action(&mut t, 0, 10, &mut log), PlayerAction::Bet(10));
        assert_eq!(t.players[0].current_bet, 10);
    }

    #[test]
    fn facing_a_bet_amounts_are_classified_by_thresholds() {
        let mut t = table(&[100, 100, 100, 100]);
        t.players[0].bet(10);
        let mut log = RoundLog::new(1);

        assert_eq!(perform_action(&mut t, 1, 0, &mut log), PlayerAction::Fold);
        assert_eq!(t.players[1].status, Status::Folded);
        assert_eq!(perform_action(&mut t, 2, 15, &mut log), PlayerAction::Call(10));
        assert_eq!(t.players[2].current_bet, 10);
        assert_eq!(perform_action(&mut t, 3, 20, &mut log), PlayerAction::Raise(20));
    }

    #[test]
    fn amount_below_commitment_is_raised_to_it() {
        let mut t = table(&[100, 100]);
        t.players[0].bet(10);
        t.players[1].bet(10);
        let mut log = RoundLog::new(1);
        assert_eq!(perform_action(&mut t, 1, 0, &mut log), PlayerAction::Check);
        assert_eq!(log.messages(), vec!["Player p1 checks."]);
    }

    #[test]
    fn small_blind_over_a_short_all_in_big_blind_checks() {
        let mut t = table(&[100, 3]);
        t.players[0].bet(5);
        t.players[1].bet(3);
        assert!(t.players[1].is_all_in());
        let mut log = RoundLog::new(1);

        assert_eq!(perform_action(&mut t, 0, 0, &mut log), PlayerAction::Check);
        assert_eq!(t.players[0].status, Status::Active);
        assert_eq!(t.players[0].current_bet, 5);
        assert_eq!(log.messages(), vec!["Player p0 checks."]);
    }

    #[test]
    fn short_stack_goes_all_in() {
        let mut t = table(&[100, 7]);
        t.players[0].bet(10);
        let mut log = RoundLog::new(1);
        assert_eq!(perform_action(&mut t, 1, 7, &mut log), PlayerAction::AllIn(7));
        assert!(t.players[1].is_all_in());
        assert_eq!(log.messages(), vec!["Player p1 goes all in with 7."]);
    }
}
