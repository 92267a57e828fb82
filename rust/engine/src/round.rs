use std::thread;
use std::time::Duration;

use crate::betting::BetRound;
use crate::cards::describe;
use crate::deck::Deck;
use crate::errors::EngineError;
use crate::hand::rank_players;
use crate::logger::{ActionRecord, HandRecord, RoundLog, RoundLogEntry, Street};
use crate::player::Status;
use crate::pot::{Payout, Pot};
use crate::provider::ActionProvider;
use crate::table::Table;

const FLOP_CARDS: usize = 3;
const TURN_CARDS: usize = 1;
const RIVER_CARDS: usize = 1;

/// Everything a finished round leaves behind.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round: u64,
    pub log: Vec<RoundLogEntry>,
    /// Table as it stood when the round ended. Only hands shown at showdown are visible.
    pub table: Table,
    pub record: HandRecord,
}

/// Plays one hand: deal, four betting streets and the showdown.
pub struct GameRound {
    step_delay: Duration,
    pot: Pot,
    actions: Vec<ActionRecord>,
    payouts: Vec<Payout>,
    shown: Vec<usize>,
}

impl GameRound {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            step_delay,
            pot: Pot::new(),
            actions: Vec::new(),
            payouts: Vec::new(),
            shown: Vec::new(),
        }
    }

    /// Plays the hand on `table`, calling `on_street` with an observer copy
    /// of the table after every completed street.
    ///
    /// Whatever happens, the table is prepared for the next round before
    /// returning: busted players are OUT, cards are cleared and the button
    /// moved.
    pub fn play<P: ActionProvider>(
        mut self,
        table: &mut Table,
        deck: &mut Deck,
        providers: &[P],
        on_street: &mut dyn FnMut(Street, &Table),
    ) -> Result<RoundReport, EngineError> {
        let round = table.round;
        let order = table.players_in_play_order();
        let mut log = RoundLog::new(round);

        let played = self.play_streets(table, deck, providers, &order, &mut log, on_street);
        if let Err(err) = &played {
            tracing::error!(round, error = %err, "round aborted");
            log.log(format!("Round aborted: {err}"));
        }

        log.log(format!("Ending round {round}."));
        let snapshot = self.finish(table, &order);

        played?;
        Ok(RoundReport {
            round,
            record: HandRecord {
                tournament_id: snapshot.tournament_id,
                round,
                actions: self.actions,
                board: snapshot.community_cards.clone(),
                payouts: self.payouts,
                ts: None,
            },
            table: snapshot,
            log: log.into_entries(),
        })
    }

    fn play_streets<P: ActionProvider>(
        &mut self,
        table: &mut Table,
        deck: &mut Deck,
        providers: &[P],
        order: &[usize],
        log: &mut RoundLog,
        on_street: &mut dyn FnMut(Street, &Table),
    ) -> Result<(), EngineError> {
        if order.len() < 2 {
            return Err(EngineError::NotEnoughPlayers(order.len()));
        }

        for _ in 0..2 {
            for &seat in order {
                let card = deck.deal_card()?;
                table.players[seat].take_card(card);
            }
        }
        deck.burn_card()?;
        log.log(format!("Starting round {}.", table.round));

        let streets = [
            (Street::Preflop, 0),
            (Street::Flop, FLOP_CARDS),
            (Street::Turn, TURN_CARDS),
            (Street::River, RIVER_CARDS),
        ];
        for (street, cards) in streets {
            if street != Street::Preflop {
                self.pause();
                for card in deck.deal(cards)? {
                    table.take_card(card);
                }
                deck.burn_card()?;
                let dealt = &table.community_cards[table.community_cards.len() - cards..];
                log.log(format!("{:?}: {}", street, describe(dealt, ", ")));
            }

            if let Some(winner) = self.bet_street(street, table, providers, order, log)? {
                self.payouts = self.pot.pay_winner(&mut table.players, winner, log);
                table.pot = self.pot.total_size();
                return Ok(());
            }
            on_street(street, &table.public_view());
        }

        self.pause();
        self.showdown(table, order, log)
    }

    fn bet_street<P: ActionProvider>(
        &mut self,
        street: Street,
        table: &mut Table,
        providers: &[P],
        order: &[usize],
        log: &mut RoundLog,
    ) -> Result<Option<usize>, EngineError> {
        if everyone_is_all_in(table, order) {
            return Ok(None);
        }
        let mut bet_round = BetRound::new(street, order.to_vec());
        let winner = bet_round.run(table, providers, log)?;
        self.actions.extend(bet_round.into_actions());
        self.pot.collect(&mut table.players, order);
        table.pot = self.pot.total_size();
        Ok(winner)
    }

    fn showdown(&mut self, table: &mut Table, order: &[usize], log: &mut RoundLog) -> Result<(), EngineError> {
        let ranked = rank_players(&table.players, order, &table.community_cards)?;
        for (score, group) in &ranked {
            for &seat in group {
                let player = &table.players[seat];
                log.log(format!(
                    "Player {} has {} ({}).",
                    player.name,
                    describe(&player.cards, " and "),
                    score.label()
                ));
                self.shown.push(seat);
            }
        }
        self.payouts = self.pot.pay_ranked(&mut table.players, &ranked, log);
        table.pot = self.pot.total_size();
        Ok(())
    }

    fn finish(&self, table: &mut Table, order: &[usize]) -> Table {
        for &seat in order {
            if table.players[seat].stack == 0 {
                table.players[seat].out();
            }
        }

        let mut snapshot = table.clone();
        for (seat, player) in snapshot.players.iter_mut().enumerate() {
            if !self.shown.contains(&seat) {
                player.clear_cards();
            }
        }

        for player in table.players.iter_mut() {
            if player.status != Status::Out {
                player.activate();
            }
            player.clear_cards();
            player.current_bet = 0;
        }
        table.reset_for_next_round();
        snapshot
    }

    fn pause(&self) {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
    }
}

// All but at most one active player are all in, so nobody is left to bet against.
fn everyone_is_all_in(table: &Table, order: &[usize]) -> bool {
    let active: Vec<_> = order
        .iter()
        .map(|&seat| &table.players[seat])
        .filter(|p| p.is_active())
        .collect();
    let all_in = active.iter().filter(|p| p.is_all_in()).count();
    all_in + 1 >= active.len()
}
