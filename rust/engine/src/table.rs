use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::player::{Player, Status};

/// State of the single table of a tournament.
///
/// Players keep their seat index for the lifetime of the tournament; busted
/// players stay in the list with [`Status::Out`]. The live table is owned by
/// the tournament runner, everybody else works on clones.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub tournament_id: u64,
    pub community_cards: Vec<Card>,
    pub players: Vec<Player>,
    pub round: u64,
    pub small_blind: u32,
    minimum_bet: u32,
    minimum_raise: u32,
    /// Chips already swept into the pot, excluding this street's bets.
    pub pot: u32,
    pub active_player: usize,
    pub current_dealer: usize,
}

impl Table {
    pub fn new(tournament_id: u64, players: Vec<Player>, small_blind: u32) -> Self {
        let mut table = Self {
            tournament_id,
            community_cards: Vec::new(),
            players,
            round: 1,
            small_blind,
            minimum_bet: 0,
            minimum_raise: 0,
            pot: 0,
            active_player: 0,
            current_dealer: 0,
        };
        table.set_minimum_bet(table.big_blind());
        table
    }

    pub fn big_blind(&self) -> u32 {
        self.small_blind * 2
    }

    /// The amount a player must reach to stay in this street.
    pub fn minimum_bet(&self) -> u32 {
        self.minimum_bet
    }

    /// Any raise has to reach twice the minimum bet.
    pub fn minimum_raise(&self) -> u32 {
        self.minimum_raise
    }

    pub fn set_minimum_bet(&mut self, amount: u32) {
        self.minimum_bet = amount;
        self.minimum_raise = amount.saturating_mul(2);
    }

    pub fn take_card(&mut self, card: Card) {
        self.community_cards.push(card);
    }

    pub fn no_bets_yet(&self) -> bool {
        self.players.iter().all(|p| p.current_bet == 0)
    }

    pub fn seated_count(&self) -> usize {
        self.players.iter().filter(|p| p.status != Status::Out).count()
    }

    fn next_seated(&self, from: usize) -> Option<usize> {
        let seats = self.players.len();
        (1..=seats)
            .map(|step| (from + step) % seats)
            .find(|&i| self.players[i].status != Status::Out)
    }

    /// Seat indices of every player still in the tournament, starting left
    /// of the dealer and ending with the dealer.
    pub fn players_in_play_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.players.len());
        let mut seat = self.current_dealer;
        for _ in 0..self.seated_count() {
            match self.next_seated(seat) {
                Some(next) => {
                    order.push(next);
                    seat = next;
                }
                None => break,
            }
        }
        order
    }

    pub fn move_dealer_button(&mut self) {
        if let Some(next) = self.next_seated(self.current_dealer) {
            self.current_dealer = next;
        }
    }

    /// Clears the board, passes the button and doubles the small blind after
    /// every two full button cycles.
    pub fn reset_for_next_round(&mut self) {
        self.community_cards.clear();
        self.pot = 0;
        self.move_dealer_button();
        self.round += 1;
        let cycle = (self.players.len() as u64) * 2;
        if cycle > 0 && self.round % cycle == 0 {
            self.small_blind = self.small_blind.saturating_mul(2);
        }
        self.set_minimum_bet(self.big_blind());
    }

    /// Copy for observers: nobody's hole cards are visible.
    pub fn public_view(&self) -> Table {
        let mut view = self.clone();
        view.players.iter_mut().for_each(Player::clear_cards);
        view
    }
}

/// Copy of `table` as seen by the player in seat `viewer`: every other
/// player's hand is empty.
pub fn redact(table: &Table, viewer: usize) -> Table {
    let mut view = table.clone();
    for (seat, player) in view.players.iter_mut().enumerate() {
        if seat != viewer {
            player.clear_cards();
        }
    }
    view.active_player = viewer;
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};

    fn table_of(stacks: &[u32]) -> Table {
        let players = stacks
            .iter()
            .enumerate()
            .map(|(i, &s)| Player::new(format!("p{i}"), s))
            .collect();
        Table::new(1, players, 5)
    }

    #[test]
    fn play_order_starts_left_of_dealer_and_skips_busted_players() {
        let mut table = table_of(&[100, 100, 100, 100]);
        table.players[2].out();
        assert_eq!(table.players_in_play_order(), vec![1, 3, 0]);

        table.current_dealer = 3;
        assert_eq!(table.players_in_play_order(), vec![0, 1, 3]);
    }

    #[test]
    fn button_skips_busted_players() {
        let mut table = table_of(&[100, 100, 100]);
        table.players[1].out();
        table.move_dealer_button();
        assert_eq!(table.current_dealer, 2);
        table.move_dealer_button();
        assert_eq!(table.current_dealer, 0);
    }

    #[test]
    fn blinds_double_after_two_button_cycles() {
        let mut table = table_of(&[100, 100]);
        let mut blinds = vec![];
        for _ in 0..8 {
            table.reset_for_next_round();
            blinds.push((table.round, table.small_blind));
        }
        assert_eq!(
            blinds,
            vec![(2, 5), (3, 5), (4, 10), (5, 10), (6, 10), (7, 10), (8, 20), (9, 20)]
        );
        assert_eq!(table.minimum_bet(), 40);
        assert_eq!(table.minimum_raise(), 80);
    }

    #[test]
    fn redact_keeps_only_the_viewers_hand() {
        let mut table = table_of(&[100, 100, 100]);
        for (i, p) in table.players.iter_mut().enumerate() {
            p.take_card(Card::new(Rank::Ace, Suit::Spades));
            p.take_card(Card::new(Rank::Two, Suit::Hearts));
            p.current_bet = i as u32;
        }

        let view = redact(&table, 1);
        assert!(view.players[0].cards.is_empty());
        assert_eq!(view.players[1].cards.len(), 2);
        assert!(view.players[2].cards.is_empty());
        assert_eq!(view.players[2].current_bet, 2);
        assert_eq!(view.active_player, 1);
        assert_eq!(table.players[0].cards.len(), 2);
    }

    #[test]
    fn serializes_with_derived_minimum_raise() {
        let json = serde_json::to_value(table_of(&[100, 100])).unwrap();
        assert_eq!(json["minimumBet"], 10);
        assert_eq!(json["minimumRaise"], 20);
        assert_eq!(json["smallBlind"], 5);
        assert_eq!(json["currentDealer"], 0);
    }
}
