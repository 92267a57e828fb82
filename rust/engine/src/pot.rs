use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hand::Score;
use crate::logger::RoundLog;
use crate::player::Player;

/// One tranche of the pot. Only `payees` can win it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PotPart {
    pub name: String,
    pub size: u32,
    pub payees: BTreeSet<usize>,
    /// Per-player cap for this street, set by an all-in contribution. 0 means uncapped.
    pub bet_limit: u32,
}

impl PotPart {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            payees: BTreeSet::new(),
            bet_limit: 0,
        }
    }
}

/// Chips handed to one player out of one pot part.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub seat: usize,
    pub player: String,
    pub pot: String,
    pub amount: u32,
}

/// Side-pot accumulator for one hand. Always holds at least one part.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pot {
    parts: Vec<PotPart>,
}

impl Default for Pot {
    fn default() -> Self {
        Self::new()
    }
}

impl Pot {
    pub fn new() -> Self {
        Self {
            parts: vec![PotPart::new("Main pot")],
        }
    }

    pub fn parts(&self) -> &[PotPart] {
        &self.parts
    }

    pub fn total_size(&self) -> u32 {
        self.parts.iter().map(|p| p.size).sum()
    }

    fn reset(&mut self) {
        self.parts = vec![PotPart::new("Main pot")];
    }

    /// Sweeps every player's street commitment into the pot.
    ///
    /// Players are taken in ascending order of their commitment, so an all-in
    /// player caps a part before anybody who bet more reaches it; the excess
    /// spills into the next part. A part capped on an earlier street is
    /// closed, new chips start a fresh part.
    pub fn collect(&mut self, players: &mut [Player], order: &[usize]) {
        let mut contributors = order.to_vec();
        contributors.sort_by_key(|&seat| players[seat].current_bet);

        let start = match self.parts.last() {
            Some(last) if last.bet_limit > 0 => self.parts.len(),
            _ => self.parts.len().saturating_sub(1),
        };

        for seat in contributors {
            let chips = players[seat].collect_bet();
            if chips > 0 {
                let all_in = players[seat].is_active() && players[seat].stack == 0;
                self.sweep(start, seat, chips, all_in);
            }
        }
    }

    fn sweep(&mut self, start: usize, seat: usize, chips: u32, all_in: bool) {
        let mut remaining = chips;
        for part in self.parts.iter_mut().skip(start) {
            if remaining == 0 {
                break;
            }
            part.payees.insert(seat);
            if part.bet_limit == 0 {
                part.size += remaining;
                if all_in {
                    part.bet_limit = remaining;
                }
                remaining = 0;
            } else {
                let share = remaining.min(part.bet_limit);
                part.size += share;
                remaining -= share;
            }
        }
        if remaining > 0 {
            let mut part = PotPart::new(format!("Side pot {}", self.parts.len()));
            part.payees.insert(seat);
            part.size = remaining;
            if all_in {
                part.bet_limit = remaining;
            }
            self.parts.push(part);
        }
    }

    /// Everything goes to `winner`, e.g. when all others folded.
    pub fn pay_winner(
        &mut self,
        players: &mut [Player],
        winner: usize,
        log: &mut RoundLog,
    ) -> Vec<Payout> {
        let name = players[winner].name.clone();
        log.log(format!(
            "All pots go to {} with {} chips in total.",
            name,
            self.total_size()
        ));
        let payouts = self
            .parts
            .iter()
            .filter(|part| part.size > 0)
            .map(|part| Payout {
                seat: winner,
                player: name.clone(),
                pot: part.name.clone(),
                amount: part.size,
            })
            .collect::<Vec<_>>();
        players[winner].add_to_stack(self.total_size());
        self.reset();
        payouts
    }

    /// Pays every part to the best-ranked group among its payees.
    ///
    /// `ranked` lists score groups best first, players in play order. Splits
    /// are even; odd chips go to the first winner in play order. A part none
    /// of whose payees is ranked goes to the best group. Empty groups are
    /// skipped.
    pub fn pay_ranked(
        &mut self,
        players: &mut [Player],
        ranked: &[(Score, Vec<usize>)],
        log: &mut RoundLog,
    ) -> Vec<Payout> {
        let mut payouts = Vec::new();
        let mut unclaimed = std::mem::take(&mut self.parts);

        for (score, group) in ranked.iter().filter(|(_, g)| !g.is_empty()) {
            unclaimed.retain(|part| {
                let winners: Vec<usize> = group
                    .iter()
                    .copied()
                    .filter(|seat| part.payees.contains(seat))
                    .collect();
                if winners.is_empty() {
                    return true;
                }
                split(part, &winners, score, players, log, &mut payouts);
                false
            });
        }

        if let Some((score, group)) = ranked.iter().find(|(_, g)| !g.is_empty()) {
            for part in unclaimed.iter().filter(|p| p.size > 0) {
                split(part, group, score, players, log, &mut payouts);
            }
        }

        self.reset();
        payouts
    }
}

fn split(
    part: &PotPart,
    winners: &[usize],
    score: &Score,
    players: &mut [Player],
    log: &mut RoundLog,
    payouts: &mut Vec<Payout>,
) {
    let count = winners.len() as u32;
    let share = part.size / count;
    let odd = part.size % count;
    let names = winners
        .iter()
        .map(|&seat| players[seat].name.as_str())
        .collect::<Vec<_>>()
        .join(",");

    if winners.len() > 1 {
        log.log(format!(
            "{} of {} is split between {} ({} for each), for a '{}'",
            part.name,
            part.size,
            names,
            share,
            score.label()
        ));
    } else {
        log.log(format!(
            "{} of {} goes to {}, for a '{}'",
            part.name,
            part.size,
            names,
            score.label()
        ));
    }

    for (i, &seat) in winners.iter().enumerate() {
        let amount = if i == 0 { share + odd } else { share };
        players[seat].add_to_stack(amount);
        payouts.push(Payout {
            seat,
            player: players[seat].name.clone(),
            pot: part.name.clone(),
            amount,
        });
    }
    if odd > 0 {
        log.log(format!(
            "Player {} receives {} odd chip(s).",
            players[winners[0]].name, odd
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::Category;

    fn players(stacks: &[u32]) -> Vec<Player> {
        stacks
            .iter()
            .enumerate()
            .map(|(i, &s)| Player::new(format!("P{}", i + 1), s))
            .collect()
    }

    #[test]
    fn fresh_pot_has_one_empty_part() {
        let pot = Pot::new();
        assert_eq!(pot.parts().len(), 1);
        assert_eq!(pot.total_size(), 0);
    }

    #[test]
    fn all_in_caps_the_part_and_excess_spills_over() {
        let mut ps = players(&[30, 100, 100]);
        ps[0].bet(30);
        ps[1].bet(50);
        ps[2].bet(50);
        let mut pot = Pot::new();
        pot.collect(&mut ps, &[0, 1, 2]);

        let parts = pot.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].size, 90);
        assert_eq!(parts[0].bet_limit, 30);
        assert_eq!(parts[1].size, 40);
        assert_eq!(parts[1].payees, BTreeSet::from([1, 2]));
        assert_eq!(parts[1].name, "Side pot 1");
    }

    #[test]
    fn capped_part_stays_closed_on_later_streets() {
        let mut ps = players(&[50, 200, 200]);
        for p in ps.iter_mut() {
            p.bet(50);
        }
        let mut pot = Pot::new();
        pot.collect(&mut ps, &[0, 1, 2]);
        assert_eq!(pot.parts().len(), 1);

        ps[1].bet(40);
        ps[2].bet(40);
        pot.collect(&mut ps, &[0, 1, 2]);
        assert_eq!(pot.parts().len(), 2);
        assert_eq!(pot.parts()[0].size, 150);
        assert_eq!(pot.parts()[1].size, 80);
        assert!(!pot.parts()[1].payees.contains(&0));
    }

    #[test]
    fn odd_chip_goes_to_first_winner_in_play_order() {
        let mut ps = players(&[100, 100, 100]);
        ps[0].bet(11);
        ps[1].bet(11);
        ps[2].bet(11);
        ps[2].fold();
        let mut pot = Pot::new();
        pot.collect(&mut ps, &[1, 2, 0]);

        let tie = Score::new(Category::Pair, vec![1, 20]);
        let mut log = RoundLog::new(1);
        pot.pay_ranked(&mut ps, &[(tie, vec![1, 0])], &mut log);

        assert_eq!(ps[1].stack, 89 + 17);
        assert_eq!(ps[0].stack, 89 + 16);
        assert_eq!(ps.iter().map(|p| p.stack).sum::<u32>(), 300);
    }

    #[test]
    fn empty_score_groups_are_skipped() {
        let mut ps = players(&[100, 100, 100]);
        for p in ps.iter_mut() {
            p.bet(10);
        }
        ps[2].fold();
        let mut pot = Pot::new();
        pot.collect(&mut ps, &[0, 1, 2]);

        let mut log = RoundLog::new(1);
        let ranked = [
            (Score::new(Category::Flush, vec![9]), vec![]),
            (Score::new(Category::Pair, vec![4]), vec![1]),
            (Score::new(Category::HighCard, vec![2]), vec![0]),
        ];
        let payouts = pot.pay_ranked(&mut ps, &ranked, &mut log);

        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].seat, 1);
        assert_eq!(ps[1].stack, 90 + 30);
        assert_eq!(ps.iter().map(|p| p.stack).sum::<u32>(), 300);
    }

    #[test]
    fn pay_winner_takes_every_part_and_resets() {
        let mut ps = players(&[20, 100]);
        ps[0].bet(20);
        ps[1].bet(60);
        let mut pot = Pot::new();
        pot.collect(&mut ps, &[0, 1]);
        let mut log = RoundLog::new(1);
        let payouts = pot.pay_winner(&mut ps, 1, &mut log);

        assert_eq!(ps[1].stack, 120);
        assert_eq!(payouts.len(), 2);
        assert_eq!(pot.parts(), Pot::new().parts());
        assert_eq!(log.messages(), vec!["All pots go to P2 with 80 chips in total."]);
    }
}
