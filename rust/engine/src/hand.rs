use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cards::{all_suits, Card};
use crate::errors::EngineError;
use crate::player::{Player, Status};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Category {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

/// Matchers in the order `evaluate` tries them; the first hit wins.
pub const MATCHERS: [Category; 10] = [
    Category::RoyalFlush,
    Category::StraightFlush,
    Category::FourOfAKind,
    Category::FullHouse,
    Category::Flush,
    Category::Straight,
    Category::ThreeOfAKind,
    Category::TwoPair,
    Category::Pair,
    Category::HighCard,
];

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::HighCard => "high card",
            Category::Pair => "pair",
            Category::TwoPair => "two pair",
            Category::ThreeOfAKind => "three of a kind",
            Category::Straight => "straight",
            Category::Flush => "flush",
            Category::FullHouse => "full house",
            Category::FourOfAKind => "four of a kind",
            Category::StraightFlush => "straight flush",
            Category::RoyalFlush => "royal flush",
        }
    }

    pub fn matches(self, cards: &[Card]) -> bool {
        self.matches_profile(&Profile::of(cards))
    }

    /// Scores `cards` as this category without checking `matches` first.
    pub fn score(self, cards: &[Card]) -> Score {
        self.score_profile(&Profile::of(cards))
    }

    fn matches_profile(self, p: &Profile) -> bool {
        match self {
            Category::RoyalFlush => p
                .flush
                .as_ref()
                .is_some_and(|f| f.len() >= 5 && f[..5] == [14, 13, 12, 11, 10]),
            Category::StraightFlush => p.flush.as_ref().is_some_and(|f| straight_high(f).is_some()),
            Category::FourOfAKind => p.group_of(4).is_some(),
            Category::FullHouse => p.full_house().is_some(),
            Category::Flush => p.flush.is_some(),
            Category::Straight => straight_high(&p.values).is_some(),
            Category::ThreeOfAKind => p.groups.iter().filter(|(n, _)| *n == 3).count() == 1,
            Category::TwoPair => p.groups.iter().filter(|(n, _)| *n == 2).count() >= 2,
            Category::Pair => p.group_of(2).is_some(),
            Category::HighCard => true,
        }
    }

    fn score_profile(self, p: &Profile) -> Score {
        let mut rank = vec![self as u32];
        match self {
            Category::RoyalFlush => {}
            Category::StraightFlush => {
                let flush = p.flush.as_deref().unwrap_or(&[]);
                rank.push(straight_high(flush).unwrap_or(0));
            }
            Category::FourOfAKind => {
                let quad = p.group_of(4).unwrap_or(0);
                rank.push(quad * 4);
                rank.extend(p.kickers(&[quad], 1));
            }
            Category::FullHouse => {
                let (trips, pair) = p.full_house().unwrap_or((0, 0));
                rank.push(trips * 3);
                rank.push(pair * 2);
            }
            Category::Flush => {
                let flush = p.flush.as_deref().unwrap_or(&[]);
                rank.extend(flush.iter().take(5));
            }
            Category::Straight => rank.push(straight_high(&p.values).unwrap_or(0)),
            Category::ThreeOfAKind => {
                let trips = p.group_of(3).unwrap_or(0);
                rank.push(trips * 3);
                rank.extend(p.kickers(&[trips], 2));
            }
            Category::TwoPair => {
                let mut pairs = p.groups.iter().filter(|(n, _)| *n == 2).map(|(_, v)| *v);
                let high = pairs.next().unwrap_or(0);
                let low = pairs.next().unwrap_or(0);
                rank.push(high * 2);
                rank.push(low * 2);
                rank.extend(p.kickers(&[high, low], 1));
            }
            Category::Pair => {
                let pair = p.group_of(2).unwrap_or(0);
                rank.push(pair * 2);
                rank.extend(p.kickers(&[pair], 3));
            }
            Category::HighCard => rank.extend(p.values.iter().take(5)),
        }
        Score {
            category: self,
            rank,
        }
    }
}

/// Comparable strength of a hand. `rank[0]` is the category and the rest
/// are tie-breakers in descending significance.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub category: Category,
    pub rank: Vec<u32>,
}

impl Score {
    pub fn new(category: Category, rank: Vec<u32>) -> Self {
        Self { category, rank }
    }

    pub fn label(&self) -> &'static str {
        self.category.label()
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn evaluate(cards: &[Card]) -> Result<Score, EngineError> {
    if cards.len() < 5 {
        return Err(EngineError::NotEnoughCards(cards.len()));
    }
    let profile = Profile::of(cards);
    let category = MATCHERS
        .into_iter()
        .find(|m| m.matches_profile(&profile))
        .unwrap_or(Category::HighCard);
    Ok(category.score_profile(&profile))
}

/// Groups the ACTIVE players of `order` by score, best group first.
/// Players inside a group keep their play order.
pub fn rank_players(
    players: &[Player],
    order: &[usize],
    community: &[Card],
) -> Result<Vec<(Score, Vec<usize>)>, EngineError> {
    let mut ranked: BTreeMap<Score, Vec<usize>> = BTreeMap::new();
    for &seat in order {
        let player = players.get(seat).ok_or(EngineError::UnknownSeat {
            seat,
            seats: players.len(),
        })?;
        if player.status != Status::Active {
            continue;
        }
        let mut cards = player.cards.clone();
        cards.extend_from_slice(community);
        ranked.entry(evaluate(&cards)?).or_default().push(seat);
    }
    Ok(ranked.into_iter().rev().collect())
}

struct Profile {
    // card values, high -> low, duplicates kept
    values: Vec<u32>,
    // (count, value) ordered by count then value, both descending
    groups: Vec<(usize, u32)>,
    // values of the flush suit, high -> low
    flush: Option<Vec<u32>>,
}

impl Profile {
    fn of(cards: &[Card]) -> Self {
        let mut values: Vec<u32> = cards.iter().map(Card::value).collect();
        values.sort_unstable_by(|a, b| b.cmp(a));

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for v in &values {
            *counts.entry(*v).or_default() += 1;
        }
        let mut groups: Vec<(usize, u32)> = counts.into_iter().map(|(v, n)| (n, v)).collect();
        groups.sort_unstable_by(|a, b| b.cmp(a));

        let flush = all_suits()
            .into_iter()
            .map(|suit| {
                let mut suited: Vec<u32> = cards
                    .iter()
                    .filter(|c| c.suit == suit)
                    .map(Card::value)
                    .collect();
                suited.sort_unstable_by(|a, b| b.cmp(a));
                suited
            })
            .filter(|suited| suited.len() >= 5)
            .max();

        Self {
            values,
            groups,
            flush,
        }
    }

    fn group_of(&self, size: usize) -> Option<u32> {
        self.groups.iter().find(|(n, _)| *n == size).map(|(_, v)| *v)
    }

    fn full_house(&self) -> Option<(u32, u32)> {
        let trips = self.group_of(3)?;
        let pair = self
            .groups
            .iter()
            .filter(|(n, v)| *n >= 2 && *v != trips)
            .map(|(_, v)| *v)
            .max()?;
        Some((trips, pair))
    }

    fn kickers(&self, used: &[u32], count: usize) -> Vec<u32> {
        self.values
            .iter()
            .filter(|v| !used.contains(v))
            .take(count)
            .copied()
            .collect()
    }
}

// High card of the best 5-long run. An Ace also plays low, so A-2-3-4-5 reports 5.
fn straight_high(values: &[u32]) -> Option<u32> {
    let has = |v: u32| values.contains(&v) || (v == 1 && values.contains(&14));
    (5..=14)
        .rev()
        .find(|&high| (high - 4..=high).all(has))
}
