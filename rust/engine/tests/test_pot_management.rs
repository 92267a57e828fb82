use std::collections::BTreeSet;

use dealer_engine::hand::{Category, Score};
use dealer_engine::logger::RoundLog;
use dealer_engine::player::Player;
use dealer_engine::pot::Pot;
use proptest::prelude::*;

fn players(stacks: &[u32]) -> Vec<Player> {
    stacks
        .iter()
        .enumerate()
        .map(|(i, &s)| Player::new(format!("P{}", i + 1), s))
        .collect()
}

fn bet_all(players: &mut [Player], bets: &[u32]) {
    for (p, &b) in players.iter_mut().zip(bets) {
        p.bet(b);
    }
}

fn stacks(players: &[Player]) -> Vec<u32> {
    players.iter().map(|p| p.stack).collect()
}

// P1 best, P2 second, P3 and P4 tied for third.
fn standard_ranking() -> Vec<(Score, Vec<usize>)> {
    vec![
        (Score::new(Category::StraightFlush, vec![3]), vec![0]),
        (Score::new(Category::Flush, vec![2]), vec![1]),
        (Score::new(Category::Pair, vec![1]), vec![2, 3]),
    ]
}

#[test]
fn side_pots_follow_all_in_levels() {
    let mut ps = players(&[20, 100, 200, 200]);
    bet_all(&mut ps, &[20, 100, 150, 150]);
    let mut pot = Pot::new();
    pot.collect(&mut ps, &[0, 1, 2, 3]);

    let sizes: Vec<u32> = pot.parts().iter().map(|p| p.size).collect();
    assert_eq!(sizes, vec![80, 240, 100]);
    assert_eq!(pot.parts()[0].payees, BTreeSet::from([0, 1, 2, 3]));
    assert_eq!(pot.parts()[1].payees, BTreeSet::from([1, 2, 3]));
    assert_eq!(pot.parts()[2].payees, BTreeSet::from([2, 3]));

    let mut log = RoundLog::new(1);
    pot.pay_ranked(&mut ps, &standard_ranking(), &mut log);
    assert_eq!(stacks(&ps), vec![80, 240, 100, 100]);
    assert_eq!(
        log.messages(),
        vec![
            "Main pot of 80 goes to P1, for a 'straight flush'",
            "Side pot 1 of 240 goes to P2, for a 'flush'",
            "Side pot 2 of 100 is split between P3,P4 (50 for each), for a 'pair'",
        ]
    );
}

#[test]
fn late_all_in_players_are_sorted_by_commitment() {
    let mut ps = players(&[80, 120, 20, 200]);
    bet_all(&mut ps, &[80, 120, 20, 120]);
    let mut pot = Pot::new();
    pot.collect(&mut ps, &[0, 1, 2, 3]);

    let mut log = RoundLog::new(1);
    pot.pay_ranked(&mut ps, &standard_ranking(), &mut log);
    assert_eq!(stacks(&ps), vec![260, 80, 0, 80]);
}

#[test]
fn side_pots_across_several_streets() {
    let mut ps = players(&[20, 100, 200, 200]);
    let order = [0, 1, 2, 3];
    let mut pot = Pot::new();

    bet_all(&mut ps, &[10, 10, 10, 10]);
    pot.collect(&mut ps, &order);
    bet_all(&mut ps, &[10, 50, 50, 50]);
    pot.collect(&mut ps, &order);
    bet_all(&mut ps, &[0, 40, 90, 90]);
    pot.collect(&mut ps, &order);

    assert_eq!(pot.total_size(), 420);
    let mut log = RoundLog::new(1);
    pot.pay_ranked(&mut ps, &standard_ranking(), &mut log);
    assert_eq!(stacks(&ps), vec![80, 240, 100, 100]);
}

#[test]
fn best_hand_cannot_win_a_side_pot_it_did_not_contribute_to() {
    let mut ps = players(&[10, 100, 100]);
    bet_all(&mut ps, &[10, 60, 60]);
    let mut pot = Pot::new();
    pot.collect(&mut ps, &[0, 1, 2]);

    let ranking = vec![
        (Score::new(Category::RoyalFlush, vec![9]), vec![0]),
        (Score::new(Category::HighCard, vec![0, 9]), vec![2]),
        (Score::new(Category::HighCard, vec![0, 8]), vec![1]),
    ];
    let mut log = RoundLog::new(1);
    let payouts = pot.pay_ranked(&mut ps, &ranking, &mut log);

    assert_eq!(stacks(&ps), vec![30, 40, 140]);
    assert!(payouts.iter().all(|p| p.seat != 0 || p.pot == "Main pot"));
}

#[test]
fn pay_always_leaves_a_single_empty_part() {
    let mut ps = players(&[20, 100, 200]);
    bet_all(&mut ps, &[20, 100, 100]);
    let mut pot = Pot::new();
    pot.collect(&mut ps, &[0, 1, 2]);
    assert!(pot.parts().len() > 1);

    let mut log = RoundLog::new(1);
    pot.pay_ranked(&mut ps, &standard_ranking()[..2], &mut log);
    assert_eq!(pot.parts().len(), 1);
    assert_eq!(pot.total_size(), 0);

    bet_all(&mut ps, &[0, 10, 10]);
    pot.collect(&mut ps, &[0, 1, 2]);
    pot.pay_winner(&mut ps, 2, &mut log);
    assert_eq!(pot.parts().len(), 1);
    assert_eq!(pot.parts()[0].name, "Main pot");
    assert!(pot.parts()[0].payees.is_empty());
}

#[test]
fn folded_contributions_go_to_the_remaining_players() {
    let mut ps = players(&[100, 100, 100]);
    bet_all(&mut ps, &[30, 60, 60]);
    ps[0].fold();
    let mut pot = Pot::new();
    pot.collect(&mut ps, &[0, 1, 2]);

    let ranking = vec![(Score::new(Category::Pair, vec![1, 20]), vec![2]), (Score::new(Category::HighCard, vec![0]), vec![1])];
    let mut log = RoundLog::new(1);
    pot.pay_ranked(&mut ps, &ranking, &mut log);
    assert_eq!(stacks(&ps), vec![70, 40, 190]);
}

proptest! {
    #[test]
    fn chips_are_never_created_or_destroyed(
        setup in prop::collection::vec((1u32..500, 0u32..=100, any::<bool>()), 2..7),
        streets in 1usize..4,
        ranking_seed in any::<u64>(),
    ) {
        let start: Vec<u32> = setup.iter().map(|(s, _, _)| *s).collect();
        let mut ps = players(&start);
        let order: Vec<usize> = (0..ps.len()).collect();
        let mut pot = Pot::new();

        for street in 0..streets {
            for (i, (_, pct, folds)) in setup.iter().enumerate() {
                if !ps[i].is_active() {
                    continue;
                }
                let bet = ps[i].stack * pct / 100 / (street as u32 + 1);
                ps[i].bet(bet);
                if *folds && street == 1 {
                    ps[i].fold();
                }
            }
            pot.collect(&mut ps, &order);
        }

        let mut active: Vec<usize> = order.iter().copied().filter(|&i| ps[i].is_active()).collect();
        if active.is_empty() {
            active.push(0);
        }
        let rotate = (ranking_seed as usize) % active.len();
        active.rotate_left(rotate);
        let ranking: Vec<(Score, Vec<usize>)> = active
            .chunks(2)
            .enumerate()
            .map(|(i, group)| (Score::new(Category::HighCard, vec![0, 100 - i as u32]), group.to_vec()))
            .collect();

        let mut log = RoundLog::new(1);
        pot.pay_ranked(&mut ps, &ranking, &mut log);

        prop_assert_eq!(ps.iter().map(|p| p.stack).sum::<u32>(), start.iter().sum::<u32>());
        prop_assert_eq!(pot.total_size(), 0);
        prop_assert_eq!(pot.parts().len(), 1);
    }
}
