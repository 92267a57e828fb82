use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::ProviderError;
use crate::table::Table;

/// Consecutive failures after which a player is blocked for the tournament.
pub const MAX_STRIKES: u32 = 3;

/// Source of betting decisions for one seat.
///
/// Receives the table as seen by the acting player and answers with the
/// amount it wants to have committed this street. Errors count as a bet of 0.
pub trait ActionProvider: Send + Sync {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError>;
}

impl<P: ActionProvider + ?Sized> ActionProvider for Arc<P> {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        (**self).request_bet(table)
    }
}

impl<P: ActionProvider + ?Sized> ActionProvider for Box<P> {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        (**self).request_bet(table)
    }
}

/// In-process decision source backed by a closure.
pub struct FnProvider<F>(pub F);

impl<F> ActionProvider for FnProvider<F>
where
    F: Fn(&Table) -> u32 + Send + Sync,
{
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        Ok((self.0)(table))
    }
}

/// Always answers with the same amount.
pub fn constant(amount: u32) -> FnProvider<impl Fn(&Table) -> u32 + Send + Sync> {
    FnProvider(move |_: &Table| amount)
}

#[derive(Debug, Default)]
struct StrikeState {
    strikes: u32,
    blocked_tournament: Option<u64>,
}

/// Counts consecutive failures of the wrapped provider. After
/// [`MAX_STRIKES`] the provider is not asked again for the rest of that
/// tournament.
pub struct StrikeGuard<P> {
    inner: P,
    state: Mutex<StrikeState>,
}

impl<P> StrikeGuard<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            state: Mutex::new(StrikeState::default()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn strikes(&self) -> u32 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).strikes
    }

    pub fn blocked_tournament(&self) -> Option<u64> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blocked_tournament
    }
}

impl<P: ActionProvider> ActionProvider for StrikeGuard<P> {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        let tournament = table.tournament_id;
        if self.blocked_tournament() == Some(tournament) {
            return Err(ProviderError::Blocked(tournament));
        }

        // the lock is not held while the inner provider waits for an answer
        let answer = self.inner.request_bet(table);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match answer {
            Ok(bet) => {
                state.strikes = 0;
                Ok(bet)
            }
            Err(reason) => {
                state.strikes += 1;
                let strike = state.strikes;
                if strike >= MAX_STRIKES {
                    state.blocked_tournament = Some(tournament);
                    state.strikes = 0;
                }
                Err(ProviderError::Struck {
                    strike,
                    reason: Box::new(reason),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
    }

    impl ActionProvider for Flaky {
        fn request_bet(&self, _: &Table) -> Result<u32, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ProviderError::Timeout(1000))
            } else {
                Ok(42)
            }
        }
    }

    fn table(tournament_id: u64) -> Table {
        Table::new(tournament_id, vec![], 5)
    }

    #[test]
    fn success_resets_strikes() {
        let guard = StrikeGuard::new(Flaky {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        assert!(guard.request_bet(&table(1)).is_err());
        assert!(guard.request_bet(&table(1)).is_err());
        assert_eq!(guard.strikes(), 2);
        assert_eq!(guard.request_bet(&table(1)), Ok(42));
        assert_eq!(guard.strikes(), 0);
    }

    #[test]
    fn third_strike_blocks_the_tournament_only() {
        let guard = StrikeGuard::new(Flaky {
            calls: AtomicU32::new(0),
            fail_first: 3,
        });
        for expected in 1..=3 {
            match guard.request_bet(&table(7)) {
                Err(ProviderError::Struck { strike, .. }) => assert_eq!(strike, expected),
                other => panic!("unexpected answer {other:?}"),
            }
        }
        assert_eq!(guard.blocked_tournament(), Some(7));
        assert_eq!(guard.request_bet(&table(7)), Err(ProviderError::Blocked(7)));
        assert_eq!(guard.inner().calls.load(Ordering::SeqCst), 3);

        assert_eq!(guard.request_bet(&table(8)), Ok(42));
    }

    #[test]
    fn closures_are_providers() {
        let provider = FnProvider(|t: &Table| t.minimum_bet() * 3);
        assert_eq!(provider.request_bet(&table(1)), Ok(30));
        assert_eq!(constant(0).request_bet(&table(1)), Ok(0));
    }
}
