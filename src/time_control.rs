//! Thinking-time allotment.
//!
//! Three modes are supported: a fixed number of playouts per move, a fixed
//! time per move, and Canadian byo-yomi, where the remaining time of the
//! current period is split evenly over the stones still to be played in it.

use std::time::Duration;

use crate::constants::PLAYOUT_LIMIT;

/// Stones the main time is spread over.
const MAIN_TIME_STONES: u32 = 50;

/// Subtracted from every allotment to cover communication latency.
const OVERHEAD: Duration = Duration::from_millis(500);

/// Canadian byo-yomi clock of one player.
#[derive(Clone, Debug, PartialEq)]
pub struct Canadian {
    main: Duration,
    byoyomi: Duration,
    byoyomi_stones: u32,
    total_elapsed: Duration,
    time_left: Duration,
    stones_left: u32,
}

impl Canadian {
    /// `main` time followed by periods of `byoyomi` for `stones` stones.
    pub fn new(main: Duration, byoyomi: Duration, stones: u32) -> Canadian {
        let stones = stones.max(1);
        let (time_left, stones_left) = if main.is_zero() {
            (byoyomi, stones)
        } else {
            (main, MAIN_TIME_STONES)
        };
        Canadian {
            main,
            byoyomi,
            byoyomi_stones: stones,
            total_elapsed: Duration::ZERO,
            time_left,
            stones_left,
        }
    }

    pub fn time_left(&self) -> Duration {
        self.time_left
    }

    pub fn stones_left(&self) -> u32 {
        self.stones_left
    }

    /// Time to think about the next move, whole seconds, at least one.
    pub fn allot(&self) -> Duration {
        let per_stone = self.time_left.as_secs_f64() / f64::from(self.stones_left.max(1));
        let secs = (per_stone - OVERHEAD.as_secs_f64()).ceil().max(1.0);
        Duration::from_secs(secs as u64)
    }

    /// Charge a move that took `elapsed`.
    pub fn record(&mut self, elapsed: Duration) {
        self.total_elapsed += elapsed;
        self.stones_left = self.stones_left.saturating_sub(1);

        if elapsed < self.time_left {
            self.time_left -= elapsed;
            if self.stones_left == 0 {
                if self.total_elapsed < self.main {
                    self.stones_left = 1;
                } else {
                    self.enter_byoyomi();
                }
            }
        } else {
            // Out of time: start a fresh period rather than flag
            self.enter_byoyomi();
        }
    }

    /// Synchronise with the time reported by the server.
    pub fn set_time_left(&mut self, time_left: Duration, stones: u32) {
        self.byoyomi = time_left;
        self.time_left = time_left;
        if stones > 0 {
            self.byoyomi_stones = stones;
            self.stones_left = stones;
        }
    }

    fn enter_byoyomi(&mut self) {
        self.time_left = self.byoyomi;
        self.stones_left = self.byoyomi_stones;
    }
}

/// How much search one move gets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Budget {
    pub playouts: usize,
    pub time: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimeControl {
    /// Fixed number of playouts per move
    ConstPlayout(usize),
    /// Fixed thinking time per move
    ConstTime(Duration),
    Canadian(Canadian),
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::ConstPlayout(PLAYOUT_LIMIT)
    }
}

impl TimeControl {
    /// Budget of the next move. `playout_limit` caps the timed modes.
    pub fn budget(&self, playout_limit: usize) -> Budget {
        match self {
            TimeControl::ConstPlayout(n) => Budget {
                playouts: *n,
                time: None,
            },
            TimeControl::ConstTime(t) => Budget {
                playouts: playout_limit,
                time: Some(*t),
            },
            TimeControl::Canadian(clock) => Budget {
                playouts: playout_limit,
                time: Some(clock.allot()),
            },
        }
    }

    /// Charge the time spent on a move.
    pub fn record(&mut self, elapsed: Duration) {
        if let TimeControl::Canadian(clock) = self {
            clock.record(elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_main_time_split_over_fifty_stones() {
        let mut clock = Canadian::new(secs(2000), secs(180), 6);
        assert_eq!(clock.allot(), secs(40));
        clock.record(secs(10));
        assert_eq!(clock.time_left(), secs(1990));
        assert_eq!(clock.stones_left(), 49);
    }

    #[test]
    fn test_byoyomi_only() {
        let mut clock = Canadian::new(Duration::ZERO, secs(180), 6);
        assert_eq!(clock.allot(), secs(30));
        for _ in 0..6 {
            clock.record(secs(10));
        }
        // Period completed: a fresh one starts
        assert_eq!(clock.time_left(), secs(180));
        assert_eq!(clock.stones_left(), 6);
    }

    #[test]
    fn test_timeout_restarts_period() {
        let mut clock = Canadian::new(Duration::ZERO, secs(180), 6);
        clock.record(secs(200));
        assert_eq!(clock.time_left(), secs(180));
        assert_eq!(clock.stones_left(), 6);
    }

    #[test]
    fn test_allotment_is_at_least_one_second() {
        let mut clock = Canadian::new(Duration::ZERO, secs(1), 25);
        clock.set_time_left(Duration::from_millis(300), 3);
        assert_eq!(clock.allot(), secs(1));
        assert_eq!(clock.stones_left(), 3);
    }

    #[test]
    fn test_budgets() {
        assert_eq!(
            TimeControl::ConstPlayout(100).budget(5000),
            Budget {
                playouts: 100,
                time: None
            }
        );
        assert_eq!(
            TimeControl::ConstTime(secs(3)).budget(5000),
            Budget {
                playouts: 5000,
                time: Some(secs(3))
            }
        );
        let canadian = TimeControl::Canadian(Canadian::new(secs(2000), secs(180), 6));
        assert_eq!(canadian.budget(5000).time, Some(secs(40)));
    }
}
