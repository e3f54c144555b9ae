//! Lazy-decay bookkeeping.
//!
//! Rather than multiplying every table row by `1 - eta` each minibatch,
//! the learner appends `log(1 - eta)` to a running prefix sum and defers
//! the multiplication until a row is next touched. A row whose `t_last`
//! slot says it was last synchronised at counter `t` is brought current by
//! multiplying with `exp(levels[now] - levels[t])`, which telescopes to
//! the product of every step factor it missed.

/// Append-only log-prefix-sum of minibatch decay factors.
///
/// Entry `i` holds the cumulative `sum log(1 - eta_s)` over the first `i`
/// minibatches; the sequence is non-increasing. Entries are addressed by
/// the real example counter, offset by the counter's starting value.
#[derive(Debug, Clone)]
pub(crate) struct DecayLevels {
    levels: Vec<f32>,
    base_t: f64,
}

impl DecayLevels {
    pub(crate) fn new(initial_t: f64) -> Self {
        Self {
            levels: vec![0.0],
            base_t: initial_t,
        }
    }

    /// Record one minibatch's `log(1 - eta)`.
    pub(crate) fn push(&mut self, log_minuseta: f32) {
        let last = *self.levels.last().unwrap_or(&0.0);
        self.levels.push(last + log_minuseta);
    }

    /// Cumulative level after the most recent minibatch.
    pub(crate) fn last(&self) -> f32 {
        *self.levels.last().unwrap_or(&0.0)
    }

    /// Cumulative level before the most recent minibatch.
    ///
    /// During a minibatch's first pass, rows are brought current up to the
    /// previous step; the current step's shrink is applied explicitly in
    /// the second pass.
    pub(crate) fn previous(&self) -> f32 {
        let n = self.levels.len();
        debug_assert!(n >= 2, "previous() before any minibatch was recorded");
        self.levels[n - 2]
    }

    /// Level at the example counter `t` (a `t_last` slot read from a row).
    ///
    /// The sequence is append-only and indexed by `t - initial_t`; a
    /// counter outside the recorded range is a corrupted row or a
    /// bookkeeping bug, never a recoverable condition.
    pub(crate) fn at_counter(&self, t: f32) -> f32 {
        let delta = f64::from(t) - self.base_t;
        let idx = delta as i64;
        assert!(
            delta >= 0.0 && delta.fract() == 0.0 && (idx as usize) < self.levels.len(),
            "decay level lookup out of range: counter {t}, base {}, {} levels recorded",
            self.base_t,
            self.levels.len()
        );
        self.levels[idx as usize]
    }

    /// Multiplier that brings a row last synchronised at `t` up to the
    /// level `to`, capped at 1.
    pub(crate) fn factor(&self, to: f32, t: f32) -> f32 {
        (to - self.at_counter(t)).exp().min(1.0)
    }

    /// Number of recorded levels (initial entry included).
    pub(crate) fn len(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.levels
    }
}
