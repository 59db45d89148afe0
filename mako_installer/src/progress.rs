/// Position inside a multi-substep phase: `index` counts completed
/// substeps, `total` is fixed when the phase is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCursor {
    pub index: usize,
    pub total: usize,
}

impl StepCursor {
    pub fn new(total: usize) -> Self {
        StepCursor { index: 0, total }
    }

    /// Fraction of the phase already done, in [0, 1]. A phase with no
    /// substeps reports zero until it completes.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.index as f64 / self.total as f64
        }
    }

    /// Record one finished substep; true once the phase is exhausted.
    pub fn advance(&mut self) -> bool {
        self.index += 1;
        self.index >= self.total
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.total
    }
}

/// Weighted progress over the whole run:
/// `100 * (completed_weight + current_weight * fraction) / total_weight`,
/// clamped below 100 until the terminal state so cleanup work never shows
/// a premature full bar, and monotonic across calls regardless of how the
/// per-phase fractions move.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    total_weight: u32,
    completed_weight: u32,
    last: f64,
}

const PRE_TERMINAL_CEILING: f64 = 99.9;

impl ProgressEstimator {
    pub fn new(total_weight: u32) -> Self {
        ProgressEstimator {
            total_weight: total_weight.max(1),
            completed_weight: 0,
            last: 0.0,
        }
    }

    pub fn phase_complete(&mut self, weight: u32) {
        self.completed_weight += weight;
    }

    pub fn report(&mut self, current_weight: u32, cursor: &StepCursor) -> f64 {
        let partial = f64::from(current_weight) * cursor.fraction();
        let raw = 100.0 * (f64::from(self.completed_weight) + partial) / f64::from(self.total_weight);
        let clamped = raw.min(PRE_TERMINAL_CEILING);
        if clamped > self.last {
            self.last = clamped;
        }
        self.last
    }

    pub fn finish(&mut self) -> f64 {
        self.last = 100.0;
        self.last
    }
}
