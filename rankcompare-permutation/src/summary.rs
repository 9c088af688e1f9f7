use rankcompare_core::PValueTail;

/// Mean and spread of a null distribution, with the observed distance expressed in those units.
/// This is the data behind a Gaussian fit of the null histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullSummary {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// `(observed - mean) / std_dev`, NaN when the null has no spread.
    pub z_score: f64,
}

/// Running tally of null distances, folded in round order.
#[derive(Debug, Clone, Default)]
pub(crate) struct NullTally {
    rounds: usize,
    at_or_below: usize,
    at_or_above: usize,
    mean: f64,
    // Sum of squared deviations from the running mean (Welford).
    squared_deviations: f64,
}

impl NullTally {
    pub(crate) fn add(&mut self, observed: f64, distance: f64) {
        self.rounds += 1;
        if distance <= observed {
            self.at_or_below += 1;
        }
        if distance >= observed {
            self.at_or_above += 1;
        }
        let delta = distance - self.mean;
        self.mean += delta / self.rounds as f64;
        self.squared_deviations += delta * (distance - self.mean);
    }

    pub(crate) fn extend(&mut self, observed: f64, distances: &[f64]) {
        for &distance in distances {
            self.add(observed, distance);
        }
    }

    pub(crate) fn rounds(&self) -> usize {
        self.rounds
    }

    pub(crate) fn pvalue(&self, tail: PValueTail) -> f64 {
        let count = match tail {
            PValueTail::Lower => self.at_or_below,
            PValueTail::Upper => self.at_or_above,
        };
        count as f64 / self.rounds as f64
    }

    pub(crate) fn summary(&self, observed: f64) -> NullSummary {
        let std_dev = (self.squared_deviations / self.rounds as f64).max(0.0).sqrt();
        let z_score = if std_dev > 0.0 {
            (observed - self.mean) / std_dev
        } else {
            f64::NAN
        };
        NullSummary {
            mean: self.mean,
            std_dev,
            z_score,
        }
    }
}
