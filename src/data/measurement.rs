//! Measured bed heights for one tramming run.

/// Measured Z heights, one slot per probe point.
///
/// Slots start at zero and are filled in probe order. Index 0 holds the
/// reference height.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementSet {
    heights: Vec<f64>,
    recorded: usize,
}

impl MeasurementSet {
    /// Create a zeroed set for `count` points.
    pub fn new(count: usize) -> Self {
        Self {
            heights: vec![0.0; count],
            recorded: 0,
        }
    }

    /// Build a complete set from known heights.
    pub fn from_heights(heights: Vec<f64>) -> Self {
        let recorded = heights.len();
        Self { heights, recorded }
    }

    /// Store the height measured at point `index`.
    ///
    /// Points must be recorded in order; recording out of order or past the
    /// end is ignored and returns `false`.
    pub fn record(&mut self, index: usize, height: f64) -> bool {
        if index != self.recorded || index >= self.heights.len() {
            return false;
        }
        self.heights[index] = height;
        self.recorded += 1;
        true
    }

    /// Number of points in the set.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Whether the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Number of points recorded so far.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Whether every point has been measured.
    pub fn is_complete(&self) -> bool {
        self.recorded == self.heights.len()
    }

    /// Get the height at `index`.
    pub fn height(&self, index: usize) -> Option<f64> {
        self.heights.get(index).copied()
    }

    /// Get the reference height (point 0).
    pub fn reference(&self) -> Option<f64> {
        self.height(0)
    }

    /// Get all heights.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Spread between the highest and lowest recorded heights.
    pub fn range(&self) -> f64 {
        // A deserialized set may claim more points than it holds.
        let recorded = self
            .heights
            .get(..self.recorded)
            .unwrap_or(self.heights.as_slice());
        let max = recorded.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = recorded.iter().copied().fold(f64::INFINITY, f64::min);
        if recorded.is_empty() {
            0.0
        } else {
            max - min
        }
    }
}
