//! The fixed list of feature-channel groups to ablate.
//!
//! Channels 0..=31 are atom attributes (diagonal cells), 32..=38 bond
//! attributes (off-diagonal cells).

use std::fmt;

/// A named subset of feature channels; empty means baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCondition {
    pub name: &'static str,
    pub channels: &'static [usize],
}

impl FeatureCondition {
    pub const BASELINE: FeatureCondition = FeatureCondition::new("baseline", &[]);

    pub const fn new(name: &'static str, channels: &'static [usize]) -> Self {
        Self { name, channels }
    }

    pub fn is_baseline(&self) -> bool {
        self.channels.is_empty()
    }

    /// `baseline`, or `reset [c0 c1 ...]`.
    pub fn label(&self) -> String {
        condition_label(self.channels)
    }
}

impl fmt::Display for FeatureCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.name)
    }
}

/// Label used to tag evaluation results for a channel subset.
///
/// Indices are right-aligned to the widest one, as numpy prints an integer
/// array: `reset [ 0  1 ... 10]`.
pub fn condition_label(channels: &[usize]) -> String {
    if channels.is_empty() {
        return "baseline".to_string();
    }
    let width = channels.iter().map(|c| c.to_string().len()).max().unwrap_or(1);
    let list: Vec<String> = channels.iter().map(|c| format!("{:>width$}", c, width = width)).collect();
    format!("reset [{}]", list.join(" "))
}

/// Every condition, evaluated in this order.
pub const CONDITIONS: [FeatureCondition; 18] = [
    FeatureCondition::BASELINE,
    FeatureCondition::new("atom identity", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
    FeatureCondition::new("heavy neighbours", &[11, 12, 13, 14, 15, 16]),
    FeatureCondition::new("hydrogens", &[17, 18, 19, 20, 21]),
    FeatureCondition::new("formal charge", &[22]),
    FeatureCondition::new("in ring", &[23]),
    FeatureCondition::new("aromatic", &[24]),
    FeatureCondition::new("crippen logp", &[25]),
    FeatureCondition::new("crippen mr", &[26]),
    FeatureCondition::new("tpsa", &[27]),
    FeatureCondition::new("labute asa", &[28]),
    FeatureCondition::new("estate index", &[29]),
    FeatureCondition::new("gasteiger charge", &[30]),
    FeatureCondition::new("gasteiger h charge", &[31]),
    FeatureCondition::new("bond order", &[32, 33, 34, 35]),
    FeatureCondition::new("bond aromatic", &[36]),
    FeatureCondition::new("bond conjugated", &[37]),
    FeatureCondition::new("bond in ring", &[38]),
];
