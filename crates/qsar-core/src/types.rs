//! Molecule tensors, dataset splits and evaluation records.

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Channels in the full atom/bond attribute vector (indices 0..=38).
pub const ATTRIBUTE_VECTOR_SIZE: usize = 39;

/// Dense atom-pair encoding indexed `(atom_i, atom_j, channel)`.
///
/// Diagonal entries (`i == j`) hold atom attributes; off-diagonal entries
/// hold bond attributes and are all-zero for non-bonded pairs.
pub type MoleculeTensor = Array3<f32>;

/// A featurized molecule with its regression target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub id: String,
    #[serde(default)]
    pub smiles: Option<String>,
    pub tensor: MoleculeTensor,
    pub target: Vec<f32>,
}

impl Molecule {
    pub fn new(id: impl Into<String>, tensor: MoleculeTensor, target: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            smiles: None,
            tensor,
            target,
        }
    }

    /// Length of the channel axis.
    pub fn num_channels(&self) -> usize {
        self.tensor.shape()[2]
    }
}

/// Which of the three splits a molecule list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    Train,
    Val,
    Test,
}

impl SplitKind {
    pub const ALL: [SplitKind; 3] = [SplitKind::Train, SplitKind::Val, SplitKind::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitKind::Train => "train",
            SplitKind::Val => "val",
            SplitKind::Test => "test",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One split of the dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSplit {
    pub molecules: Vec<Molecule>,
}

impl DataSplit {
    pub fn new(molecules: Vec<Molecule>) -> Self {
        Self { molecules }
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Molecule tensors in split order.
    pub fn mols(&self) -> impl Iterator<Item = &MoleculeTensor> {
        self.molecules.iter().map(|m| &m.tensor)
    }

    /// Mutable molecule tensors in split order.
    pub fn mols_mut(&mut self) -> impl Iterator<Item = &mut MoleculeTensor> {
        self.molecules.iter_mut().map(|m| &mut m.tensor)
    }
}

/// Train / validation / test splits, always all three.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub train: DataSplit,
    pub val: DataSplit,
    pub test: DataSplit,
}

impl Dataset {
    pub fn new(train: DataSplit, val: DataSplit, test: DataSplit) -> Self {
        Self { train, val, test }
    }

    /// Splits in train, val, test order.
    pub fn splits(&self) -> impl Iterator<Item = (SplitKind, &DataSplit)> {
        [
            (SplitKind::Train, &self.train),
            (SplitKind::Val, &self.val),
            (SplitKind::Test, &self.test),
        ]
        .into_iter()
    }

    /// Every tensor across the three splits.
    pub fn mols(&self) -> impl Iterator<Item = &MoleculeTensor> {
        self.train.mols().chain(self.val.mols()).chain(self.test.mols())
    }

    /// Every tensor across the three splits, mutably.
    pub fn mols_mut(&mut self) -> impl Iterator<Item = &mut MoleculeTensor> {
        self.train
            .mols_mut()
            .chain(self.val.mols_mut())
            .chain(self.test.mols_mut())
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Regression metrics over every output component of one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Molecules scored
    pub count: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination; `None` when targets have no variance
    pub r2: Option<f64>,
}

/// Result of evaluating one ablation condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub label: String,
    pub splits: BTreeMap<SplitKind, RegressionMetrics>,
}

impl EvaluationReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            splits: BTreeMap::new(),
        }
    }

    pub fn metrics(&self, kind: SplitKind) -> Option<&RegressionMetrics> {
        self.splits.get(&kind)
    }

    /// First scored split in train, val, test order.
    pub fn reference(&self) -> Option<(SplitKind, &RegressionMetrics)> {
        SplitKind::ALL
            .into_iter()
            .find_map(|kind| self.splits.get(&kind).map(|m| (kind, m)))
    }
}
