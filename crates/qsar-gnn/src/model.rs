//! Neural-fingerprint graph convolution (inference only).
//!
//! Each convolution step mixes an atom's state with the bond vectors of its
//! row, projects every atom into fingerprint space through a softmax, and
//! accumulates the result. The fingerprint then feeds an optional `tanh`
//! hidden layer and a linear output layer.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use qsar_core::{ArchitectureSettings, Model, ModelBuilder, MoleculeTensor, QsarError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Standard deviation for inner and hidden weight initialisation.
const INNER_INIT_STD: f32 = 0.01;

/// Fully connected layer `y = W x + b`, `W` stored as `(outputs, inputs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Dense {
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weight: Array2::zeros((outputs, inputs)),
            bias: Array1::zeros(outputs),
        }
    }

    /// Gaussian weights with zero bias.
    fn normal(inputs: usize, outputs: usize, std: f32, rng: &mut StdRng) -> Result<Self> {
        let dist = Normal::new(0.0f32, std).map_err(|e| {
            QsarError::config_value(
                "ARCHITECTURE",
                "scale_output",
                std.to_string(),
                format!("a finite, non-negative scale ({})", e),
            )
        })?;
        Ok(Self {
            weight: Array2::from_shape_simple_fn((outputs, inputs), || dist.sample(&mut *rng)),
            bias: Array1::zeros(outputs),
        })
    }

    pub fn inputs(&self) -> usize {
        self.weight.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, x: ArrayView1<f32>) -> Array1<f32> {
        self.weight.dot(&x) + &self.bias
    }

    /// Applies the layer to every row of `x`.
    pub fn forward_rows(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight.t()) + &self.bias
    }

    fn check_same_shape(&self, other: &Dense, name: &str) -> Result<()> {
        if self.weight.dim() != other.weight.dim() || self.bias.len() != other.bias.len() {
            return Err(QsarError::shape(format!(
                "layer {}: model expects weight {:?} / bias {}, got {:?} / {}",
                name,
                self.weight.dim(),
                self.bias.len(),
                other.weight.dim(),
                other.bias.len()
            )));
        }
        Ok(())
    }
}

/// Every trainable layer of a [`GraphConvModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConvLayers {
    /// Atom state updates, `F → F`, one per step below `depth`
    pub inner: Vec<Dense>,
    /// Fingerprint projections, `F → embedding_size`, one per step `0..=depth`
    pub output: Vec<Dense>,
    pub hidden: Option<Dense>,
    pub last: Dense,
}

impl GraphConvLayers {
    /// Fails with `ShapeMismatch` unless `other` has exactly our layer shapes.
    pub fn check_compatible(&self, other: &GraphConvLayers) -> Result<()> {
        if self.inner.len() != other.inner.len() || self.output.len() != other.output.len() {
            return Err(QsarError::shape(format!(
                "model has depth {}, weights have {} inner / {} output layers",
                self.inner.len(),
                other.inner.len(),
                other.output.len()
            )));
        }
        for (d, (a, b)) in self.inner.iter().zip(&other.inner).enumerate() {
            a.check_same_shape(b, &format!("inner[{}]", d))?;
        }
        for (d, (a, b)) in self.output.iter().zip(&other.output).enumerate() {
            a.check_same_shape(b, &format!("output[{}]", d))?;
        }
        match (&self.hidden, &other.hidden) {
            (Some(a), Some(b)) => a.check_same_shape(b, "hidden")?,
            (None, None) => {}
            (expected, _) => {
                return Err(QsarError::shape(format!(
                    "model {} a hidden layer but the weights {}",
                    if expected.is_some() { "has" } else { "has no" },
                    if expected.is_some() { "do not" } else { "do" }
                )))
            }
        }
        self.last.check_same_shape(&other.last, "last")
    }

    pub fn parameter_count(&self) -> usize {
        self.inner
            .iter()
            .chain(&self.output)
            .chain(self.hidden.as_ref())
            .chain(std::iter::once(&self.last))
            .map(|l| l.weight.len() + l.bias.len())
            .sum()
    }
}

/// Graph-convolution regression model over `(atom, atom, channel)` tensors.
#[derive(Debug, Clone)]
pub struct GraphConvModel {
    architecture: ArchitectureSettings,
    feature_width: usize,
    layers: GraphConvLayers,
}

impl GraphConvModel {
    /// Builds a randomly initialised model.
    ///
    /// Inner and hidden weights are drawn from `N(0, 0.01)`, output
    /// projections from `N(0, scale_output)`; biases start at zero.
    pub fn untrained(architecture: &ArchitectureSettings, feature_width: usize, seed: u64) -> Result<Self> {
        Self::untrained_with_cancel(architecture, feature_width, seed, None)
    }

    fn untrained_with_cancel(
        architecture: &ArchitectureSettings,
        feature_width: usize,
        seed: u64,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self> {
        if feature_width == 0 {
            return Err(QsarError::shape("model feature width must be positive"));
        }
        for (key, value) in [
            ("embedding_size", architecture.embedding_size),
            ("output_size", architecture.output_size),
        ] {
            if value == 0 {
                return Err(QsarError::config_value(
                    "ARCHITECTURE",
                    key,
                    "0",
                    "a positive integer",
                ));
            }
        }

        let cancelled = || cancel.map_or(false, |flag| flag.load(Ordering::Relaxed));
        let mut rng = StdRng::seed_from_u64(seed);
        let embedding = architecture.embedding_size;

        let mut inner = Vec::with_capacity(architecture.depth);
        let mut output = Vec::with_capacity(architecture.depth + 1);
        for d in 0..=architecture.depth {
            if cancelled() {
                return Err(QsarError::UserCancelled);
            }
            output.push(Dense::normal(feature_width, embedding, architecture.scale_output, &mut rng)?);
            if d < architecture.depth {
                inner.push(Dense::normal(feature_width, feature_width, INNER_INIT_STD, &mut rng)?);
            }
        }

        let (hidden, last_inputs) = if architecture.hidden > 0 {
            let layer = Dense::normal(embedding, architecture.hidden, INNER_INIT_STD, &mut rng)?;
            (Some(layer), architecture.hidden)
        } else {
            (None, embedding)
        };
        if cancelled() {
            return Err(QsarError::UserCancelled);
        }
        let last = Dense::normal(last_inputs, architecture.output_size, architecture.scale_output, &mut rng)?;

        let layers = GraphConvLayers {
            inner,
            output,
            hidden,
            last,
        };
        log::debug!(
            "Graph conv model: depth {}, width {}, embedding {}, {} parameters",
            architecture.depth,
            feature_width,
            embedding,
            layers.parameter_count()
        );

        Ok(Self {
            architecture: architecture.clone(),
            feature_width,
            layers,
        })
    }

    pub fn architecture(&self) -> &ArchitectureSettings {
        &self.architecture
    }

    pub fn layers(&self) -> &GraphConvLayers {
        &self.layers
    }

    /// Replaces every layer; shapes must match the built architecture.
    pub fn set_layers(&mut self, layers: GraphConvLayers) -> Result<()> {
        self.layers.check_compatible(&layers)?;
        self.layers = layers;
        Ok(())
    }

    /// Molecular fingerprint, length `embedding_size`.
    pub fn fingerprint(&self, tensor: &MoleculeTensor) -> Result<Array1<f32>> {
        let (atoms, cols, width) = tensor.dim();
        if atoms != cols {
            return Err(QsarError::shape(format!(
                "molecule tensor must be square in its atom axes, got {}x{}",
                atoms, cols
            )));
        }
        if width != self.feature_width {
            return Err(QsarError::shape(format!(
                "molecule tensor has {} channels, model expects {}",
                width, self.feature_width
            )));
        }

        let diagonal = Array2::from_shape_fn((atoms, width), |(i, c)| tensor[[i, i, c]]);
        let bonds = tensor.sum_axis(Axis(1)) - &diagonal;
        let present: Vec<usize> = (0..atoms)
            .filter(|&i| !self.architecture.padding || diagonal.row(i).iter().any(|&v| v != 0.0))
            .collect();

        let depth = self.architecture.depth;
        let mut fingerprint = Array1::<f32>::zeros(self.architecture.embedding_size);
        let mut state = diagonal;

        for d in 0..=depth {
            let summed = &state + &bonds;
            let projection = &self.layers.output[d];

            if self.architecture.sum_after {
                let mut pooled = Array1::<f32>::zeros(projection.outputs());
                for &i in &present {
                    pooled += &projection.weight.dot(&summed.row(i));
                }
                pooled += &projection.bias;
                fingerprint += &softmax(pooled.view());
            } else {
                let logits = projection.forward_rows(&summed);
                for &i in &present {
                    fingerprint += &softmax(logits.row(i));
                }
            }

            if d < depth {
                state = self.layers.inner[d].forward_rows(&summed).mapv(f32::tanh);
            }
        }

        Ok(fingerprint)
    }
}

impl Model for GraphConvModel {
    fn predict(&self, tensor: &MoleculeTensor) -> Result<Array1<f32>> {
        let mut z = self.fingerprint(tensor)?;
        if let Some(hidden) = &self.layers.hidden {
            z = hidden.forward(z.view()).mapv(f32::tanh);
        }
        Ok(self.layers.last.forward(z.view()))
    }

    fn output_size(&self) -> usize {
        self.architecture.output_size
    }

    fn feature_width(&self) -> usize {
        self.feature_width
    }
}

/// Numerically stable softmax.
fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

/// Builds [`GraphConvModel`]s for a fixed feature width.
#[derive(Debug, Clone, Default)]
pub struct GraphConvBuilder {
    feature_width: usize,
    seed: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl GraphConvBuilder {
    pub fn new(feature_width: usize) -> Self {
        Self {
            feature_width,
            seed: 0,
            cancel: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Construction stops with `UserCancelled` once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl ModelBuilder for GraphConvBuilder {
    type Model = GraphConvModel;

    fn build(&self, architecture: &ArchitectureSettings) -> Result<GraphConvModel> {
        log::info!("...building model");
        let model = GraphConvModel::untrained_with_cancel(
            architecture,
            self.feature_width,
            self.seed,
            self.cancel.as_deref(),
        )?;
        log::info!("...built untrained model");
        Ok(model)
    }
}
