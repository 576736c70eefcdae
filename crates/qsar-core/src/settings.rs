//! Typed settings resolved from a [`ConfigFile`].
//!
//! All values arrive as strings; this module converts them, applies
//! defaults, and reports missing required keys. Required:
//! `IO.model_fpath`, `IO.use_existing_weights`, `DATA.molecular_attributes`.

use crate::cfg::ConfigFile;
use crate::errors::{QsarError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SECTION_IO: &str = "IO";
pub const SECTION_ARCHITECTURE: &str = "ARCHITECTURE";
pub const SECTION_TRAINING: &str = "TRAINING";
pub const SECTION_DATA: &str = "DATA";

/// Architecture keys consumed by the model builder.
const ARCHITECTURE_KEYS: &[&str] = &[
    "embedding_size",
    "hidden",
    "depth",
    "scale_output",
    "dr1",
    "dr2",
    "output_size",
    "sum_after",
    "padding",
];

/// Architecture keys that only matter while training; accepted and ignored.
const TRAINING_ONLY_KEYS: &[&str] = &[
    "lr",
    "optimizer",
    "loss",
    "hidden_activation",
    "output_activation",
];

/// Accepts the usual spellings of true/false, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[IO]`: where the model lives and whether to reuse its weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoSettings {
    /// Output/label stem; also the default weights location (`<stem>.h5`)
    pub model_fpath: PathBuf,
    pub use_existing_weights: bool,
    pub weights_fpath: PathBuf,
}

/// `[ARCHITECTURE]`: graph-convolution hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSettings {
    /// Fingerprint length
    pub embedding_size: usize,
    /// Hidden dense width; 0 disables the hidden layer
    pub hidden: usize,
    /// Number of graph convolution steps
    pub depth: usize,
    /// Initial scale of the output layer weights
    pub scale_output: f32,
    /// Dropout before the hidden layer (inactive at inference)
    pub dr1: f32,
    /// Dropout before the output layer (inactive at inference)
    pub dr2: f32,
    pub output_size: usize,
    /// Sum atom contributions before the fingerprint softmax
    pub sum_after: bool,
    /// Treat all-zero diagonal rows as padding atoms
    pub padding: bool,
}

impl Default for ArchitectureSettings {
    fn default() -> Self {
        Self {
            embedding_size: 512,
            hidden: 0,
            depth: 2,
            scale_output: 0.05,
            dr1: 0.0,
            dr2: 0.0,
            output_size: 1,
            sum_after: false,
            padding: true,
        }
    }
}

/// `[TRAINING]`: only the batch size is used for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub batch_size: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

/// Cross-validation fold selector written as `k/n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvFolds {
    /// 1-based fold index used for validation
    pub fold: usize,
    pub folds: usize,
}

impl CvFolds {
    /// Single fold: no validation split.
    pub const SINGLE: CvFolds = CvFolds { fold: 1, folds: 1 };
}

impl Default for CvFolds {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl FromStr for CvFolds {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (fold, folds) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("expected 'k/n', got '{}'", s))?;
        let fold: usize = fold.trim().parse().map_err(|_| format!("bad fold index '{}'", fold))?;
        let folds: usize = folds.trim().parse().map_err(|_| format!("bad fold count '{}'", folds))?;
        if folds == 0 || fold == 0 || fold > folds {
            return Err(format!("fold {}/{} out of range", fold, folds));
        }
        Ok(Self { fold, folds })
    }
}

impl fmt::Display for CvFolds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fold, self.folds)
    }
}

/// `[DATA]`: dataset location, featurization flag and split options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    pub data_fpath: Option<PathBuf>,
    pub molecular_attributes: bool,
    pub shuffle_seed: u64,
    pub truncate_to: Option<usize>,
    /// Fraction of molecules placed in the training pool
    pub training_ratio: f64,
    pub cv_folds: CvFolds,
}

impl DataSettings {
    /// Same options with every molecule routed into the training split.
    pub fn full_dataset(&self) -> Self {
        Self {
            training_ratio: 1.0,
            cv_folds: CvFolds::SINGLE,
            ..self.clone()
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationSettings {
    pub io: IoSettings,
    pub architecture: ArchitectureSettings,
    pub training: TrainingSettings,
    pub data: DataSettings,
}

impl AblationSettings {
    /// Resolves all sections. `IO.model_fpath` is checked first so a missing
    /// stem fails before anything else is interpreted.
    pub fn resolve(config: &ConfigFile) -> Result<Self> {
        let model_fpath = PathBuf::from(required(config, SECTION_IO, "model_fpath")?);
        let training = resolve_training(config)?;
        let architecture = resolve_architecture(config, &training)?;
        let io = resolve_io(config, model_fpath)?;
        let data = resolve_data(config)?;

        Ok(Self {
            io,
            architecture,
            training: training.unwrap_or_default(),
            data,
        })
    }

    /// Output path stem used to name result files.
    pub fn fpath(&self) -> &Path {
        &self.io.model_fpath
    }

    /// Evaluation batch size (`TRAINING.batch_size`, default 1).
    pub fn batch_size(&self) -> usize {
        self.training.batch_size
    }
}

// =============================================================================
// Resolution helpers
// =============================================================================

fn required<'a>(config: &'a ConfigFile, section: &str, key: &str) -> Result<&'a str> {
    config
        .get(section, key)
        .ok_or_else(|| QsarError::config_key(section, key))
}

fn optional<T: FromStr>(config: &ConfigFile, section: &str, key: &str, expected: &str) -> Result<Option<T>> {
    match config.get(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| QsarError::config_value(section, key, raw, expected)),
    }
}

fn optional_bool(config: &ConfigFile, section: &str, key: &str) -> Result<Option<bool>> {
    match config.get(section, key) {
        None => Ok(None),
        Some(raw) => parse_bool(raw)
            .map(Some)
            .ok_or_else(|| QsarError::config_value(section, key, raw, "boolean")),
    }
}

fn resolve_training(config: &ConfigFile) -> Result<Option<TrainingSettings>> {
    let batch_size: Option<usize> = optional(config, SECTION_TRAINING, "batch_size", "positive integer")?;
    match batch_size {
        Some(0) => Err(QsarError::config_value(
            SECTION_TRAINING,
            "batch_size",
            "0",
            "positive integer",
        )),
        Some(batch_size) => Ok(Some(TrainingSettings { batch_size })),
        None => Ok(None),
    }
}

fn resolve_architecture(
    config: &ConfigFile,
    training: &Option<TrainingSettings>,
) -> Result<ArchitectureSettings> {
    let s = SECTION_ARCHITECTURE;
    let defaults = ArchitectureSettings::default();

    for key in config.keys(s) {
        if TRAINING_ONLY_KEYS.contains(&key) {
            log::debug!("Ignoring training-only architecture key '{}'", key);
        } else if !ARCHITECTURE_KEYS.contains(&key) {
            log::warn!("Unknown architecture key '{}' ignored", key);
        }
    }

    // Padding follows the batch size when one is configured
    let padding = match training {
        Some(t) => t.batch_size > 1,
        None => optional_bool(config, s, "padding")?.unwrap_or(defaults.padding),
    };

    let arch = ArchitectureSettings {
        embedding_size: optional(config, s, "embedding_size", "integer")?.unwrap_or(defaults.embedding_size),
        hidden: optional(config, s, "hidden", "integer")?.unwrap_or(defaults.hidden),
        depth: optional(config, s, "depth", "integer")?.unwrap_or(defaults.depth),
        scale_output: optional(config, s, "scale_output", "float")?.unwrap_or(defaults.scale_output),
        dr1: optional(config, s, "dr1", "float")?.unwrap_or(defaults.dr1),
        dr2: optional(config, s, "dr2", "float")?.unwrap_or(defaults.dr2),
        output_size: optional(config, s, "output_size", "integer")?.unwrap_or(defaults.output_size),
        sum_after: optional_bool(config, s, "sum_after")?.unwrap_or(defaults.sum_after),
        padding,
    };

    if arch.embedding_size == 0 {
        return Err(QsarError::config_value(s, "embedding_size", "0", "positive integer"));
    }
    if arch.output_size == 0 {
        return Err(QsarError::config_value(s, "output_size", "0", "positive integer"));
    }
    for (key, rate) in [("dr1", arch.dr1), ("dr2", arch.dr2)] {
        if !(0.0..1.0).contains(&rate) {
            return Err(QsarError::config_value(s, key, rate.to_string(), "rate in [0, 1)"));
        }
    }

    Ok(arch)
}

fn resolve_io(config: &ConfigFile, model_fpath: PathBuf) -> Result<IoSettings> {
    let raw = required(config, SECTION_IO, "use_existing_weights")?;
    let use_existing_weights = parse_bool(raw)
        .ok_or_else(|| QsarError::config_value(SECTION_IO, "use_existing_weights", raw, "boolean"))?;

    let weights_fpath = match config.get(SECTION_IO, "weights_fpath") {
        Some(path) => PathBuf::from(path),
        None => default_weights_path(&model_fpath),
    };

    Ok(IoSettings {
        model_fpath,
        use_existing_weights,
        weights_fpath,
    })
}

/// `<model_fpath>.h5`, appended rather than replacing any extension.
pub fn default_weights_path(model_fpath: &Path) -> PathBuf {
    append_suffix(model_fpath, ".h5")
}

/// Appends `suffix` to the final path component (`out/model` → `out/model.h5`).
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

fn resolve_data(config: &ConfigFile) -> Result<DataSettings> {
    let s = SECTION_DATA;

    let molecular_attributes = match config.get(s, "molecular_attributes") {
        Some(raw) => parse_bool(raw)
            .ok_or_else(|| QsarError::config_value(s, "molecular_attributes", raw, "boolean"))?,
        None => return Err(QsarError::config_key(s, "molecular_attributes")),
    };

    let shuffle_seed = match optional::<u64>(config, s, "shuffle_seed", "integer")? {
        Some(seed) => seed,
        None => {
            let seed = chrono::Utc::now().timestamp().max(0) as u64;
            log::info!("No shuffle_seed given; using current time {}", seed);
            seed
        }
    };

    let training_ratio: f64 = optional(config, s, "training_ratio", "float")?.unwrap_or(0.9);
    if !(0.0..=1.0).contains(&training_ratio) {
        return Err(QsarError::config_value(
            s,
            "training_ratio",
            training_ratio.to_string(),
            "fraction in [0, 1]",
        ));
    }

    let cv_folds = match config.get(s, "cv_folds") {
        Some(raw) => raw
            .parse::<CvFolds>()
            .map_err(|e| QsarError::config_value(s, "cv_folds", raw, format!("'k/n' ({})", e)))?,
        None => CvFolds::SINGLE,
    };

    Ok(DataSettings {
        data_fpath: config.get(s, "data_fpath").map(PathBuf::from),
        molecular_attributes,
        shuffle_seed,
        truncate_to: optional(config, s, "truncate_to", "integer")?,
        training_ratio,
        cv_folds,
    })
}
