//! Trained-weight persistence.
//!
//! Weights are stored as JSON dense layers. The conventional location is
//! `<model_fpath>.h5`; the suffix is kept for compatibility with existing
//! settings files even though the payload is JSON. Real HDF5 files are
//! recognised by their signature and refused with a format error.

use crate::model::{GraphConvLayers, GraphConvModel};
use qsar_core::{Model, QsarError, Result, WeightLoader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Format tag written into every weights file.
pub const WEIGHTS_FORMAT: &str = "qsar-gnn-weights";

/// Current weights file version.
pub const WEIGHTS_VERSION: u32 = 1;

/// First eight bytes of every HDF5 file.
const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";

/// On-disk weights document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsFile {
    pub format: String,
    pub version: u32,
    /// Channels on the molecule tensor's last axis
    pub feature_width: usize,
    pub layers: GraphConvLayers,
    /// RFC 3339 time of export
    #[serde(default)]
    pub saved_at: Option<String>,
}

impl WeightsFile {
    /// Snapshot of a model's current parameters.
    pub fn from_model(model: &GraphConvModel) -> Self {
        Self {
            format: WEIGHTS_FORMAT.to_string(),
            version: WEIGHTS_VERSION,
            feature_width: model.feature_width(),
            layers: model.layers().clone(),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Reads and validates the container, not the layer shapes.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QsarError::WeightsNotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        if bytes.starts_with(HDF5_SIGNATURE) {
            return Err(QsarError::weights_format(format!(
                "{} is an HDF5 file; re-export the weights as JSON",
                path.display()
            )));
        }

        let file: WeightsFile = serde_json::from_slice(&bytes)
            .map_err(|e| QsarError::weights_format(format!("{}: {}", path.display(), e)))?;

        if file.format != WEIGHTS_FORMAT {
            return Err(QsarError::weights_format(format!(
                "{}: unknown format tag '{}'",
                path.display(),
                file.format
            )));
        }
        if file.version != WEIGHTS_VERSION {
            return Err(QsarError::weights_format(format!(
                "{}: unsupported version {} (expected {})",
                path.display(),
                file.version,
                WEIGHTS_VERSION
            )));
        }

        Ok(file)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// Restores weights from `path` into `model`.
///
/// ## Errors
/// - `WeightsNotFound` if `path` is not a file
/// - `WeightsFormat` for HDF5 or otherwise unreadable payloads
/// - `ShapeMismatch` if any layer disagrees with the built model
pub fn load_weights<P: AsRef<Path>>(model: &mut GraphConvModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = WeightsFile::load(path)?;

    if file.feature_width != model.feature_width() {
        return Err(QsarError::shape(format!(
            "weights were trained on {} channels, model expects {}",
            file.feature_width,
            model.feature_width()
        )));
    }
    model.set_layers(file.layers)?;

    log::info!("...loaded weight information");
    log::debug!(
        "Weights from {} ({} parameters, saved {})",
        path.display(),
        model.layers().parameter_count(),
        file.saved_at.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

/// Writes the model's parameters to `path`.
pub fn save_weights<P: AsRef<Path>>(model: &GraphConvModel, path: P) -> Result<()> {
    let path = path.as_ref();
    WeightsFile::from_model(model).save(path)?;
    log::info!("Saved weights to {}", path.display());
    Ok(())
}

/// [`WeightLoader`] over the JSON weights format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWeightLoader;

impl WeightLoader<GraphConvModel> for JsonWeightLoader {
    fn load_weights(&self, model: &mut GraphConvModel, path: &Path) -> Result<()> {
        load_weights(model, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsar_core::ArchitectureSettings;
    use tempfile::TempDir;

    fn architecture(depth: usize) -> ArchitectureSettings {
        ArchitectureSettings {
            embedding_size: 3,
            depth,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load_restores_parameters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");

        let trained = GraphConvModel::untrained(&architecture(1), 4, 11).unwrap();
        save_weights(&trained, &path).unwrap();

        let mut fresh = GraphConvModel::untrained(&architecture(1), 4, 99).unwrap();
        assert_ne!(fresh.layers(), trained.layers());
        JsonWeightLoader.load_weights(&mut fresh, &path).unwrap();
        assert_eq!(fresh.layers(), trained.layers());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let err = load_weights(&mut model, dir.path().join("absent.h5")).unwrap_err();
        assert!(matches!(err, QsarError::WeightsNotFound(_)));
    }

    #[test]
    fn test_hdf5_payload_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keras.h5");
        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        fs::write(&path, bytes).unwrap();

        let mut model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let err = load_weights(&mut model, &path).unwrap_err();
        assert!(matches!(err, QsarError::WeightsFormat(_)));
        assert!(err.to_string().contains("HDF5"));
    }

    #[test]
    fn test_garbage_payload_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");
        fs::write(&path, "not json").unwrap();

        let mut model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let err = load_weights(&mut model, &path).unwrap_err();
        assert!(matches!(err, QsarError::WeightsFormat(_)));
    }

    #[test]
    fn test_depth_mismatch_is_shape_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");
        save_weights(&GraphConvModel::untrained(&architecture(2), 4, 0).unwrap(), &path).unwrap();

        let mut model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let before = model.layers().clone();
        let err = load_weights(&mut model, &path).unwrap_err();
        assert!(matches!(err, QsarError::ShapeMismatch(_)));
        assert_eq!(model.layers(), &before);
    }

    #[test]
    fn test_feature_width_mismatch_is_shape_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");
        save_weights(&GraphConvModel::untrained(&architecture(1), 5, 0).unwrap(), &path).unwrap();

        let mut model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let err = load_weights(&mut model, &path).unwrap_err();
        assert!(matches!(err, QsarError::ShapeMismatch(_)));
    }

    #[test]
    fn test_wrong_format_tag_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.h5");
        let model = GraphConvModel::untrained(&architecture(1), 4, 0).unwrap();
        let mut file = WeightsFile::from_model(&model);
        file.format = "something-else".to_string();
        file.save(&path).unwrap();

        assert!(matches!(WeightsFile::load(&path), Err(QsarError::WeightsFormat(_))));
    }
}
