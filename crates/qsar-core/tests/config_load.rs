use qsar_core::settings::default_weights_path;
use qsar_core::{read_config, AblationSettings, CvFolds};
use std::path::PathBuf;

#[test]
fn loads_shipped_delaney_config() {
    env_logger::try_init().ok();

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/delaney.cfg");
    let config = read_config(&path).expect("read delaney config");
    let settings = AblationSettings::resolve(&config).expect("resolve delaney config");

    assert_eq!(settings.io.model_fpath, PathBuf::from("models/delaney/model"));
    assert_eq!(
        settings.io.weights_fpath,
        default_weights_path(&settings.io.model_fpath)
    );
    assert!(settings.io.use_existing_weights);

    assert_eq!(settings.architecture.embedding_size, 512);
    assert_eq!(settings.architecture.hidden, 50);
    assert_eq!(settings.architecture.depth, 5);
    assert!(!settings.architecture.sum_after);
    assert!(!settings.architecture.padding, "batch_size = 1 disables padding");

    assert_eq!(settings.batch_size(), 1);
    assert!(settings.data.molecular_attributes);
    assert_eq!(settings.data.shuffle_seed, 0);
    assert!((settings.data.training_ratio - 0.9).abs() < f64::EPSILON);
    assert_eq!(settings.data.cv_folds, CvFolds::SINGLE);
}

#[test]
fn missing_file_is_a_config_read_error() {
    let err = read_config("does/not/exist.cfg").unwrap_err();
    assert!(err.is_config_error());
}
