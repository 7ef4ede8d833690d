//! Loading options from TOML

use std::io::Write;

use srparse_engine::{EngineError, ParserOptions, TrainingMethod};
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
beam_size = 8
compound_unaries = false

[train]
training_method = "reorder_beam"
training_iterations = 12
batch_size = 4
training_threads = 2
feature_frequency_cutoff = 3
"#
    )
    .unwrap();

    let options = ParserOptions::from_toml_file(file.path()).unwrap();
    assert_eq!(options.beam_size, 8);
    assert!(!options.compound_unaries);
    assert_eq!(options.train.training_method, TrainingMethod::ReorderBeam);
    assert_eq!(options.train.training_iterations, 12);
    assert_eq!(options.train.batch_size, 4);
    assert_eq!(options.train.training_threads, Some(2));
    assert_eq!(options.train.feature_frequency_cutoff, 3);
    // Unset fields keep their defaults
    assert_eq!(options.train.averaged_models, 8);
    assert!(options.train.retrains());
}

#[test]
fn test_written_options_load_back() {
    let options = ParserOptions::builder()
        .beam_size(3)
        .training_method(TrainingMethod::Oracle)
        .oracle_repairs(true, false)
        .build()
        .unwrap();
    let text = options.to_toml_string().unwrap();
    assert!(text.contains("ORACLE"));
    assert_eq!(ParserOptions::from_toml_str(&text).unwrap(), options);
}

#[test]
fn test_invalid_values_are_rejected() {
    let result = ParserOptions::from_toml_str("beam_size = 0");
    assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));

    let result = ParserOptions::from_toml_str("[train]\ntraining_method = \"simulated_annealing\"");
    assert!(matches!(result, Err(EngineError::ConfigParse(_))));

    let result = ParserOptions::from_toml_str("beam_size = \"wide\"");
    assert!(matches!(result, Err(EngineError::ConfigParse(_))));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = ParserOptions::from_toml_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(EngineError::Io(_))));
}
