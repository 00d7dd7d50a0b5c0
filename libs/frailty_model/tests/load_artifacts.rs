use frailty_model::{
    load_forest, load_reference, Classifier, FeatureVector, Indicator, LoadError, RandomForest,
};
use std::fs;

const STUMP: &str = r#"{
  "model_name": "stump",
  "n_features": 15,
  "classes": [0, 1],
  "trees": [{
    "children_left": [1, -1, -1],
    "children_right": [2, -1, -1],
    "feature": [8, -2, -2],
    "threshold": [0.5, -2.0, -2.0],
    "value": [[0.6, 0.4], [0.8, 0.2], [0.25, 0.75]],
    "weighted_n_node_samples": [100.0, 60.0, 40.0]
  }]
}"#;

#[test]
fn load_model_from_json_file() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("RF.json");
    fs::write(&path, STUMP).expect("write");

    let model = load_forest(&path).expect("load");
    assert_eq!(model.name(), "stump");
    assert_eq!(model.n_trees(), 1);

    let positive = FeatureVector::all_zero().with(Indicator::Phq, true);
    let p = model.predict_proba(&positive.as_f64());
    assert!((p[1] - 0.75).abs() < 1e-12);
    assert_eq!(model.predict(&FeatureVector::all_zero().as_f64()), 0);
}

#[test]
fn reloading_the_same_artifact_gives_identical_outputs() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("RF.json");
    fs::write(&path, STUMP).expect("write");

    let first = RandomForest::load(&path).unwrap();
    let second = RandomForest::load(&path).unwrap();
    assert_eq!(first, second);
    for v in [FeatureVector::all_zero(), FeatureVector::all_one()] {
        assert_eq!(
            first.predict_proba(&v.as_f64()),
            second.predict_proba(&v.as_f64())
        );
    }
}

#[test]
fn missing_and_corrupt_artifacts_are_load_errors() {
    let tmp = tempfile::tempdir().expect("tmpdir");

    let missing = tmp.path().join("absent.json");
    assert!(matches!(load_forest(&missing), Err(LoadError::Io { .. })));

    let corrupt = tmp.path().join("corrupt.json");
    fs::write(&corrupt, "{ not json").unwrap();
    assert!(matches!(load_forest(&corrupt), Err(LoadError::Json { .. })));

    let wrong_width = tmp.path().join("wide.json");
    fs::write(&wrong_width, STUMP.replace("\"n_features\": 15", "\"n_features\": 16")).unwrap();
    let err = load_forest(&wrong_width).unwrap_err();
    assert!(err.to_string().contains("16 features"), "{err}");

    assert!(matches!(
        load_reference(tmp.path().join("X_test.csv")),
        Err(LoadError::Io { .. })
    ));
}

#[test]
fn reference_csv_round_trip() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("X_test.csv");
    let header: Vec<&str> = Indicator::ALL.iter().map(|i| i.key()).collect();
    let mut text = header.join(",");
    text.push('\n');
    text.push_str("0,1,0,1,0,1,0,1,0,1,0,1,0,1,0\n");
    text.push_str(&FeatureVector::all_one().to_string());
    text.push('\n');
    fs::write(&path, text).unwrap();

    let ds = load_reference(&path).unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.rows()[1], FeatureVector::all_one());
    assert_eq!(ds.rows()[0].get(Indicator::SleepDuration), 1);
}
