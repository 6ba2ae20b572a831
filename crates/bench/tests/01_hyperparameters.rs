use bench::Hyperparameters;
use ml::sampler::SamplerKind;

#[test]
fn json_file_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parameters.json");
    let params = Hyperparameters {
        n_itr: 7,
        hidden_sizes: vec![32],
        sampler: SamplerKind::Local,
        ..Hyperparameters::default()
    };
    params.write_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"cell_type\": \"gru\""));
    assert_eq!(Hyperparameters::load_json(&path).unwrap(), params);
}

#[test]
fn load_rejects_invalid_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"discount": 1.5}"#).unwrap();
    assert!(Hyperparameters::load_json(&path).is_err());
    assert!(Hyperparameters::load_json(dir.path().join("missing.json")).is_err());
}

#[test]
fn load_rejects_unavailable_cell_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lstm.json");
    std::fs::write(&path, r#"{"cell_type": "lstm"}"#).unwrap();
    let err = format!("{:#}", Hyperparameters::load_json(&path).unwrap_err());
    assert!(err.contains("cell_type"), "{err}");
}
