use std::fs;

use ml::logger::{read_csv_columns, CsvOutput, Logger, StdOutput, TensorBoardOutput, TextOutput};

#[test]
fn every_output_receives_the_dump() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = Logger::new();
    logger.add_output(TextOutput::new(dir.path().join("debug.log")).unwrap());
    logger.add_output(CsvOutput::new(dir.path().join("progress.csv")).unwrap());
    logger.add_output(StdOutput::new());
    logger.add_output(TensorBoardOutput::new(dir.path()).unwrap());

    for itr in 0..3 {
        logger.log(&format!("iteration {itr}")).unwrap();
        logger.record("TotalEnvSteps", (itr * 100) as f64);
        logger.record("Evaluation/AverageReturn", itr as f64 * 0.5);
        logger.dump(itr).unwrap();
    }
    logger.remove_all().unwrap();

    let cols = read_csv_columns(dir.path().join("progress.csv"), &["TotalEnvSteps", "Evaluation/AverageReturn"]).unwrap();
    assert_eq!(cols["TotalEnvSteps"], vec![0.0, 100.0, 200.0]);
    assert_eq!(cols["Evaluation/AverageReturn"], vec![0.0, 0.5, 1.0]);

    let debug = fs::read_to_string(dir.path().join("debug.log")).unwrap();
    assert!(debug.contains("iteration 2"));
    assert!(debug.contains("TotalEnvSteps 200"));

    let events: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("events.out.tfevents."))
        .collect();
    assert_eq!(events.len(), 1);
    assert!(events[0].metadata().unwrap().len() > 0);
}
