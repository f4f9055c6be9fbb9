//! End-to-end tests over the sample OEM files in `tests/data`

use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use oemfield::batch::list_oem_file_names;
use oemfield::oem::RowLayout;
use oemfield::{
    aggregate, Aggregator, BatchConfig, SkipPolicy, TelemetryBatch, TelemetryError,
    TelemetryRecord,
};
use tempfile::tempdir;

fn data_file(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Copy the named sample files into `dir`
fn stage(dir: &Path, names: &[&str]) {
    for name in names {
        fs::copy(data_file(name), dir.join(name)).unwrap();
    }
}

#[test]
fn test_iss_sample() {
    let batch = aggregate([data_file("iss_sample.oem")]).unwrap();
    assert_eq!(batch.len(), 5);

    let first = &batch.records()[0];
    assert_eq!(first.epoch, "2021-01-01T12:00:00.000000Z");
    assert_relative_eq!(first.position[0], -2745.128, epsilon = 1e-9);
    assert_relative_eq!(first.position[1], 4956.125, epsilon = 1e-9);
    assert_relative_eq!(first.position[2], 3406.547, epsilon = 1e-9);

    let epochs: Vec<&str> = batch.records().iter().map(|r| r.epoch.as_str()).collect();
    assert_eq!(
        epochs,
        vec![
            "2021-01-01T12:00:00.000000Z",
            "2021-01-01T12:04:00.000000Z",
            "2021-01-01T12:08:00.000000Z",
            "2021-01-01T12:12:00.000000Z",
            "2021-01-01T12:16:00.000000Z",
        ]
    );

    // Low Earth orbit radius in km
    for record in batch.records() {
        assert!(record.radius() > 6500.0 && record.radius() < 7100.0);
    }
}

#[test]
fn test_messy_export_lenient() {
    let batch = aggregate([data_file("messy_export.oem")]).unwrap();
    assert_eq!(
        batch.into_records(),
        vec![
            TelemetryRecord::new("2022-06-15T00:00:00.500000Z", [7000.0, 0.0, 0.0]),
            TelemetryRecord::new("2022-06-15T00:01:00.500000Z", [6999.1, 120.4, -3.3]),
            TelemetryRecord::new("2022-13-15T00:03:00.000000", [6991.9, 361.1, -9.9]),
        ]
    );
}

#[test]
fn test_messy_export_with_velocity_columns() {
    let config = BatchConfig::default().with_row_layout(RowLayout::PositionPrefix);
    let batch = Aggregator::new(config)
        .aggregate([data_file("messy_export.oem")])
        .unwrap();

    assert_eq!(batch.len(), 4);
    assert_eq!(batch.records()[3].position, [6985.6, 481.3, -13.2]);
}

#[test]
fn test_messy_export_strict() {
    let config = BatchConfig::default().with_skip_policy(SkipPolicy::Strict);
    let path = data_file("messy_export.oem");

    match Aggregator::new(config).aggregate([&path]) {
        Err(TelemetryError::MalformedLine {
            path: Some(failed),
            line_number,
            content,
        }) => {
            assert_eq!(failed, path);
            assert_eq!(line_number, 7);
            assert_eq!(content, "this line is not a state vector");
        }
        other => panic!("Expected MalformedLine, got {:?}", other),
    }
}

#[test]
fn test_file_without_marker_contributes_nothing() {
    let batch = aggregate([data_file("no_section.oem")]).unwrap();
    assert!(batch.is_empty());
}

#[test]
fn test_counts_add_up_across_files() {
    let iss = aggregate([data_file("iss_sample.oem")]).unwrap();
    let messy = aggregate([data_file("messy_export.oem")]).unwrap();

    let both = aggregate([
        data_file("iss_sample.oem"),
        data_file("no_section.oem"),
        data_file("messy_export.oem"),
    ])
    .unwrap();

    assert_eq!(both.len(), iss.len() + messy.len());
    assert_eq!(&both.records()[..iss.len()], iss.records());
    assert_eq!(&both.records()[iss.len()..], messy.records());
}

#[test]
fn test_run_is_byte_identical_across_runs() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("oem_files");
    fs::create_dir(&input).unwrap();
    stage(&input, &["messy_export.oem", "iss_sample.oem", "no_section.oem"]);
    fs::write(input.join("README.txt"), "not an ephemeris").unwrap();

    let first_out = temp_dir.path().join("first.json");
    let second_out = temp_dir.path().join("second.json");

    let summary = Aggregator::new(BatchConfig::new(&input, &first_out))
        .run()
        .unwrap();
    Aggregator::new(BatchConfig::new(&input, &second_out))
        .run()
        .unwrap();

    assert_eq!(summary.total_records, 8);
    assert_eq!(summary.files.len(), 3);
    assert_eq!(
        fs::read(&first_out).unwrap(),
        fs::read(&second_out).unwrap()
    );

    let text = fs::read_to_string(&first_out).unwrap();
    let written: TelemetryBatch = serde_json::from_str(&text).unwrap();
    assert_eq!(written.len(), 8);
    // Listing order is by file name: iss_sample, messy_export, no_section
    assert_eq!(written.records()[0].epoch, "2021-01-01T12:00:00.000000Z");
    assert_eq!(written.records()[5].epoch, "2022-06-15T00:00:00.500000Z");

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    for object in value.as_array().unwrap() {
        let object = object.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object["epoch"].is_string());
        assert_eq!(object["position"].as_array().unwrap().len(), 3);
    }
}

#[test]
fn test_listing_matches_endpoint_payload() {
    let temp_dir = tempdir().unwrap();
    stage(temp_dir.path(), &["iss_sample.oem", "no_section.oem"]);
    fs::write(temp_dir.path().join("notes.md"), "").unwrap();

    let names = list_oem_file_names(temp_dir.path(), ".oem").unwrap();
    assert_eq!(
        serde_json::to_string(&names).unwrap(),
        r#"["iss_sample.oem","no_section.oem"]"#
    );
}

#[test]
fn test_unreadable_file_aborts_without_output() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("oem_files");
    fs::create_dir(&input).unwrap();
    stage(&input, &["iss_sample.oem"]);
    // Invalid UTF-8 inside the data section fails the read
    fs::write(
        input.join("corrupt.oem"),
        b"META_STOP\n2021-01-01T00:00:00.000000 1 2 3\n\xff\xfe\n",
    )
    .unwrap();
    let output = temp_dir.path().join("out.json");

    match Aggregator::new(BatchConfig::new(&input, &output)).run() {
        Err(TelemetryError::FileError { path, .. }) => {
            assert_eq!(path, input.join("corrupt.oem"));
        }
        other => panic!("Expected FileError, got {:?}", other),
    }
    assert!(!output.exists());
}
