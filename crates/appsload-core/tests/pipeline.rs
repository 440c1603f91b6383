//! End-to-end scenarios against the mock memcached client (see SPEC_FULL.md
//! section 8). These exercise the public crate API only.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use appsload_core::{process_file, DeviceRouting, DeviceType, MockMemcachedClient, PipelineConfig};

fn routing() -> DeviceRouting {
    DeviceRouting::new(
        "127.0.0.1:33013".to_string(),
        "127.0.0.1:33014".to_string(),
        "127.0.0.1:33015".to_string(),
        "127.0.0.1:33016".to_string(),
    )
    .unwrap()
}

fn gz_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

#[test]
fn processed_plus_errors_equals_dispatched_plus_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let path = gz_file(
        &dir,
        "mixed.tsv.gz",
        "idfa\tidfa1\t55.55\t42.42\t1,2\n\
         gaid\tgaid1\t55.55\t42.42\t1,2\n\
         only\tthree\tfields\n\
         xxxx\tunknown\t1.0\t2.0\t1,2\n",
    );

    let outcome = process_file(&path, &routing(), &PipelineConfig::default(), |_dt| {
        Ok(MockMemcachedClient::new())
    })
    .unwrap();

    // 2 valid records dispatched, 1 malformed, 1 unknown device type.
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.errors, 2);
}

#[test]
fn accept_requires_both_nonzero_processed_and_low_error_rate() {
    let dir = tempfile::tempdir().unwrap();

    // All four device types represented, one malformed line pushes err_rate
    // to exactly 0.2, which is not below the 0.01 threshold.
    let path = gz_file(
        &dir,
        "over_threshold.tsv.gz",
        "idfa\ta\t1.0\t2.0\t1\n\
         gaid\tb\t1.0\t2.0\t1\n\
         adid\tc\t1.0\t2.0\t1\n\
         dvid\td\t1.0\t2.0\t1\n\
         bad\n",
    );

    let outcome = process_file(&path, &routing(), &PipelineConfig::default(), |_dt| {
        Ok(MockMemcachedClient::new())
    })
    .unwrap();

    assert_eq!(outcome.processed, 4);
    assert_eq!(outcome.errors, 1);
    assert!(!outcome.accepted, "err_rate 0.25 must not be accepted");
}

#[test]
fn exhausted_retries_on_one_shard_do_not_sink_other_shards() {
    let dir = tempfile::tempdir().unwrap();
    let path = gz_file(
        &dir,
        "partial.tsv.gz",
        "idfa\ta\t1.0\t2.0\t1\n\
         gaid\tb\t1.0\t2.0\t1\n\
         adid\tc\t1.0\t2.0\t1\n",
    );

    let outcome = process_file(&path, &routing(), &PipelineConfig::default(), |dt| {
        Ok(if dt == DeviceType::Gaid {
            MockMemcachedClient::always_fail(vec!["gaid:b".to_string()])
        } else {
            MockMemcachedClient::new()
        })
    })
    .unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.errors, 1);
    assert!(!outcome.accepted);
}

#[test]
fn dry_run_logs_but_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let lines: String = (0..10).map(|i| format!("idfa\tdev{i}\t1.0\t2.0\t1,2\n")).collect();
    let path = gz_file(&dir, "dry.tsv.gz", &lines);

    let mut config = PipelineConfig::default();
    config.dry_run = true;

    let outcome = process_file(&path, &routing(), &config, |_dt| Ok(MockMemcachedClient::new())).unwrap();

    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.errors, 0);
    assert!(!outcome.accepted);
}
