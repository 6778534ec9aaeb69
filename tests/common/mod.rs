#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use allelic_bias::genomics::{InMemorySource, ReadObservation};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("ALLELIC_BIAS_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set ALLELIC_BIAS_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Read of five bases centred on `position`, showing `base` there.
pub fn read_showing(position: u64, base: u8) -> ReadObservation {
    let mut sequence = b"ACGTA".to_vec();
    sequence[2] = base;
    ReadObservation::new(position - 2, sequence, vec![30; 5], Some(0))
}

/// Add `count` reads showing `base` at `chrom:position`.
pub fn add_reads(source: &mut InMemorySource, chrom: &str, position: u64, base: u8, count: usize) {
    for _ in 0..count {
        source.push(chrom, read_showing(position, base));
    }
}
