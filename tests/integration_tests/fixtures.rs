//! Test fixtures for integration tests
//!
//! Provides sample coupon sources and helpers that write them to disk.

use std::io::Write;
use std::path::PathBuf;

use couponbase::config::SourcesConfig;
use tempfile::TempDir;

/// Source 1 of the reference scenario
pub const SCENARIO_SOURCE_1: &[&str] = &["ABCD1234"];

/// Source 2 of the reference scenario
pub const SCENARIO_SOURCE_2: &[&str] = &["ABCD1234", "WXYZ7890"];

/// Source 3 of the reference scenario
pub const SCENARIO_SOURCE_3: &[&str] = &["WXYZ7890", "QQQQ1111"];

/// Write `lines` as a newline-delimited source file
pub fn write_source(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create source file");
    for line in lines {
        writeln!(file, "{line}").expect("write source line");
    }
    path
}

/// Write three sources and return the matching configuration
pub fn write_sources(dir: &TempDir, s1: &[&str], s2: &[&str], s3: &[&str]) -> SourcesConfig {
    SourcesConfig {
        source1: write_source(dir, "couponbase1", s1),
        source2: write_source(dir, "couponbase2", s2),
        source3: write_source(dir, "couponbase3", s3),
    }
}

/// The reference scenario written to `dir`
pub fn scenario_sources(dir: &TempDir) -> SourcesConfig {
    write_sources(dir, SCENARIO_SOURCE_1, SCENARIO_SOURCE_2, SCENARIO_SOURCE_3)
}

/// `count` lines cycling through `distinct` different eight-character codes
pub fn generated_codes(count: usize, distinct: usize) -> Vec<String> {
    (0..count).map(|i| format!("GEN{:05}", i % distinct)).collect()
}
