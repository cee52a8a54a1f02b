use std::fs;

use watchtower_app::{load_config, run_headless, write_json};
use watchtower_core::WorldConfig;
use watchtower_index::GridConfig;

fn quick_config() -> WorldConfig {
    WorldConfig {
        grid: GridConfig::new(0.0, 300.0, 0.0, 300.0, 30.0),
        agent_count: 60,
        rng_seed: Some(0xC0FFEE),
        ..WorldConfig::default()
    }
}

#[test]
fn headless_run_reports_every_tick() {
    let report = run_headless(quick_config(), 25).expect("run");
    assert_eq!(report.frames.len(), 25);
    assert_eq!(report.summary.ticks_simulated, 25);
    assert_eq!(report.summary.final_agent_count, 60);
    assert_eq!(
        report.summary.total_enters,
        report.frames.iter().map(|frame| frame.enters).sum::<u64>()
    );
}

#[test]
fn report_and_config_files_round_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("world.json");
    write_json(&config_path, &quick_config()).expect("write config");
    let loaded = load_config(&config_path).expect("load config");
    assert_eq!(loaded, quick_config());

    let report = run_headless(loaded, 5).expect("run");
    let report_path = dir.path().join("nested").join("report.json");
    write_json(&report_path, &report).expect("write report");
    let raw = fs::read_to_string(&report_path).expect("read report");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("parse report");
    assert_eq!(value["summary"]["ticks_simulated"], 5);
    assert_eq!(value["frames"].as_array().map(Vec::len), Some(5));
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "grid": { "cell_size": -1.0 } }"#).expect("write");
    let err = load_config(&path).expect_err("negative cell size");
    assert!(format!("{err:#}").contains("cell_size"));
}

#[test]
fn unwritable_report_path_names_the_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("occupied");
    fs::write(&blocker, "not a directory").expect("write");
    let err = write_json(&blocker.join("report.json"), &quick_config())
        .expect_err("parent is a file");
    assert!(format!("{err:#}").contains("failed to create"));
}

#[test]
fn empty_world_runs_without_agents() {
    let config = WorldConfig {
        agent_count: 0,
        ..quick_config()
    };
    let report = run_headless(config, 3).expect("run");
    assert_eq!(report.summary.final_agent_count, 0);
    assert_eq!(report.summary.total_enters, 0);
    assert_eq!(report.summary.peak_visible_pairs, 0);
}
