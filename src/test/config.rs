use crate::config::{CampaignConfig, DEFAULT_GROUND_TRUTH_EDGES, DEFAULT_TRIAL_COUNT};
use crate::error::CalibrationError;
use std::fs;
use std::path::PathBuf;

#[test]
fn minimal_json_fills_defaults_and_layout() {
    let raw = r#"
    {
        "base_path": "/data/calib",
        "network_name": "quickstart2",
        "model_name": "test_sim"
    }
    "#;
    let cfg: CampaignConfig = serde_json::from_str(raw).expect("parse config");
    cfg.validate().expect("valid");
    assert_eq!(cfg.trial_count, DEFAULT_TRIAL_COUNT);
    assert_eq!(cfg.ground_truth_edges, DEFAULT_GROUND_TRUTH_EDGES);
    assert_eq!(cfg.od_duration_seconds, 1800);
    assert_eq!(cfg.simulator_home, PathBuf::from("/usr/share/sumo"));
    assert!(cfg.num_ods.is_none());

    let assets = cfg.assets();
    assert_eq!(assets.net, PathBuf::from("/data/calib/network/quickstart2/net.xml"));
    assert_eq!(assets.taz, PathBuf::from("/data/calib/network/quickstart2/taz.xml"));
    assert_eq!(assets.routes, PathBuf::from("/data/calib/network/quickstart2/routes.csv"));
    assert_eq!(assets.edge_output_name, "edge_data_quickstart2.xml");
    assert_eq!(cfg.od_file(), PathBuf::from("/data/calib/network/quickstart2/od.xml"));
    assert_eq!(
        cfg.output_dir(),
        PathBuf::from("/data/calib/output/quickstart2_test_sim")
    );
}

#[test]
fn overrides_resolve_against_base_path() {
    let raw = r#"
    {
        "base_path": "/data/calib",
        "network_name": "SFO",
        "model_name": "m",
        "num_ods": 100,
        "paths": {
            "net": "SFO.net.xml",
            "routes": "/abs/5hr_route_choice_set.csv",
            "edge_output_name": "edge_data_SFO.xml"
        }
    }
    "#;
    let cfg: CampaignConfig = serde_json::from_str(raw).expect("parse config");
    let assets = cfg.assets();
    assert_eq!(assets.net, PathBuf::from("/data/calib/SFO.net.xml"));
    assert_eq!(assets.routes, PathBuf::from("/abs/5hr_route_choice_set.csv"));
    assert_eq!(cfg.num_ods, Some(100));
}

#[test]
fn validate_rejects_zero_sizes() {
    let mut cfg: CampaignConfig = serde_json::from_str(
        r#"{ "base_path": ".", "network_name": "n", "model_name": "m" }"#,
    )
    .expect("parse config");
    cfg.ground_truth_edges = 0;
    assert!(matches!(cfg.validate(), Err(CalibrationError::Config(_))));
    cfg.ground_truth_edges = 10;
    cfg.od_duration_seconds = 0;
    assert!(matches!(cfg.validate(), Err(CalibrationError::Config(_))));
}

#[test]
fn from_json_file_reports_malformed_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("campaign.json");
    fs::write(&path, "{ \"base_path\": ").expect("write");
    let err = CampaignConfig::from_json_file(&path).expect_err("truncated json");
    assert!(matches!(err, CalibrationError::Format { .. }));
}
