use super::fake_sim::FakeSimulator;
use crate::campaign::Campaign;
use crate::config::{AssetOverrides, CampaignConfig};
use crate::error::CalibrationError;
use crate::od::{self, OdMatrix, OdRecord};
use crate::perturb::perturb_trial;
use std::fs;
use std::path::{Path, PathBuf};

const EDGE_OUT: &str = "edge_data_qs.xml";

fn config(base: &Path, trials: usize) -> CampaignConfig {
    CampaignConfig {
        base_path: base.to_path_buf(),
        network_name: "qs".to_string(),
        model_name: "test_sim".to_string(),
        simulator_home: PathBuf::from("/nonexistent/sumo"),
        od_duration_seconds: 1800,
        num_ods: None,
        trial_count: trials,
        ground_truth_edges: 2,
        seed: 11,
        paths: AssetOverrides {
            edge_output_name: Some(EDGE_OUT.to_string()),
            ..AssetOverrides::default()
        },
    }
}

fn write_baseline(base: &Path, records: Vec<OdRecord>) -> OdMatrix {
    let m = OdMatrix::new(records, Some(1800)).expect("baseline");
    od::serialize(&m, Path::new("network/qs/od.xml"), 1800, base).expect("write baseline");
    m
}

fn three_pairs() -> Vec<OdRecord> {
    vec![
        OdRecord::new("1", "2", 100.0),
        OdRecord::new("2", "3", 50.0),
        OdRecord::new("3", "1", 0.0),
    ]
}

#[test]
fn campaign_scores_every_trial_against_baseline_edges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = write_baseline(dir.path(), three_pairs());
    let cfg = config(dir.path(), 4);

    let report = Campaign::new(cfg, FakeSimulator::new(EDGE_OUT))
        .expect("campaign")
        .run()
        .expect("run");

    assert_eq!(
        report.ground_truth.counts().collect::<Vec<_>>(),
        vec![("1_2", 100), ("2_3", 50)]
    );
    assert_eq!(report.baseline_total_demand, 150.0);
    assert_eq!(report.trials.len(), 4);
    assert_eq!(report.failed_count(), 0);

    for (i, t) in report.trials.iter().enumerate() {
        assert_eq!(t.index, i);
        let loss = t.loss.expect("scored");
        assert!(loss.is_finite() && loss >= 0.0 && loss < 0.5, "loss {loss}");
        // Each trial carries exactly the perturbation its index and seed produce.
        let expected = perturb_trial(&base, i, 11).expect("perturb");
        assert_eq!(t.demands, expected.demands());
        assert_eq!(t.demands[2], 0.0);
    }

    // Each trial wrote its own outputs.
    let out = dir.path().join("output/qs_test_sim");
    assert!(out.join(format!("baseline_{EDGE_OUT}")).is_file());
    for i in 0..4 {
        assert!(out.join(format!("epsilon{i}_{EDGE_OUT}")).is_file());
        assert!(out.join(format!("epsilon{i}_od.xml")).is_file());
    }
}

#[test]
fn failed_trial_is_recorded_and_campaign_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_baseline(dir.path(), three_pairs());
    let mut fake = FakeSimulator::new(EDGE_OUT);
    fake.fail_stems.push("epsilon1".into());
    fake.silent_stems.push("epsilon3".into());

    let report = Campaign::new(config(dir.path(), 5), fake)
        .expect("campaign")
        .run()
        .expect("run");

    assert_eq!(report.trials.len(), 5);
    assert_eq!(report.failed_count(), 2);
    assert!(report.trials[0].loss.is_some());
    assert!(report.trials[1].loss.is_none());
    assert!(report.trials[1]
        .failure
        .as_deref()
        .expect("reason")
        .contains("epsilon1"));
    assert!(report.trials[2].loss.is_some());
    assert!(report.trials[3].is_failed());
    assert!(report.trials[4].loss.is_some());
    assert!(report.best().is_some_and(|t| !t.is_failed()));
}

#[test]
fn report_serializes_failed_loss_as_null() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_baseline(dir.path(), three_pairs());
    let mut fake = FakeSimulator::new(EDGE_OUT);
    fake.fail_stems.push("epsilon0".into());

    let report = Campaign::new(config(dir.path(), 2), fake)
        .expect("campaign")
        .run()
        .expect("run");
    let path = dir.path().join("report/trials.json");
    report.write_json(&path).expect("write report");

    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    let trials = v["trials"].as_array().expect("trials array");
    assert_eq!(trials.len(), 2);
    assert!(trials[0]["loss"].is_null());
    assert!(trials[0]["failure"].is_string());
    assert!(trials[1]["loss"].is_number());
    assert!(trials[1].get("failure").is_none());
}

#[test]
fn failed_baseline_aborts_campaign() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_baseline(dir.path(), three_pairs());
    let mut fake = FakeSimulator::new(EDGE_OUT);
    fake.fail_stems.push("baseline".into());

    let err = Campaign::new(config(dir.path(), 3), fake)
        .expect("campaign")
        .run()
        .expect_err("baseline failure is fatal");
    assert!(matches!(err, CalibrationError::SimulationFailed { .. }));
}

#[test]
fn all_zero_baseline_is_degenerate() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_baseline(
        dir.path(),
        vec![OdRecord::new("1", "2", 0.0), OdRecord::new("2", "1", 0.2)],
    );
    let err = Campaign::new(config(dir.path(), 3), FakeSimulator::new(EDGE_OUT))
        .expect("campaign")
        .run()
        .expect_err("no traffic");
    assert!(matches!(err, CalibrationError::DegenerateGroundTruth { .. }));
}

#[test]
fn malformed_baseline_aborts_before_any_simulation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let od_path = dir.path().join("network/qs/od.xml");
    fs::create_dir_all(od_path.parent().expect("parent")).expect("mkdir");
    fs::write(&od_path, "<data><interval begin=\"0\" end=\"60\"><tazRelation from=\"1\"/></interval></data>")
        .expect("write");

    let err = Campaign::new(config(dir.path(), 3), FakeSimulator::new(EDGE_OUT))
        .expect("campaign")
        .run()
        .expect_err("format error");
    assert!(matches!(err, CalibrationError::Format { .. }));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn num_ods_restricts_baseline_to_route_table_pairs() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_baseline(dir.path(), three_pairs());
    fs::write(
        dir.path().join("network/qs/routes.csv"),
        ",fromTaz,toTaz\n0,2,3\n1,1,2\n2,3,1\n",
    )
    .expect("write routes");
    let mut cfg = config(dir.path(), 2);
    cfg.num_ods = Some(1);
    cfg.ground_truth_edges = 5;

    let report = Campaign::new(cfg, FakeSimulator::new(EDGE_OUT))
        .expect("campaign")
        .run()
        .expect("run");
    assert_eq!(report.baseline_total_demand, 50.0);
    assert_eq!(
        report.ground_truth.counts().collect::<Vec<_>>(),
        vec![("2_3", 50)]
    );
    assert!(report.trials.iter().all(|t| t.demands.len() == 1));
}
