use super::fake_sim::FakeSimulator;
use crate::config::NetworkAssets;
use crate::error::{CalibrationError, Result};
use crate::od::{self, OdMatrix, OdRecord, RouteTable};
use crate::sim::{SimulationBackend, SimulationDriver, SimulationRequest, SumoBackend};
use crate::telemetry::extract_telemetry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn assets(dir: &Path) -> NetworkAssets {
    NetworkAssets {
        taz: dir.join("taz.xml"),
        net: dir.join("net.xml"),
        routes: dir.join("routes.csv"),
        additional: dir.join("additional.xml"),
        edge_output_name: "edge_data_qs.xml".to_string(),
    }
}

fn matrix() -> OdMatrix {
    OdMatrix::new(
        vec![OdRecord::new("1", "2", 40.4), OdRecord::new("2", "1", 9.6)],
        Some(600),
    )
    .expect("matrix")
}

#[test]
fn run_writes_od_file_and_returns_prefixed_handle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut driver = SimulationDriver::new(
        FakeSimulator::new("edge_data_qs.xml"),
        assets(dir.path()),
        600,
        dir.path(),
    )
    .with_routes(RouteTable::from_pairs([("1", "2")]));

    let handle = driver
        .run_simulation(&matrix(), Path::new("out/epsilon3"))
        .expect("simulate");
    assert_eq!(handle.path(), dir.path().join("out/epsilon3_edge_data_qs.xml"));

    let od_file = dir.path().join("out/epsilon3_od.xml");
    let written = od::load(&od_file).expect("od written");
    assert_eq!(written.demands(), vec![40.4, 9.6]);
    assert_eq!(written.duration_seconds, Some(600));

    let telemetry = extract_telemetry(&handle).expect("telemetry");
    let counts: Vec<(String, u64)> = telemetry
        .into_iter()
        .map(|r| (r.edge_id, r.vehicle_count))
        .collect();
    assert_eq!(counts, vec![("1_2".into(), 40), ("2_1".into(), 10)]);
}

#[test]
fn backend_failure_surfaces_as_simulation_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fake = FakeSimulator::new("edge_data_qs.xml");
    fake.fail_stems.push("epsilon0".into());
    let mut driver = SimulationDriver::new(fake, assets(dir.path()), 600, dir.path());

    let err = driver
        .run_simulation(&matrix(), Path::new("epsilon0"))
        .expect_err("must fail");
    assert!(err.is_trial_failure(), "{err}");
}

#[test]
fn missing_output_file_is_simulation_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fake = FakeSimulator::new("edge_data_qs.xml");
    fake.silent_stems.push("epsilon1".into());
    let mut driver = SimulationDriver::new(fake, assets(dir.path()), 600, dir.path());

    match driver.run_simulation(&matrix(), Path::new("epsilon1")) {
        Err(CalibrationError::SimulationFailed { stage, .. }) => assert_eq!(stage, "output"),
        other => panic!("expected SimulationFailed, got {other:?}"),
    }
}

#[test]
fn sumo_backend_requires_installed_binaries() {
    let dir = tempfile::tempdir().expect("tempdir");
    match SumoBackend::new(dir.path()) {
        Err(CalibrationError::SimulatorNotFound { path }) => {
            assert_eq!(path, PathBuf::from(dir.path()).join("bin").join("od2trips"));
        }
        other => panic!("expected SimulatorNotFound, got {other:?}"),
    }
}

/// Keeps every request and delegates to the fake simulator.
struct Recording {
    inner: FakeSimulator,
    requests: Vec<SimulationRequest>,
}

impl SimulationBackend for Recording {
    fn simulate(&mut self, request: &SimulationRequest) -> Result<()> {
        self.requests.push(request.clone());
        self.inner.simulate(request)
    }
}

fn value_after<'a>(args: &'a [OsString], flag: &str) -> &'a OsString {
    let pos = args.iter().position(|a| a == flag).expect(flag);
    &args[pos + 1]
}

#[test]
fn sumo_routes_come_from_generated_trips_not_the_route_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Recording {
        inner: FakeSimulator::new("edge_data_qs.xml"),
        requests: Vec::new(),
    };
    let mut driver = SimulationDriver::new(backend, assets(dir.path()), 600, dir.path())
        .with_routes(RouteTable::from_pairs([("1", "2")]));
    driver
        .run_simulation(&matrix(), Path::new("out/epsilon2"))
        .expect("simulate");

    let req = driver.backend().requests.last().expect("one request").clone();
    let trips = OsString::from(dir.path().join("out/epsilon2_trips.xml"));

    let od2trips = SumoBackend::od2trips_args(&req);
    assert_eq!(value_after(&od2trips, "--output-file"), &trips);
    assert_eq!(
        value_after(&od2trips, "--tazrelation-files"),
        &OsString::from(dir.path().join("out/epsilon2_od.xml"))
    );
    assert_eq!(value_after(&od2trips, "--end"), "600");

    let sumo = SumoBackend::sumo_args(&req);
    assert_eq!(value_after(&sumo, "--route-files"), &trips);
    assert_eq!(
        value_after(&sumo, "--output-prefix"),
        &OsString::from(format!("{}_", dir.path().join("out/epsilon2").display()))
    );

    for arg in od2trips.iter().chain(&sumo) {
        assert!(
            !arg.to_string_lossy().contains("routes.csv"),
            "route table leaked into {arg:?}"
        );
    }
}
