//! 标定编排器
//!
//! 基准仿真 → 选定基准真值 → 逐次扰动、仿真、评分。

use super::result::{CampaignReport, TrialResult};
use crate::config::CampaignConfig;
use crate::error::{CalibrationError, Result};
use crate::od::{self, OdMatrix, RouteTable};
use crate::perturb::perturb;
use crate::sim::{SimulationBackend, SimulationDriver, SumoBackend};
use crate::telemetry::{GroundTruth, extract_telemetry};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// 未扰动仿真的输出前缀
pub const BASELINE_PREFIX: &str = "baseline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignState {
    Init,
    BaselineSim,
    GroundTruthSelected,
    Perturb(usize),
    Simulate(usize),
    Score(usize),
    Done,
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignState::Init => write!(f, "init"),
            CampaignState::BaselineSim => write!(f, "baseline_sim"),
            CampaignState::GroundTruthSelected => write!(f, "ground_truth_selected"),
            CampaignState::Perturb(i) => write!(f, "perturb[{i}]"),
            CampaignState::Simulate(i) => write!(f, "simulate[{i}]"),
            CampaignState::Score(i) => write!(f, "score[{i}]"),
            CampaignState::Done => write!(f, "done"),
        }
    }
}

/// 一次标定：先做一次基准仿真，再做 `trial_count` 次扰动仿真，
/// 每次都在基准最繁忙的路段上评分。
pub struct Campaign<B> {
    config: CampaignConfig,
    driver: SimulationDriver<B>,
    state: CampaignState,
}

impl Campaign<SumoBackend> {
    /// 使用 `config` 中指定的 SUMO 安装
    pub fn with_sumo(config: CampaignConfig) -> Result<Self> {
        let backend = SumoBackend::new(&config.simulator_home)?;
        Campaign::new(config, backend)
    }
}

impl<B: SimulationBackend> Campaign<B> {
    pub fn new(config: CampaignConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let driver = SimulationDriver::new(
            backend,
            config.assets(),
            config.od_duration_seconds,
            config.base_path.clone(),
        );
        Ok(Campaign {
            config,
            driver,
            state: CampaignState::Init,
        })
    }

    pub fn state(&self) -> CampaignState {
        self.state
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    fn enter(&mut self, state: CampaignState) {
        tracing::debug!(from = %self.state, to = %state, "标定状态切换");
        self.state = state;
    }

    fn output_prefix(&self, stem: &str) -> PathBuf {
        self.config.output_dir().join(stem)
    }

    /// 运行全部阶段。只有单次试验的仿真失败会被记录并跳过，其余错误都会中止标定。
    #[tracing::instrument(skip(self), fields(network = %self.config.network_name, model = %self.config.model_name))]
    pub fn run(mut self) -> Result<CampaignReport> {
        self.enter(CampaignState::Init);
        let baseline = self.load_baseline()?;

        self.enter(CampaignState::BaselineSim);
        let ground_truth = self.simulate_baseline(&baseline)?;
        self.enter(CampaignState::GroundTruthSelected);

        let trial_count = self.config.trial_count;
        let mut trials = Vec::with_capacity(trial_count);
        for (idx, perturbed) in perturb(&baseline, trial_count, self.config.seed)?.enumerate() {
            self.enter(CampaignState::Perturb(idx));
            let result = self.run_trial(idx, perturbed, &ground_truth)?;
            match result.loss {
                Some(loss) => info!(trial = idx, loss, "📈 试验完成评分"),
                None => warn!(trial = idx, reason = ?result.failure, "⚠️ 试验失败"),
            }
            trials.push(result);
        }

        self.enter(CampaignState::Done);
        let report = CampaignReport {
            ground_truth,
            baseline_total_demand: baseline.total_demand(),
            trials,
        };
        info!(
            trials = report.trials.len(),
            failed = report.failed_count(),
            best_loss = ?report.best().and_then(|t| t.loss),
            "✅ 标定完成"
        );
        Ok(report)
    }

    fn load_baseline(&mut self) -> Result<OdMatrix> {
        let baseline = od::load(&self.config.od_file())?;
        info!(total_demand = baseline.total_demand(), "📥 基准需求");

        let routes_path = self.driver.assets().routes.clone();
        let routes = if self.config.num_ods.is_some() || routes_path.is_file() {
            Some(RouteTable::load(&routes_path)?)
        } else {
            warn!(path = %routes_path.display(), "未找到路径表，跳过路径检查");
            None
        };

        let baseline = match (self.config.num_ods, &routes) {
            (Some(n), Some(routes)) => {
                let restricted = baseline.restrict_to(&routes.od_pairs(Some(n)));
                info!(
                    num_ods = n,
                    kept = restricted.len(),
                    total_demand = restricted.total_demand(),
                    "已按路径表截取 OD 对"
                );
                restricted
            }
            _ => baseline,
        };
        if baseline.is_empty() {
            return Err(CalibrationError::Config(format!(
                "OD matrix {} has no pairs to calibrate",
                self.config.od_file().display()
            )));
        }
        baseline.validate()?;

        if let Some(routes) = routes {
            self.driver.set_routes(routes);
        }
        Ok(baseline)
    }

    fn simulate_baseline(&mut self, baseline: &OdMatrix) -> Result<GroundTruth> {
        let prefix = self.output_prefix(BASELINE_PREFIX);
        let handle = self.driver.run_simulation(baseline, &prefix)?;
        let telemetry = extract_telemetry(&handle)?;
        GroundTruth::from_baseline(&telemetry, self.config.ground_truth_edges)
    }

    /// 针对冻结的基准真值运行一次试验，只有致命错误才返回 `Err`
    fn run_trial(
        &mut self,
        idx: usize,
        perturbed: OdMatrix,
        ground_truth: &GroundTruth,
    ) -> Result<TrialResult> {
        let demands = perturbed.demands();
        match self.score_trial(idx, &perturbed, ground_truth) {
            Ok(loss) => Ok(TrialResult::scored(idx, loss, demands)),
            Err(e) if e.is_trial_failure() => Ok(TrialResult::failed(idx, e.to_string(), demands)),
            Err(e) => Err(e),
        }
    }

    fn score_trial(
        &mut self,
        idx: usize,
        perturbed: &OdMatrix,
        ground_truth: &GroundTruth,
    ) -> Result<f64> {
        let prefix = self.output_prefix(&format!("epsilon{idx}"));

        self.enter(CampaignState::Simulate(idx));
        let handle = self.driver.run_simulation(perturbed, &prefix)?;
        let telemetry = extract_telemetry(&handle).map_err(|e| match e {
            CalibrationError::Format { .. } | CalibrationError::Io { .. } => {
                CalibrationError::SimulationFailed {
                    stage: "telemetry",
                    prefix: prefix.display().to_string(),
                    reason: e.to_string(),
                }
            }
            other => other,
        })?;

        self.enter(CampaignState::Score(idx));
        ground_truth.loss(&telemetry)
    }
}
