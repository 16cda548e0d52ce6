//! 标定结果

use crate::error::{CalibrationError, Result};
use crate::telemetry::GroundTruth;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 一次“扰动-仿真-评分”循环的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub index: usize,
    /// 相对基准真值的 NRMSE；仿真失败时为 `None`
    pub loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub total_demand: f64,
    /// 按基准记录顺序排列的扰动需求
    pub demands: Vec<f64>,
}

impl TrialResult {
    pub fn scored(index: usize, loss: f64, demands: Vec<f64>) -> Self {
        TrialResult {
            index,
            loss: Some(loss),
            failure: None,
            total_demand: demands.iter().sum(),
            demands,
        }
    }

    pub fn failed(index: usize, reason: impl Into<String>, demands: Vec<f64>) -> Self {
        TrialResult {
            index,
            loss: None,
            failure: Some(reason.into()),
            total_demand: demands.iter().sum(),
            demands,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.loss.is_none()
    }
}

/// 标定结束后交给优化器的全部数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignReport {
    pub ground_truth: GroundTruth,
    pub baseline_total_demand: f64,
    pub trials: Vec<TrialResult>,
}

impl CampaignReport {
    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failed()).count()
    }

    /// 损失最低的成功试验
    pub fn best(&self) -> Option<&TrialResult> {
        self.trials
            .iter()
            .filter_map(|t| t.loss.map(|l| (l, t)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, t)| t)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CalibrationError::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| CalibrationError::format(path, e.to_string()))?;
        fs::write(path, raw).map_err(|e| CalibrationError::io(path, e))
    }
}
