//! 损失函数
//!
//! 基准真值路段上的归一化均方根误差（NRMSE）。

use crate::error::{CalibrationError, Result};
use crate::telemetry::{EdgeRecord, edge_totals};
use std::collections::BTreeMap;

/// 在 `ground_truth` 出现的路段上按总数计算 `sqrt(mean((sim - gt)^2)) / mean(gt)`。
/// `simulated` 中缺失的路段按 0 计。
pub fn compute_loss(ground_truth: &[EdgeRecord], simulated: &[EdgeRecord]) -> Result<f64> {
    nrmse(&edge_totals(ground_truth), simulated)
}

// BTreeMap 的遍历顺序保证浮点求和与记录顺序无关
pub(crate) fn nrmse(ground_truth: &BTreeMap<&str, u64>, simulated: &[EdgeRecord]) -> Result<f64> {
    let n = ground_truth.len();
    let gt_sum: u128 = ground_truth.values().map(|&c| u128::from(c)).sum();
    if n == 0 || gt_sum == 0 {
        return Err(CalibrationError::DegenerateGroundTruth { edges: n });
    }
    let gt_mean = gt_sum as f64 / n as f64;

    let sim = edge_totals(simulated);
    let mut sq_err = 0.0;
    for (edge, &gt) in ground_truth {
        let s = sim.get(edge).copied().unwrap_or(0);
        let diff = s as f64 - gt as f64;
        sq_err += diff * diff;
    }
    Ok((sq_err / n as f64).sqrt() / gt_mean)
}
