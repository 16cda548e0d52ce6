//! 基准真值路段

use super::record::{EdgeRecord, edge_totals};
use crate::error::{CalibrationError, Result};
use crate::loss;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// 按总计数取最繁忙的 `k` 条路段；计数相同时 id 较小者优先
pub fn select_ground_truth_edges(telemetry: &[EdgeRecord], k: usize) -> Vec<String> {
    let mut ranked: Vec<(&str, u64)> = edge_totals(telemetry).into_iter().collect();
    // 总数按 id 升序给出，稳定排序保持并列项的 id 顺序
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// 一次标定冻结的评估集合：选中的路段及其基准总数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    counts: BTreeMap<String, u64>,
}

impl GroundTruth {
    /// 从基准仿真中选出前 `k` 条路段
    pub fn from_baseline(telemetry: &[EdgeRecord], k: usize) -> Result<GroundTruth> {
        let edges = select_ground_truth_edges(telemetry, k);
        let totals = edge_totals(telemetry);
        let counts = edges
            .into_iter()
            .map(|id| {
                let n = totals.get(id.as_str()).copied().unwrap_or(0);
                (id, n)
            })
            .collect();
        let gt = GroundTruth { counts };
        gt.check()?;
        info!(
            edges = gt.len(),
            mean_count = gt.mean_count(),
            "🎯 已选定基准真值路段"
        );
        Ok(gt)
    }

    /// 由显式给出的路段总数构造
    pub fn from_counts<I, S>(counts: I) -> Result<GroundTruth>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut map: BTreeMap<String, u64> = BTreeMap::new();
        for (id, n) in counts {
            let total: &mut u64 = map.entry(id.into()).or_default();
            *total = total.saturating_add(n);
        }
        let gt = GroundTruth { counts: map };
        gt.check()?;
        Ok(gt)
    }

    fn check(&self) -> Result<()> {
        if self.counts.values().all(|&n| n == 0) {
            return Err(CalibrationError::DegenerateGroundTruth {
                edges: self.counts.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, edge_id: &str) -> bool {
        self.counts.contains_key(edge_id)
    }

    /// 按路段 id 升序给出 `(路段 id, 总数)`
    pub fn counts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(id, &n)| (id.as_str(), n))
    }

    /// `telemetry` 中落在基准真值路段上的记录
    pub fn restrict(&self, telemetry: &[EdgeRecord]) -> Vec<EdgeRecord> {
        telemetry
            .iter()
            .filter(|r| self.contains(&r.edge_id))
            .cloned()
            .collect()
    }

    /// `simulated` 在这些路段上的 NRMSE
    pub fn loss(&self, simulated: &[EdgeRecord]) -> Result<f64> {
        let totals: BTreeMap<&str, u64> = self.counts().collect();
        loss::nrmse(&totals, simulated)
    }

    pub fn mean_count(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        self.counts.values().map(|&n| n as f64).sum::<f64>() / self.counts.len() as f64
    }
}
