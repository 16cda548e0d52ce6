//! 路段计数记录

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一个输出时间段内某条路段上观测到的车辆数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub edge_id: String,
    /// 时间段起点（仿真秒）
    pub interval_begin: f64,
    pub vehicle_count: u64,
}

impl EdgeRecord {
    pub fn new(edge_id: impl Into<String>, interval_begin: f64, vehicle_count: u64) -> Self {
        EdgeRecord {
            edge_id: edge_id.into(),
            interval_begin,
            vehicle_count,
        }
    }
}

/// 按路段 id 汇总各时间段的车辆数，超出 u64 时取饱和值
pub fn edge_totals(telemetry: &[EdgeRecord]) -> BTreeMap<&str, u64> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for r in telemetry {
        let total = totals.entry(r.edge_id.as_str()).or_default();
        *total = total.saturating_add(r.vehicle_count);
    }
    totals
}
