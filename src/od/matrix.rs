//! OD 需求矩阵
//!
//! 一组有序的 `(from, to, demand)` 记录，OD 对互不重复，需求为有限非负数。

use crate::error::{CalibrationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 一个小区对及其在矩阵时间窗内的需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdRecord {
    pub from: String,
    pub to: String,
    pub demand: f64,
}

impl OdRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>, demand: f64) -> Self {
        OdRecord {
            from: from.into(),
            to: to.into(),
            demand,
        }
    }

    pub fn pair(&self) -> (&str, &str) {
        (&self.from, &self.to)
    }
}

/// OD 需求矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct OdMatrix {
    records: Vec<OdRecord>,
    /// 需求所覆盖的时间窗（秒），源文件中有记录时才有值
    pub duration_seconds: Option<u64>,
}

impl OdMatrix {
    pub fn new(records: Vec<OdRecord>, duration_seconds: Option<u64>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            check_demand(r)?;
            if !seen.insert(r.pair()) {
                return Err(CalibrationError::DuplicatePair {
                    from: r.from.clone(),
                    to: r.to.clone(),
                });
            }
        }
        Ok(OdMatrix {
            records,
            duration_seconds,
        })
    }

    pub fn records(&self) -> &[OdRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn demands(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.demand).collect()
    }

    pub fn total_demand(&self) -> f64 {
        self.records.iter().map(|r| r.demand).sum()
    }

    /// 重新检查每个需求值，采样前调用
    pub fn validate(&self) -> Result<()> {
        self.records.iter().try_for_each(check_demand)
    }

    /// 按记录顺序换上 `demands` 的独立副本
    pub(crate) fn with_demands(&self, demands: &[f64]) -> OdMatrix {
        debug_assert_eq!(demands.len(), self.records.len());
        let records = self
            .records
            .iter()
            .zip(demands)
            .map(|(r, &demand)| OdRecord {
                from: r.from.clone(),
                to: r.to.clone(),
                demand,
            })
            .collect();
        OdMatrix {
            records,
            duration_seconds: self.duration_seconds,
        }
    }

    /// 只保留出现在 `pairs` 中的记录，顺序与 `pairs` 一致。
    /// 矩阵中没有的 OD 对直接跳过。
    pub fn restrict_to(&self, pairs: &[(String, String)]) -> OdMatrix {
        let records = pairs
            .iter()
            .filter_map(|(from, to)| {
                self.records
                    .iter()
                    .find(|r| &r.from == from && &r.to == to)
                    .cloned()
            })
            .collect();
        OdMatrix {
            records,
            duration_seconds: self.duration_seconds,
        }
    }
}

fn check_demand(r: &OdRecord) -> Result<()> {
    if !r.demand.is_finite() || r.demand < 0.0 {
        return Err(CalibrationError::InvalidDemand {
            from: r.from.clone(),
            to: r.to.clone(),
            demand: r.demand,
        });
    }
    Ok(())
}
