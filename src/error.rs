//! 错误类型
//!
//! 标定流程中所有阶段共用的错误分类。

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalibrationError>;

#[derive(Error, Debug)]
pub enum CalibrationError {
    /// 输入或输出文件格式错误
    #[error("malformed file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// 某个 OD 对的需求为负或非有限值
    #[error("invalid demand {demand} for OD pair {from} -> {to}")]
    InvalidDemand {
        from: String,
        to: String,
        demand: f64,
    },

    /// 同一矩阵中出现重复的 OD 对
    #[error("duplicate OD pair {from} -> {to}")]
    DuplicatePair { from: String, to: String },

    #[error("simulator binary not found: {}", path.display())]
    SimulatorNotFound { path: PathBuf },

    /// 单次仿真失败：只记录在对应试验上，不中止整个标定。
    #[error("simulation {stage} failed for prefix {prefix}: {reason}")]
    SimulationFailed {
        stage: &'static str,
        prefix: String,
        reason: String,
    },

    #[error("degenerate ground truth over {edges} edge(s): mean count is zero")]
    DegenerateGroundTruth { edges: usize },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CalibrationError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CalibrationError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CalibrationError::Io {
            path: path.into(),
            source,
        }
    }

    /// 编排器是否把该错误记到试验结果上并继续
    pub fn is_trial_failure(&self) -> bool {
        matches!(self, CalibrationError::SimulationFailed { .. })
    }
}
