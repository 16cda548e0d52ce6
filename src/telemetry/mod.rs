//! 路段遥测模块
//!
//! 此模块负责解析仿真器输出的路段计数，并从基线仿真中选出固定的真值路段集合。

// 子模块声明
mod ground_truth;
mod parse;
mod record;

// 重新导出公共接口
pub use ground_truth::{GroundTruth, select_ground_truth_edges};
pub use parse::{extract_telemetry, parse_telemetry};
pub use record::{EdgeRecord, edge_totals};
