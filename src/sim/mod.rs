//! 仿真驱动模块
//!
//! 此模块把一个 OD 矩阵交给外部交通仿真器运行，并返回其路段计数输出的句柄。

// 子模块声明
mod backend;
mod driver;
mod sumo;

// 重新导出公共接口
pub use backend::{SimulationBackend, SimulationRequest, TelemetryHandle};
pub use driver::{OD_OUTPUT_NAME, SimulationDriver};
pub use sumo::{SumoBackend, TRIPS_OUTPUT_NAME};
