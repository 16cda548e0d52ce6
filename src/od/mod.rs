//! OD 需求矩阵模块
//!
//! 此模块包含需求矩阵的内存表示、`tazRelation` 文件读写以及固定路径表。

// 子模块声明
mod matrix;
mod routes;
mod xml;

// 重新导出公共接口
pub use matrix::{OdMatrix, OdRecord};
pub use routes::RouteTable;
pub use xml::{load, render, serialize};
