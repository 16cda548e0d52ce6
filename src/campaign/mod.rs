//! 标定活动模块
//!
//! 此模块按顺序执行基线仿真、真值路段选择以及逐次的扰动-仿真-评分试验。

// 子模块声明
mod orchestrator;
mod result;

// 重新导出公共接口
pub use orchestrator::{BASELINE_PREFIX, Campaign, CampaignState};
pub use result::{CampaignReport, TrialResult};
