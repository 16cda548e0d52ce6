//! 标定配置
//!
//! 一次标定由一个 JSON 文档描述。资源路径默认位于 `base_path` 下的
//! `network/{network_name}` 目录，每一项都可以单独覆盖。

use crate::error::{CalibrationError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIMULATOR_HOME: &str = "/usr/share/sumo";
pub const DEFAULT_OD_DURATION_SECONDS: u64 = 30 * 60;
pub const DEFAULT_TRIAL_COUNT: usize = 10;
pub const DEFAULT_GROUND_TRUTH_EDGES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub base_path: PathBuf,
    pub network_name: String,
    pub model_name: String,
    #[serde(default = "default_simulator_home")]
    pub simulator_home: PathBuf,
    #[serde(default = "default_od_duration_seconds")]
    pub od_duration_seconds: u64,
    /// 从路径表中取前多少个 OD 对；缺省表示使用完整矩阵。
    #[serde(default)]
    pub num_ods: Option<usize>,
    #[serde(default = "default_trial_count")]
    pub trial_count: usize,
    #[serde(default = "default_ground_truth_edges")]
    pub ground_truth_edges: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub paths: AssetOverrides,
}

/// 各资源路径的可选覆盖，相对路径以 `base_path` 为基准。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetOverrides {
    #[serde(default)]
    pub taz: Option<PathBuf>,
    #[serde(default)]
    pub net: Option<PathBuf>,
    #[serde(default)]
    pub routes: Option<PathBuf>,
    #[serde(default)]
    pub od: Option<PathBuf>,
    #[serde(default)]
    pub additional: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub edge_output_name: Option<String>,
}

fn default_simulator_home() -> PathBuf {
    PathBuf::from(DEFAULT_SIMULATOR_HOME)
}

fn default_od_duration_seconds() -> u64 {
    DEFAULT_OD_DURATION_SECONDS
}

fn default_trial_count() -> usize {
    DEFAULT_TRIAL_COUNT
}

fn default_ground_truth_edges() -> usize {
    DEFAULT_GROUND_TRUTH_EDGES
}

/// 每次调用仿真器都要用到的静态文件（已解析为绝对路径或基于 base_path 的路径）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAssets {
    pub taz: PathBuf,
    pub net: PathBuf,
    pub routes: PathBuf,
    pub additional: PathBuf,
    /// additional 配置中路段输出文件的名字（未加前缀）。
    pub edge_output_name: String,
}

impl CampaignConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
        let cfg: CampaignConfig = serde_json::from_str(&raw)
            .map_err(|e| CalibrationError::format(path, e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network_name.is_empty() {
            return Err(CalibrationError::Config("network_name is empty".into()));
        }
        if self.od_duration_seconds == 0 {
            return Err(CalibrationError::Config(
                "od_duration_seconds must be positive".into(),
            ));
        }
        if self.ground_truth_edges == 0 {
            return Err(CalibrationError::Config(
                "ground_truth_edges must be positive".into(),
            ));
        }
        if self.num_ods == Some(0) {
            return Err(CalibrationError::Config("num_ods must be positive".into()));
        }
        Ok(())
    }

    /// `base_path` 下的 `network/{network_name}` 目录
    pub fn network_dir(&self) -> PathBuf {
        self.base_path.join("network").join(&self.network_name)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn asset(&self, over: &Option<PathBuf>, default_name: &str) -> PathBuf {
        match over {
            Some(p) => self.resolve(p),
            None => self.network_dir().join(default_name),
        }
    }

    pub fn od_file(&self) -> PathBuf {
        self.asset(&self.paths.od, "od.xml")
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.paths.output_dir {
            Some(p) => self.resolve(p),
            None => self
                .base_path
                .join("output")
                .join(format!("{}_{}", self.network_name, self.model_name)),
        }
    }

    pub fn assets(&self) -> NetworkAssets {
        NetworkAssets {
            taz: self.asset(&self.paths.taz, "taz.xml"),
            net: self.asset(&self.paths.net, "net.xml"),
            routes: self.asset(&self.paths.routes, "routes.csv"),
            additional: self.asset(&self.paths.additional, "additional.xml"),
            edge_output_name: self
                .paths
                .edge_output_name
                .clone()
                .unwrap_or_else(|| format!("edge_data_{}.xml", self.network_name)),
        }
    }
}
