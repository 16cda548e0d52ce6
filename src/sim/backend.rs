//! 仿真后端接口

use crate::error::Result;
use std::path::{Path, PathBuf};

/// 一次仿真所需的全部输入，路径均为绝对路径。
/// 固定路径表只用于驱动器的覆盖检查，不在其中。
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub net: PathBuf,
    pub taz: PathBuf,
    pub od: PathBuf,
    pub additional: PathBuf,
    /// 仿真结束时间（秒），总是从 0 开始
    pub end_seconds: u64,
    /// 输出文件写为 `{output_prefix}_{name}`
    pub output_prefix: PathBuf,
}

impl SimulationRequest {
    /// `{output_prefix}_{name}`
    pub fn output_file(&self, name: &str) -> PathBuf {
        prefixed(&self.output_prefix, name)
    }

    pub fn prefix_label(&self) -> String {
        self.output_prefix.display().to_string()
    }
}

pub(crate) fn prefixed(prefix: &Path, name: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_os_string();
    s.push("_");
    s.push(name);
    PathBuf::from(s)
}

/// 指向一次仿真所产生遥测的句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle(PathBuf);

impl TelemetryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TelemetryHandle(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// 阻塞式仿真器。实现把输出写在请求的前缀下，失败时返回 `SimulationFailed`。
pub trait SimulationBackend {
    fn simulate(&mut self, request: &SimulationRequest) -> Result<()>;
}

impl<B: SimulationBackend + ?Sized> SimulationBackend for Box<B> {
    fn simulate(&mut self, request: &SimulationRequest) -> Result<()> {
        (**self).simulate(request)
    }
}
