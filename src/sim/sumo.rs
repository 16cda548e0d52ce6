//! SUMO 后端
//!
//! 两个子进程：`od2trips` 把需求文件展开为出行，`sumo` 再在路网上运行这些出行。

use super::backend::{SimulationBackend, SimulationRequest};
use crate::error::{CalibrationError, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info, warn};

/// `od2trips` 写出的出行文件名（未加前缀）
pub const TRIPS_OUTPUT_NAME: &str = "trips.xml";

#[derive(Debug, Clone)]
pub struct SumoBackend {
    od2trips: PathBuf,
    sumo: PathBuf,
}

impl SumoBackend {
    /// 解析 `{home}/bin/od2trips` 与 `{home}/bin/sumo`
    pub fn new(home: &Path) -> Result<SumoBackend> {
        let bin = home.join("bin");
        Ok(SumoBackend {
            od2trips: resolve_tool(&bin, "od2trips")?,
            sumo: resolve_tool(&bin, "sumo")?,
        })
    }

    pub(crate) fn od2trips_args(req: &SimulationRequest) -> Vec<OsString> {
        vec![
            "--taz-files".into(),
            req.taz.clone().into(),
            "--tazrelation-files".into(),
            req.od.clone().into(),
            "--output-file".into(),
            req.output_file(TRIPS_OUTPUT_NAME).into(),
            "--begin".into(),
            "0".into(),
            "--end".into(),
            req.end_seconds.to_string().into(),
        ]
    }

    /// sumo 只读取 od2trips 生成的出行文件作为路径输入
    pub(crate) fn sumo_args(req: &SimulationRequest) -> Vec<OsString> {
        let mut prefix = req.output_prefix.clone().into_os_string();
        prefix.push("_");
        vec![
            "--net-file".into(),
            req.net.clone().into(),
            "--route-files".into(),
            req.output_file(TRIPS_OUTPUT_NAME).into(),
            "--additional-files".into(),
            req.additional.clone().into(),
            "--begin".into(),
            "0".into(),
            "--end".into(),
            req.end_seconds.to_string().into(),
            "--output-prefix".into(),
            prefix,
            "--no-step-log".into(),
            "true".into(),
        ]
    }
}

fn resolve_tool(bin: &Path, name: &str) -> Result<PathBuf> {
    let path = bin.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(CalibrationError::SimulatorNotFound { path })
    }
}

fn run_stage(
    stage: &'static str,
    program: &Path,
    args: &[OsString],
    req: &SimulationRequest,
) -> Result<()> {
    debug!(stage, program = %program.display(), ?args, "启动子进程");
    let output: Output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CalibrationError::SimulatorNotFound {
                path: program.to_path_buf(),
            }
        } else {
            CalibrationError::SimulationFailed {
                stage,
                prefix: req.prefix_label(),
                reason: format!("spawn failed: {e}"),
            }
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(5)..].join(" | ");
        warn!(stage, status = %output.status, stderr = %tail, "❌ 仿真阶段失败");
        return Err(CalibrationError::SimulationFailed {
            stage,
            prefix: req.prefix_label(),
            reason: format!("exited with {}: {tail}", output.status),
        });
    }
    Ok(())
}

impl SimulationBackend for SumoBackend {
    #[tracing::instrument(skip(self, request), fields(prefix = %request.output_prefix.display()))]
    fn simulate(&mut self, request: &SimulationRequest) -> Result<()> {
        run_stage("od2trips", &self.od2trips, &Self::od2trips_args(request), request)?;
        run_stage("sumo", &self.sumo, &Self::sumo_args(request), request)?;
        info!(end_s = request.end_seconds, "✅ 仿真完成");
        Ok(())
    }
}
