//! 仿真驱动器

use super::backend::{SimulationBackend, SimulationRequest, TelemetryHandle, prefixed};
use crate::config::NetworkAssets;
use crate::error::{CalibrationError, Result};
use crate::od::{self, OdMatrix, RouteTable};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 与其他输出并列写出的需求文件名（未加前缀）
pub const OD_OUTPUT_NAME: &str = "od.xml";

/// 在固定路网资源上把 OD 矩阵变成仿真遥测
pub struct SimulationDriver<B> {
    backend: B,
    assets: NetworkAssets,
    routes: Option<RouteTable>,
    duration_seconds: u64,
    base_path: PathBuf,
}

impl<B: SimulationBackend> SimulationDriver<B> {
    pub fn new(
        backend: B,
        assets: NetworkAssets,
        duration_seconds: u64,
        base_path: impl Into<PathBuf>,
    ) -> Self {
        SimulationDriver {
            backend,
            assets,
            routes: None,
            duration_seconds,
            base_path: base_path.into(),
        }
    }

    /// 用于提示哪些 OD 对没有固定路径的路径表
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.set_routes(routes);
        self
    }

    pub fn set_routes(&mut self, routes: RouteTable) {
        self.routes = Some(routes);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn assets(&self) -> &NetworkAssets {
        &self.assets
    }

    /// 写出 `matrix`，运行一次仿真，返回指向 `{output_prefix}_{edge_output_name}`
    /// 的句柄。相对前缀以 base path 为基准。
    #[tracing::instrument(skip(self, matrix), fields(prefix = %output_prefix.display()))]
    pub fn run_simulation(
        &mut self,
        matrix: &OdMatrix,
        output_prefix: &Path,
    ) -> Result<TelemetryHandle> {
        let prefix = if output_prefix.is_absolute() {
            output_prefix.to_path_buf()
        } else {
            self.base_path.join(output_prefix)
        };

        let od_file = od::serialize(
            matrix,
            &prefixed(&prefix, OD_OUTPUT_NAME),
            self.duration_seconds,
            &self.base_path,
        )?;
        self.warn_unrouted(matrix);

        let request = SimulationRequest {
            net: self.assets.net.clone(),
            taz: self.assets.taz.clone(),
            od: od_file,
            additional: self.assets.additional.clone(),
            end_seconds: self.duration_seconds,
            output_prefix: prefix,
        };
        info!(
            total_demand = matrix.total_demand(),
            end_s = request.end_seconds,
            "🚗 开始仿真"
        );
        self.backend.simulate(&request)?;

        let out = request.output_file(&self.assets.edge_output_name);
        if !out.is_file() {
            return Err(CalibrationError::SimulationFailed {
                stage: "output",
                prefix: request.prefix_label(),
                reason: format!("no telemetry at {}", out.display()),
            });
        }
        Ok(TelemetryHandle::new(out))
    }

    fn warn_unrouted(&self, matrix: &OdMatrix) {
        let Some(routes) = &self.routes else {
            return;
        };
        let missing = matrix
            .records()
            .iter()
            .filter(|r| r.demand > 0.0 && !routes.covers(&r.from, &r.to))
            .count();
        if missing > 0 {
            warn!(missing, "⚠️ 部分有需求的 OD 对没有固定路径");
        }
    }
}
