//! 固定路径表
//!
//! 只用于检查 OD 对是否有固定路径，以及按 `num_ods` 截取前若干个 OD 对；
//! 不会传给仿真器。

use crate::error::{CalibrationError, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// 固定路径表：每行一条路径，至少包含 `fromTaz` 与 `toTaz` 两列。只读输入。
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    pairs: Vec<(String, String)>,
    index: HashSet<(String, String)>,
}

impl RouteTable {
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<RouteTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| CalibrationError::format(path, format!("missing column `{name}`")))
        };
        let from_col = column("fromTaz")?;
        let to_col = column("toTaz")?;

        let mut table = RouteTable::default();
        for (row, rec) in reader.records().enumerate() {
            let rec = rec.map_err(|e| csv_error(path, e))?;
            let from = rec.get(from_col);
            let to = rec.get(to_col);
            match (from, to) {
                (Some(from), Some(to)) => table.push(from.trim(), to.trim()),
                _ => {
                    return Err(CalibrationError::format(
                        path,
                        format!("row {row} is missing fromTaz/toTaz"),
                    ));
                }
            }
        }
        info!(routes = table.len(), pairs = table.index.len(), "📥 已加载路径表");
        Ok(table)
    }

    pub fn from_pairs<I, S>(pairs: I) -> RouteTable
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut table = RouteTable::default();
        for (from, to) in pairs {
            table.push(from, to);
        }
        table
    }

    fn push(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let pair = (from.into(), to.into());
        self.index.insert(pair.clone());
        self.pairs.push(pair);
    }

    /// 路径行数
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn covers(&self, from: &str, to: &str) -> bool {
        self.index.contains(&(from.to_string(), to.to_string()))
    }

    /// 按文件顺序取前 `limit` 个不重复的小区对（`None` 表示全部）
    pub fn od_pairs(&self, limit: Option<usize>) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        self.pairs
            .iter()
            .filter(|p| seen.insert(*p))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

fn csv_error(path: &Path, e: csv::Error) -> CalibrationError {
    if e.is_io_error() {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => CalibrationError::io(path, io),
            other => CalibrationError::format(path, format!("{other:?}")),
        }
    } else {
        CalibrationError::format(path, e.to_string())
    }
}
