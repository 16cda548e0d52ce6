//! OD 文件读写
//!
//! 仿真器使用的 `tazRelation` 需求文件格式：
//!
//! ```xml
//! <data>
//!     <interval id="DEFAULT_VEHTYPE" begin="0" end="1800">
//!         <tazRelation from="1" to="2" count="100.0"/>
//!     </interval>
//! </data>
//! ```

use super::matrix::{OdMatrix, OdRecord};
use crate::error::{CalibrationError, Result};
use crate::xml::{attributes, escape};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RELATION_TAG: &[u8] = b"tazRelation";
const INTERVAL_TAG: &[u8] = b"interval";
const VEHTYPE_ID: &str = "DEFAULT_VEHTYPE";

/// 把需求文件解析为 [`OdMatrix`]
#[tracing::instrument]
pub fn load(path: &Path) -> Result<OdMatrix> {
    let raw = fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
    let matrix = parse(&raw).map_err(|reason| match reason {
        ParseFailure::Format(reason) => CalibrationError::format(path, reason),
        ParseFailure::Calibration(e) => e,
    })?;
    info!(
        records = matrix.len(),
        total_demand = matrix.total_demand(),
        "📥 已加载 OD 矩阵"
    );
    Ok(matrix)
}

enum ParseFailure {
    Format(String),
    Calibration(CalibrationError),
}

impl From<String> for ParseFailure {
    fn from(s: String) -> Self {
        ParseFailure::Format(s)
    }
}

fn parse(raw: &str) -> std::result::Result<OdMatrix, ParseFailure> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut duration = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                if name.as_ref() == INTERVAL_TAG {
                    let attrs = attributes(&e)?;
                    duration = duration.or(interval_duration(&attrs));
                } else if name.as_ref() == RELATION_TAG {
                    let attrs = attributes(&e)?;
                    records.push(relation(&attrs, records.len())?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseFailure::Format(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    // 重复 OD 对与非法需求由 OdMatrix::new 统一报告
    OdMatrix::new(records, duration).map_err(ParseFailure::Calibration)
}

fn field<'a>(attrs: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|n| attrs.get(*n))
        .map(String::as_str)
}

fn relation(
    attrs: &HashMap<String, String>,
    idx: usize,
) -> std::result::Result<OdRecord, ParseFailure> {
    let missing = |what: &str| ParseFailure::Format(format!("tazRelation #{idx} has no `{what}`"));
    let from = field(attrs, &["from", "fromTaz"]).ok_or_else(|| missing("from"))?;
    let to = field(attrs, &["to", "toTaz"]).ok_or_else(|| missing("to"))?;
    let count = field(attrs, &["count"]).ok_or_else(|| missing("count"))?;
    let demand: f64 = count.trim().parse().map_err(|_| {
        ParseFailure::Format(format!(
            "tazRelation #{idx} ({from} -> {to}) has non-numeric count {count:?}"
        ))
    })?;
    Ok(OdRecord::new(from, to, demand))
}

fn interval_duration(attrs: &HashMap<String, String>) -> Option<u64> {
    let begin: f64 = attrs.get("begin")?.parse().ok()?;
    let end: f64 = attrs.get("end")?.parse().ok()?;
    (end > begin).then(|| (end - begin).round() as u64)
}

/// 把矩阵渲染为覆盖 `[0, duration_seconds)` 的需求文件
pub fn render(matrix: &OdMatrix, duration_seconds: u64) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<data>\n");
    let _ = writeln!(
        out,
        "    <interval id=\"{VEHTYPE_ID}\" begin=\"0\" end=\"{duration_seconds}\">"
    );
    for r in matrix.records() {
        // f64 的 `{}` 输出是能精确解析回原值的最短文本
        let _ = writeln!(
            out,
            "        <tazRelation from=\"{}\" to=\"{}\" count=\"{}\"/>",
            escape(&r.from),
            escape(&r.to),
            r.demand
        );
    }
    out.push_str("    </interval>\n");
    out.push_str("</data>\n");
    out
}

/// 把 `matrix` 写到 `path`；相对路径以 `base_path` 为基准。
/// 返回实际写入的路径。
#[tracing::instrument(skip(matrix), fields(records = matrix.len()))]
pub fn serialize(
    matrix: &OdMatrix,
    path: &Path,
    duration_seconds: u64,
    base_path: &Path,
) -> Result<PathBuf> {
    let target = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_path.join(path)
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| CalibrationError::io(parent, e))?;
    }
    fs::write(&target, render(matrix, duration_seconds))
        .map_err(|e| CalibrationError::io(&target, e))?;
    debug!(path = %target.display(), total_demand = matrix.total_demand(), "💾 已写出 OD 文件");
    Ok(target)
}
