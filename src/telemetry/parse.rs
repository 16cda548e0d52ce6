//! 遥测解析
//!
//! 支持两种仿真器计数输出。感应线圈输出把计数写在 interval 上：
//!
//! ```xml
//! <detector>
//!     <interval begin="0.00" end="1800.00" id="E1" nVehContrib="50" .../>
//! </detector>
//! ```
//!
//! 路段数据输出在 interval 内为每条路段嵌套一个元素：
//!
//! ```xml
//! <meandata>
//!     <interval begin="0.00" end="1800.00" id="edgeData">
//!         <edge id="E1" entered="50" .../>
//!     </interval>
//! </meandata>
//! ```

use super::record::EdgeRecord;
use crate::error::{CalibrationError, Result};
use crate::sim::TelemetryHandle;
use crate::xml::attributes;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::fs;
use tracing::debug;

const LOOP_COUNT_ATTR: &str = "nVehContrib";
const EDGE_COUNT_ATTR: &str = "entered";

/// 解析 `handle` 指向的遥测文件
#[tracing::instrument(skip(handle), fields(path = %handle.path().display()))]
pub fn extract_telemetry(handle: &TelemetryHandle) -> Result<Vec<EdgeRecord>> {
    let path = handle.path();
    let raw = fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
    let records = parse_telemetry(&raw).map_err(|reason| CalibrationError::format(path, reason))?;
    debug!(records = records.len(), "📊 已解析遥测");
    Ok(records)
}

/// 解析遥测文本。同一路段跨时间段的总数超出 u64 时报错。
pub fn parse_telemetry(raw: &str) -> std::result::Result<Vec<EdgeRecord>, String> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(true);

    let mut out = Vec::new();
    let mut totals: HashMap<String, u64> = HashMap::new();
    let mut interval_begin: Option<f64> = None;

    loop {
        let (e, is_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"interval" {
                    interval_begin = None;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                ));
            }
            Ok(_) => continue,
        };

        match e.name().as_ref() {
            b"interval" => {
                let attrs = attributes(&e)?;
                let begin = number(&attrs, "begin", "interval")?;
                if attrs.contains_key(LOOP_COUNT_ATTR) {
                    let id = text(&attrs, "id", "interval")?;
                    let count = count(&attrs, LOOP_COUNT_ATTR, "interval", id)?;
                    accumulate(&mut totals, id, count)?;
                    out.push(EdgeRecord::new(id, begin, count));
                }
                if !is_empty {
                    interval_begin = Some(begin);
                }
            }
            b"edge" => {
                let begin = interval_begin.ok_or("<edge> outside of an <interval>")?;
                let attrs = attributes(&e)?;
                let id = text(&attrs, "id", "edge")?;
                // 没有车流的路段可能不写计数
                let count = if attrs.contains_key(EDGE_COUNT_ATTR) {
                    count(&attrs, EDGE_COUNT_ATTR, "edge", id)?
                } else {
                    0
                };
                accumulate(&mut totals, id, count)?;
                out.push(EdgeRecord::new(id, begin, count));
            }
            _ => {}
        }
    }
    Ok(out)
}

fn text<'a>(
    attrs: &'a HashMap<String, String>,
    key: &str,
    tag: &str,
) -> std::result::Result<&'a str, String> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| format!("<{tag}> without `{key}`"))
}

fn number(
    attrs: &HashMap<String, String>,
    key: &str,
    tag: &str,
) -> std::result::Result<f64, String> {
    let raw = text(attrs, key, tag)?;
    raw.trim()
        .parse()
        .map_err(|_| format!("<{tag}> has non-numeric `{key}` {raw:?}"))
}

/// 计数必须是整数：接受 `"12.00"`，拒绝 `"-1"`、`"2.5"` 以及超出 u64 的值
fn count(
    attrs: &HashMap<String, String>,
    key: &str,
    tag: &str,
    edge: &str,
) -> std::result::Result<u64, String> {
    let raw = text(attrs, key, tag)?.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        // u64::MAX as f64 == 2^64，本身已越界
        Ok(x) if x >= 0.0 && x < u64::MAX as f64 && x.fract() == 0.0 => Ok(x as u64),
        _ => Err(format!("<{tag}> {edge} has invalid `{key}` {raw:?}")),
    }
}

fn accumulate(
    totals: &mut HashMap<String, u64>,
    edge: &str,
    count: u64,
) -> std::result::Result<(), String> {
    let total = totals.entry(edge.to_string()).or_default();
    *total = total
        .checked_add(count)
        .ok_or_else(|| format!("edge {edge} total count overflows u64"))?;
    Ok(())
}
