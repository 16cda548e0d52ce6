//! XML 辅助函数
//!
//! OD 读写与遥测解析共用的 `quick-xml` 小工具。

use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// 收集元素的全部属性（已反转义）
pub(crate) fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| err.to_string())?
            .into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

pub(crate) fn escape(raw: &str) -> String {
    quick_xml::escape::escape(raw).into_owned()
}
