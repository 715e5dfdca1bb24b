//! 数据库行与字段映射的公共工具

use std::str::FromStr;

use curator_core::{CuratorError, CuratorResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub struct MappingHelpers;

impl MappingHelpers {
    /// 解析以文本存储的枚举字段
    pub fn parse_enum<T>(row: &SqliteRow, field_name: &str) -> CuratorResult<T>
    where
        T: FromStr<Err = CuratorError>,
    {
        let raw: String = row.try_get(field_name)?;
        raw.parse()
    }

    /// 解析以JSON文本存储的对象字段，空值视为空对象
    pub fn parse_json_object(
        row: &SqliteRow,
        field_name: &str,
    ) -> CuratorResult<serde_json::Map<String, serde_json::Value>> {
        let raw: Option<String> = row.try_get(field_name)?;
        match raw.as_deref() {
            None | Some("") => Ok(serde_json::Map::new()),
            Some(text) => serde_json::from_str(text).map_err(|e| {
                CuratorError::Serialization(format!("解析字段 {field_name} 失败: {e}"))
            }),
        }
    }

    pub fn parse_string_list(row: &SqliteRow, field_name: &str) -> CuratorResult<Vec<String>> {
        let raw: String = row.try_get(field_name)?;
        serde_json::from_str(&raw)
            .map_err(|e| CuratorError::Serialization(format!("解析字段 {field_name} 失败: {e}")))
    }

    /// 生成 `?1, ?2, ...` 形式的占位符
    pub fn placeholders(count: usize, start: usize) -> String {
        (start..start + count)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::MappingHelpers;

    #[test]
    fn test_placeholders() {
        assert_eq!(MappingHelpers::placeholders(3, 2), "?2, ?3, ?4");
        assert_eq!(MappingHelpers::placeholders(0, 1), "");
    }
}
