use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use curator_core::{CuratorError, CuratorResult};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// 短于该长度的名称在正则中需要整词匹配
const MIN_UNANCHORED_NAME_LEN: usize = 2;

// 常量正则，编译必然成功
#[allow(clippy::expect_used)]
static NAMED_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\\])\(\?P?<[A-Za-z_][A-Za-z0-9_]*>")
        .expect("constant regex pattern is valid")
});

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CharacterEntry {
    name: Vec<String>,
    aliases: Vec<String>,
    regex: Vec<String>,
}

#[derive(Debug, Clone)]
struct Character {
    key: String,
    names: Vec<String>,
}

/// 角色名称映射
///
/// 数据集格式为 `{character_key: {name: [...], aliases: [...], regex: [...]}}`，
/// 以 `_` 开头的键视为元数据。`name` 的第一个元素是规范名称。
#[derive(Debug)]
pub struct NameMap {
    source: Option<PathBuf>,
    characters: Vec<Character>,
    /// 小写名称/别名 -> 角色下标
    lookup: HashMap<String, usize>,
    pattern: Option<Regex>,
    /// 合并正则中的分组名 -> 角色下标
    groups: Vec<(String, usize)>,
}

impl NameMap {
    /// 从磁盘加载数据集
    pub fn load(path: impl AsRef<Path>) -> CuratorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content, Some(path.to_path_buf()))
    }

    pub fn from_json_str(content: &str, source: Option<PathBuf>) -> CuratorResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        let mut name_map = Self::from_value(&value)?;
        name_map.source = source;
        Ok(name_map)
    }

    /// 由 JSON 值构建，无效条目被丢弃并记录警告
    pub fn from_value(value: &Value) -> CuratorResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CuratorError::NameMap("数据集顶层必须是对象".to_string()))?;

        let mut characters = Vec::new();
        let mut lookup = HashMap::new();
        let mut alternatives = Vec::new();

        for (key, raw) in object {
            if key.starts_with('_') {
                continue;
            }
            let entry = match validate_entry(key, raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("忽略无效的名称映射条目 {}: {}", key, e);
                    continue;
                }
            };

            let index = characters.len();
            for name in &entry.name {
                lookup.entry(name.to_lowercase()).or_insert(index);
            }
            for alias in &entry.aliases {
                lookup.entry(alias.to_lowercase()).or_insert(index);
            }

            if !entry.regex.is_empty() {
                let group = format!("c{index}");
                let mut parts: Vec<String> = entry
                    .name
                    .iter()
                    .map(|name| {
                        let escaped = regex::escape(name);
                        if name.chars().count() < MIN_UNANCHORED_NAME_LEN {
                            format!("^{escaped}$")
                        } else {
                            escaped
                        }
                    })
                    .collect();
                // 用户分组改为非捕获，避免与合并正则中的分组重名
                parts.extend(entry.regex.iter().map(|p| strip_group_names(p)));
                alternatives.push((format!("(?P<{group}>{})", parts.join("|")), group, index));
            }

            characters.push(Character {
                key: key.clone(),
                names: entry.name,
            });
        }

        let (pattern, groups) = build_pattern(alternatives, &characters);
        debug!(
            "名称映射构建完成: {} 个角色, {} 个正则分组",
            characters.len(),
            groups.len()
        );

        Ok(Self {
            source: None,
            characters,
            lookup,
            pattern,
            groups,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// 识别标签中出现的角色，按首次出现顺序返回角色键
    pub fn identify_characters<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() {
                continue;
            }

            if let Some(&index) = self.lookup.get(&tag.to_lowercase()) {
                if seen.insert(index) {
                    found.push(index);
                }
                continue;
            }

            let Some(pattern) = &self.pattern else {
                continue;
            };
            for captures in pattern.captures_iter(tag) {
                for (group, index) in &self.groups {
                    if captures.name(group).is_some() && seen.insert(*index) {
                        found.push(*index);
                    }
                }
            }
        }

        found
            .into_iter()
            .map(|index| self.characters[index].key.clone())
            .collect()
    }

    /// 角色的全部名称，未知角色返回空
    pub fn character_names(&self, key: &str) -> &[String] {
        self.characters
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.names.as_slice())
            .unwrap_or(&[])
    }

    /// 把识别出的角色格式化为 `#名称` 串，未识别到角色时返回原始标签
    pub fn filter_character_tags<S: AsRef<str>>(&self, tags: &[S]) -> String {
        let mut names: Vec<&str> = Vec::new();
        for key in self.identify_characters(tags) {
            for name in self.character_names(&key) {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }

        if names.is_empty() {
            format_hash_tags(tags)
        } else {
            format_hash_tags(&names)
        }
    }
}

/// 把标签列表格式化为 `#a #b`，空列表返回空串
pub fn format_hash_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 构建合并正则；整体编译失败时逐个加入，丢弃导致失败的角色分组
fn build_pattern(
    alternatives: Vec<(String, String, usize)>,
    characters: &[Character],
) -> (Option<Regex>, Vec<(String, usize)>) {
    if alternatives.is_empty() {
        return (None, Vec::new());
    }

    let all: Vec<&str> = alternatives.iter().map(|(alt, _, _)| alt.as_str()).collect();
    if let Ok(regex) = compile(&all) {
        let groups = alternatives
            .into_iter()
            .map(|(_, group, index)| (group, index))
            .collect();
        return (Some(regex), groups);
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut groups = Vec::new();
    let mut pattern = None;
    for (alternative, group, index) in &alternatives {
        kept.push(alternative);
        match compile(&kept) {
            Ok(regex) => {
                pattern = Some(regex);
                groups.push((group.clone(), *index));
            }
            Err(e) => {
                warn!(
                    "角色 {} 的正则无法合并，仅保留名称匹配: {}",
                    characters[*index].key, e
                );
                kept.pop();
            }
        }
    }
    (pattern, groups)
}

fn compile(alternatives: &[&str]) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .multi_line(true)
        .build()
}

fn strip_group_names(pattern: &str) -> String {
    // 两次替换处理相邻的分组，例如 `(?P<a>(?P<b>x))`
    let once = NAMED_GROUP.replace_all(pattern, "${1}(?:");
    NAMED_GROUP.replace_all(&once, "${1}(?:").into_owned()
}

fn validate_entry(key: &str, raw: &Value) -> CuratorResult<CharacterEntry> {
    let entry: CharacterEntry = serde_json::from_value(raw.clone())?;

    if entry.name.is_empty() || entry.name.iter().any(|n| n.trim().is_empty()) {
        return Err(CuratorError::NameMap(format!("角色 {key} 缺少有效名称")));
    }
    if entry.aliases.iter().any(|a| a.trim().is_empty()) {
        return Err(CuratorError::NameMap(format!("角色 {key} 含有空别名")));
    }
    for pattern in &entry.regex {
        Regex::new(pattern).map_err(|e| CuratorError::InvalidRegex {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }

    Ok(entry)
}
