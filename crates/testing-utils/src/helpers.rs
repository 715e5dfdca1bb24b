//! 测试辅助函数

use std::path::{Path, PathBuf};

/// 在临时目录下写入名称映射数据集，返回文件路径
pub fn write_name_map(dir: &Path, relative: &str, content: &serde_json::Value) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, serde_json::to_vec_pretty(content).unwrap()).unwrap();
    path
}

/// 创建包含 `name_map` 子目录的临时数据集根目录
pub fn name_map_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("name_map")).unwrap();
    dir
}
