//! 集合存储的键命名

/// 本次同步中站点返回的候选作品ID
pub fn candidates(workspace_id: i64, site_key: &str) -> String {
    format!("review:candidates:{workspace_id}:{site_key}")
}

/// 本次同步中已经建立审核记录的作品ID
pub fn known(workspace_id: i64, site_key: &str) -> String {
    format!("review:known:{workspace_id}:{site_key}")
}

/// 待审核的审核记录ID
pub fn pending_review(workspace_id: i64) -> String {
    format!("review:pending:{workspace_id}")
}

/// 待推送的审核记录ID
pub fn pending_push(workspace_id: i64) -> String {
    format!("push:pending:{workspace_id}")
}
