//! 推送消息的说明文字，使用 Telegram HTML 格式

use curator_core::{AutoReviewDecision, Artwork};

/// 转义 HTML 特殊字符
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 频道消息
pub fn channel_caption(artwork: &Artwork, formatted_tags: &str) -> String {
    format!(
        "Title: {}\nTag: {}\nFrom <a href='{}'>{}</a> By <a href='{}'>{}</a>",
        escape_html(&artwork.title),
        escape_html(formatted_tags),
        escape_html(&artwork.url),
        escape_html(&artwork.site_name),
        escape_html(&artwork.author.url),
        escape_html(&artwork.author.name),
    )
}

pub fn decision_label(decision: AutoReviewDecision) -> &'static str {
    match decision {
        AutoReviewDecision::Pass => "自动审核通过",
        AutoReviewDecision::Reject => "自动审核拒绝",
    }
}

/// 同步给管理员的消息，附带审核结论与记录ID
pub fn owner_caption(
    artwork: &Artwork,
    formatted_tags: &str,
    decision: AutoReviewDecision,
    review_id: i64,
    workspace_id: i64,
) -> String {
    format!(
        "[{}]\n{}\nReview ID: {} | Work ID: {}",
        decision_label(decision),
        channel_caption(artwork, formatted_tags),
        review_id,
        workspace_id
    )
}

/// 管理员消息之后的提示文字
pub fn owner_notice(decision: AutoReviewDecision, review_id: i64) -> String {
    format!(
        "当前作品已经{}\n撤销请对记录 {} 执行撤回",
        decision_label(decision),
        review_id
    )
}
