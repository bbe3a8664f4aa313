//! Page and answer fixtures

use serde_json::{Value, json};

/// Field selection used by every test crawl
pub const INCLUDE_TXT: &str = "# answer fields\n\
data[*].is_normal,admin_closed_comment,\n\
content,   # answer body\n\
voteup_count\n";

/// Value the selection above collapses to
pub const INCLUDE_VALUE: &str = "data[*].is_normal,admin_closed_comment,content,voteup_count";

/// Question page reporting `answer_count` answers
pub fn question_page(title: &str, answer_count: usize) -> String {
    format!(
        r#"<!doctype html>
<html lang="zh"><head><meta charset="utf-8"/>
<title data-rh="true">{title} - 知乎</title>
<meta itemProp="answerCount" content="{answer_count}"/>
<meta itemProp="dateCreated" content="2021-12-01T10:00:00.000Z"/>
</head><body><div id="root"></div></body></html>"#
    )
}

/// Question page without an answer count
pub fn page_without_count(title: &str) -> String {
    format!("<html><head><title>{title} - 知乎</title></head><body></body></html>")
}

/// ID of the answer at `index`
pub fn answer_id(index: usize) -> u64 {
    5000 + index as u64
}

/// Whether the answer at `index` carries images
pub fn has_images(index: usize) -> bool {
    index % 3 == 0
}

/// Image URLs of the answer at `index`, served by `base`
pub fn image_urls(base: &str, index: usize) -> Vec<String> {
    if !has_images(index) {
        return Vec::new();
    }
    vec![
        format!("{base}/pics/v2-{index}-a_r.jpg?source=1940ef5c"),
        format!("{base}/pics/v2-{index}-b_r.png"),
    ]
}

/// Answer record at `index`; image markup is repeated to exercise dedup
pub fn answer(base: &str, index: usize) -> Value {
    let mut content = format!("<p>answer number {index}</p>");
    for url in image_urls(base, index) {
        let tag = format!(
            r#"<figure><img src="data:image/svg+xml;utf8,&lt;svg/&gt;" data-rawwidth="600" data-original="{url}"/></figure>"#
        );
        content.push_str(&tag);
        content.push_str(&tag);
    }
    json!({
        "id": answer_id(index),
        "type": "answer",
        "voteup_count": index * 7,
        "content": content,
    })
}

/// One page of the answers API
pub fn answers_page(base: &str, offset: usize, limit: usize, total: usize) -> Value {
    let end = (offset + limit).min(total);
    let data: Vec<Value> = (offset..end).map(|i| answer(base, i)).collect();
    json!({
        "data": data,
        "paging": {"is_end": end >= total, "totals": total},
    })
}
