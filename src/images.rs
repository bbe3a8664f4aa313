//! Image reference extraction from answer HTML.
//!
//! Answer bodies embed images as `<img src="placeholder" ... data-original="URL">`.
//! The `src` is a low-resolution placeholder; `data-original` carries the
//! full-size source, which is what gets downloaded.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::Answer;

#[allow(clippy::expect_used)]
static DATA_ORIGINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<img src=.*?data-original="(.*?)""#).expect("image pattern is valid")
});

/// An image to download for one answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    /// Owning answer
    pub answer_id: String,
    /// Full-size source URL
    pub url: String,
    /// File name derived from the URL
    pub file_name: String,
}

/// Distinct `data-original` URLs in `content`, in order of first appearance.
///
/// Deduplication is by exact string; URLs differing only in their query are
/// kept apart.
pub fn extract_image_urls(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    DATA_ORIGINAL
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|url| !url.is_empty() && seen.insert(*url))
        .map(str::to_string)
        .collect()
}

/// Whether `name` can be joined onto a directory without leaving it
pub fn is_safe_component(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\\'])
}

/// File name for an image URL: its last path segment without the query.
///
/// `https://pic.example.com/v2/abc123.jpg?source=xyz` becomes `abc123.jpg`.
/// Returns `None` when the URL ends in `/` or the segment is not a usable
/// file name.
pub fn image_file_name(url: &str) -> Option<String> {
    let last = url.rsplit('/').next().unwrap_or(url);
    let name = last.split('?').next().unwrap_or(last);
    is_safe_component(name).then(|| name.to_string())
}

/// Images to fetch for `answer`.
///
/// Answers without an id or content yield nothing, as do answers whose id
/// is not usable as a directory name. URLs that do not produce a file name
/// are logged and dropped. When several URLs map to the same file name only
/// the last one is kept, in the position of its first appearance.
pub fn image_refs(answer: &Answer) -> Vec<ImageRef> {
    let (Some(answer_id), Some(content)) = (answer.id(), answer.content()) else {
        return Vec::new();
    };
    if !is_safe_component(&answer_id) {
        tracing::warn!(answer_id = %answer_id, "answer id is not a usable directory name, skipping its images");
        return Vec::new();
    }

    let mut refs: Vec<ImageRef> = Vec::new();
    for url in extract_image_urls(content) {
        let Some(file_name) = image_file_name(&url) else {
            tracing::warn!(answer_id = %answer_id, url = %url, "cannot derive file name from image URL");
            continue;
        };
        match refs.iter_mut().find(|r| r.file_name == file_name) {
            Some(existing) => {
                tracing::debug!(answer_id = %answer_id, file_name = %file_name, replaced = %existing.url, url = %url, "image file name collision, keeping later URL");
                existing.url = url;
            }
            None => refs.push(ImageRef {
                answer_id: answer_id.clone(),
                url,
                file_name,
            }),
        }
    }
    refs
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TWO_IMAGES: &str = r#"<p>intro</p>
<figure><noscript><img src="https://pic1.example.com/50/v2-aaa_hd.jpg" data-rawwidth="600"/></noscript>
<img src="data:image/svg+xml;utf8,&lt;svg/&gt;" data-rawwidth="600" data-original="https://pic1.example.com/v2-aaa_r.jpg?source=1940ef5c"/></figure>
<p>middle</p>
<figure><img src="data:image/svg+xml;utf8,&lt;svg/&gt;"
  data-original="https://pic2.example.com/v2-bbb_r.png"/></figure>"#;

    #[test]
    fn extracts_data_original_not_placeholder() {
        let urls = extract_image_urls(TWO_IMAGES);
        assert_eq!(
            urls,
            vec![
                "https://pic1.example.com/v2-aaa_r.jpg?source=1940ef5c".to_string(),
                "https://pic2.example.com/v2-bbb_r.png".to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_markup_yields_one_url() {
        let tag = r#"<img src="p.svg" data-original="https://pic.example.com/v2/abc123.jpg"/>"#;
        let content = format!("{tag}<br/>{tag}<br/>{tag}");
        assert_eq!(
            extract_image_urls(&content),
            vec!["https://pic.example.com/v2/abc123.jpg".to_string()]
        );
    }

    #[test]
    fn query_variants_stay_distinct() {
        let content = r#"<img src="p" data-original="https://pic/a.jpg?x=1"/>
<img src="p" data-original="https://pic/a.jpg?x=2"/>"#;
        assert_eq!(extract_image_urls(content).len(), 2);
    }

    #[test]
    fn content_without_markup_yields_nothing() {
        assert!(extract_image_urls("<p>just words</p>").is_empty());
        assert!(extract_image_urls(r#"<img src="https://pic/only-src.jpg"/>"#).is_empty());
    }

    #[test]
    fn file_name_drops_path_and_query() {
        assert_eq!(
            image_file_name("https://pic.example.com/v2/abc123.jpg?source=xyz").as_deref(),
            Some("abc123.jpg")
        );
        assert_eq!(
            image_file_name("https://pic.example.com/v2-bbb_r.png").as_deref(),
            Some("v2-bbb_r.png")
        );
    }

    #[test]
    fn file_name_rejects_directory_urls() {
        assert_eq!(image_file_name("https://pic.example.com/v2/"), None);
        assert_eq!(image_file_name("https://pic.example.com/v2/?a=b"), None);
        assert_eq!(image_file_name("https://pic.example.com/.."), None);
    }

    #[test]
    fn refs_carry_answer_id_and_file_name() {
        let answer: Answer = serde_json::from_value(json!({
            "id": 987654321u64,
            "content": TWO_IMAGES,
        }))
        .unwrap();
        let refs = image_refs(&answer);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.answer_id == "987654321"));
        assert_eq!(refs[0].file_name, "v2-aaa_r.jpg");
        assert_eq!(refs[1].file_name, "v2-bbb_r.png");
    }

    #[test]
    fn unsafe_answer_ids_yield_no_refs() {
        let image = r#"<img src="p" data-original="https://pic/x.jpg"/>"#;
        for id in ["../../../escaped", "..", ".", "a/b", r"a\b", ""] {
            let answer: Answer = serde_json::from_value(json!({"id": id, "content": image})).unwrap();
            assert!(image_refs(&answer).is_empty(), "id {id:?} should be rejected");
        }
    }

    #[test]
    fn same_file_name_keeps_last_url() {
        let content = (0..4)
            .map(|v| format!(r#"<img src="p" data-original="https://pic/x.jpg?v={v}"/>"#))
            .collect::<String>()
            + r#"<img src="p" data-original="https://pic/y.jpg"/>"#;
        let answer: Answer = serde_json::from_value(json!({"id": 7, "content": content})).unwrap();
        let refs = image_refs(&answer);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].file_name, "x.jpg");
        assert_eq!(refs[0].url, "https://pic/x.jpg?v=3");
        assert_eq!(refs[1].file_name, "y.jpg");
    }

    #[test]
    fn refs_skip_answers_missing_fields() {
        let no_content: Answer = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(image_refs(&no_content).is_empty());
        let no_id: Answer =
            serde_json::from_value(json!({"content": r#"<img src="p" data-original="https://pic/a.jpg"/>"#}))
                .unwrap();
        assert!(image_refs(&no_id).is_empty());
    }
}
