//! Mock Q&A site built on wiremock

use std::path::Path;

use answer_dl::{AnswerLimit, Config};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{INCLUDE_TXT, INCLUDE_VALUE, answers_page, question_page};

/// Bytes served for every image
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image body";

/// Mount a question page, its answer windows, and the image host
pub async fn mount_question(server: &MockServer, id: &str, total: usize, page_size: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/question/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_page("Sample question", total)))
        .mount(server)
        .await;

    let referer = format!("{}/question/{id}", server.uri());
    let mut offset = 0;
    while offset < total {
        let limit = page_size.min(total - offset);
        Mock::given(method("GET"))
            .and(path(format!("/api/v4/questions/{id}/answers")))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", limit.to_string()))
            .and(query_param("include", INCLUDE_VALUE))
            .and(query_param("platform", "desktop"))
            .and(query_param("sort_by", "default"))
            .and(header("referer", referer.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(answers_page(&server.uri(), offset, limit, total)),
            )
            .mount(server)
            .await;
        offset += limit;
    }

    mount_images(server).await;
}

/// Serve every `/pics/...` request
pub async fn mount_images(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/pics/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
        .mount(server)
        .await;
}

/// Config pointed at `server`, writing under `root`, with the include file in place
pub fn test_config(server: &MockServer, root: &Path, ids: &[&str]) -> Config {
    let include_file = root.join("include.txt");
    std::fs::write(&include_file, INCLUDE_TXT).expect("write include file");

    let mut config = Config::default();
    config.question_ids = ids.iter().map(|id| (*id).into()).collect();
    config.download.data_dir = root.join("data");
    config.download.include_file = include_file;
    config.download.answer_limit = AnswerLimit::Unbounded;
    config.download.answer_pause = std::time::Duration::ZERO;
    config.site.base_url = server.uri();
    config.log_file = root.join("logger.log");
    config
}

/// Number of requests the server has seen so far
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}
