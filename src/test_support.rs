//! Helpers shared by the handler tests.

use crate::config::AppConfig;
use crate::state::AppState;
use actix_web::test::TestRequest;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----QuickShieldTestBoundary7MA4YWxk";

/// Build a full application around `state`, routed exactly like the server.
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(|cfg| crate::handlers::configure(cfg, &$state.paths)),
        )
        .await
    };
}
pub(crate) use init_app;

/// State rooted in a fresh temporary directory with storage created and a
/// small public site in place. Keep the `TempDir` alive for the test.
pub fn temp_state() -> (TempDir, AppState) {
    let root = tempfile::tempdir().expect("create temp dir");
    let mut config = AppConfig::default();
    config.storage.base_dir = root.path().to_path_buf();

    let state = AppState::new(config);
    state.paths.ensure_dirs().expect("create storage dirs");

    std::fs::create_dir_all(&state.paths.public).expect("create public dir");
    std::fs::write(
        &state.paths.index_document,
        "<!doctype html><title>Quick Shield</title>",
    )
    .expect("write index");
    std::fs::write(state.paths.public.join("app.js"), "console.log('shield');").expect("write asset");

    (root, state)
}

/// One part of a multipart/form-data body.
pub struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// `POST /upload` carrying `parts`.
pub fn multipart_request(parts: &[Part<'_>]) -> TestRequest {
    TestRequest::post()
        .uri("/upload")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}
