//! Root document and static assets from the public directory.

use crate::state::AppState;
use actix_files::{Files, NamedFile};
use actix_web::web;
use std::path::Path;

/// `GET /`: the configured index document (`final.html` by default).
pub async fn index(state: web::Data<AppState>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(&state.paths.index_document).await?)
}

/// Everything else under `/` is served as-is from `public`; unknown paths get a 404.
///
/// Must be registered after every other route since it matches all paths.
pub fn static_files(public: &Path) -> Files {
    Files::new("/", public)
}
