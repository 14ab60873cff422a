pub mod alerts;
pub mod pages;
pub mod upload;

pub use alerts::quick_shield;
pub use pages::index;
pub use upload::upload_recording;

use crate::health;
use crate::storage::StoragePaths;
use actix_web::web;

/// Register every route on an `App`.
///
/// Shared by the server and the handler tests so both see the same routing.
/// The static file service goes last because it claims every remaining path.
pub fn configure(cfg: &mut web::ServiceConfig, paths: &StoragePaths) {
    cfg.route("/upload", web::post().to(upload_recording))
        .route("/quick-shield", web::post().to(quick_shield))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics)),
        )
        .route("/health", web::get().to(health::health_check))
        .route("/", web::get().to(index))
        .service(pages::static_files(&paths.public));
}
