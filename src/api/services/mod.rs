pub mod error_code;
pub mod helpers;
pub mod redirect;
pub mod shorten;
pub mod stats;
pub mod types;

pub use error_code::ErrorCode;
pub use redirect::RedirectService;
pub use shorten::ShortenService;
pub use stats::StatsService;
pub use types::{ApiResponse, LinkView, ShortenRequest, StatsFormat, StatsQuery, StatsView};

use actix_web::web;

/// 全部链接路由：创建、统计、跳转
pub fn link_routes() -> actix_web::Scope {
    web::scope("")
        .app_data(helpers::json_config())
        .route("/shorten", web::post().to(ShortenService::shorten))
        .route("/{token}/stats", web::get().to(StatsService::get_stats))
        .route("/{token}", web::get().to(RedirectService::handle_redirect))
        .route("/{token}", web::head().to(RedirectService::handle_redirect))
}
