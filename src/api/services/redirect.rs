use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, error, trace};

use crate::errors::ShortstatError;
use crate::services::LinkResolver;

pub struct RedirectService;

impl RedirectService {
    /// `GET /{token}`：后缀优先，其次别名
    pub async fn handle_redirect(
        path: web::Path<String>,
        resolver: web::Data<Arc<LinkResolver>>,
    ) -> impl Responder {
        let token = path.into_inner();

        match resolver.resolve(&token).await {
            Ok(url) => {
                trace!("Redirect {} -> {}", token, url);
                HttpResponse::Found()
                    .insert_header(("Location", url))
                    .finish()
            }
            Err(ShortstatError::NotFound(_)) => {
                debug!("Redirect token not found: {}", token);
                Self::not_found_response()
            }
            Err(e) if e.is_retryable() => {
                error!("Backend error during redirect of {}: {}", token, e);
                Self::plain_response(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
            }
            Err(e) => {
                error!("Redirect of {} failed: {}", token, e);
                Self::plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }

    #[inline]
    fn plain_response(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body(body)
    }
}
