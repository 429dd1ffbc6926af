use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use tracing::error;

use crate::services::{LinkResolver, distribution_csv};

use super::error_code::ErrorCode;
use super::helpers::{error_from_shortstat, error_response, success_response};
use super::types::{StatsFormat, StatsQuery, StatsView};

pub struct StatsService;

impl StatsService {
    /// `GET /{token}/stats[?format=csv]`
    pub async fn get_stats(
        path: web::Path<String>,
        query: web::Query<StatsQuery>,
        resolver: web::Data<Arc<LinkResolver>>,
    ) -> impl Responder {
        let token = path.into_inner();
        let stats = match resolver.stats(&token).await {
            Ok(stats) => stats,
            Err(e) => return error_from_shortstat(&e),
        };

        match query.format {
            StatsFormat::Json => success_response(StatsView::from(&stats)),
            StatsFormat::Csv => match distribution_csv(stats.distribution()) {
                Ok(body) => HttpResponse::Ok()
                    .insert_header(("Content-Type", "text/csv; charset=utf-8"))
                    .insert_header((
                        "Content-Disposition",
                        format!("attachment; filename=\"{}-visits.csv\"", stats.suffix),
                    ))
                    .body(body),
                Err(e) => {
                    error!("CSV export for {} failed: {}", stats.suffix, e);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::StatsExportFailed,
                        e.message(),
                    )
                }
            },
        }
    }
}
