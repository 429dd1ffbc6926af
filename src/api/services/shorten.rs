use std::sync::Arc;

use actix_web::{Responder, web};
use tracing::{info, instrument};

use crate::services::LinkResolver;

use super::helpers::api_result;
use super::types::{LinkView, ShortenRequest};

pub struct ShortenService;

impl ShortenService {
    /// `POST /shorten`
    #[instrument(skip_all, fields(url = %payload.url))]
    pub async fn shorten(
        resolver: web::Data<Arc<LinkResolver>>,
        payload: web::Json<ShortenRequest>,
    ) -> impl Responder {
        let ShortenRequest { url, custom_suffix } = payload.into_inner();
        let result = resolver
            .create_or_fetch(&url, custom_suffix.as_deref())
            .await
            .map(LinkView::from);

        if let Ok(view) = &result {
            info!("Shorten {} -> {}", view.original_url, view.suffix);
        }
        api_result(result)
    }
}
