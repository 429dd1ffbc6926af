//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::error::InternalError;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::{error, trace};

use crate::errors::ShortstatError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// HTTP status for a domain error
pub fn http_status(err: &ShortstatError) -> StatusCode {
    match err {
        ShortstatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ShortstatError::AliasInUse(_) => StatusCode::CONFLICT,
        ShortstatError::NotFound(_) => StatusCode::NOT_FOUND,
        ShortstatError::BackendUnavailable(_)
        | ShortstatError::Conflict(_)
        | ShortstatError::GenerationExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
        ShortstatError::OutOfRangeValue(_)
        | ShortstatError::Encoding(_)
        | ShortstatError::Serialization(_)
        | ShortstatError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 从 ShortstatError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_shortstat(err: &ShortstatError) -> HttpResponse {
    let status = http_status(err);
    if status.is_server_error() {
        error!("{}", err.format_simple());
    } else {
        trace!("{}", err.format_simple());
    }
    error_response(status, ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: crate::errors::Result<T>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_shortstat(&e),
    }
}

/// 请求体解析失败时也返回统一格式
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req: &HttpRequest| {
            let response =
                error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &err.to_string());
            InternalError::from_response(err, response).into()
        })
}
