//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::ShortstatError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 3000-3099: 链接错误
/// - 6000-6099: 统计错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 链接错误 3000-3099
    LinkNotFound = 3000,
    AliasInUse = 3001,
    LinkInvalidInput = 3002,
    LinkStorageError = 3005,
    SuffixExhausted = 3007,

    // 统计错误 6000-6099
    StatsDecodeFailed = 6000,
    StatsExportFailed = 6001,
}

impl From<&ShortstatError> for ErrorCode {
    fn from(err: &ShortstatError) -> Self {
        match err {
            ShortstatError::InvalidInput(_) => ErrorCode::LinkInvalidInput,
            ShortstatError::AliasInUse(_) => ErrorCode::AliasInUse,
            ShortstatError::NotFound(_) => ErrorCode::LinkNotFound,
            ShortstatError::BackendUnavailable(_) | ShortstatError::Conflict(_) => {
                ErrorCode::ServiceUnavailable
            }
            ShortstatError::GenerationExhausted(_) => ErrorCode::SuffixExhausted,
            ShortstatError::Encoding(_) => ErrorCode::StatsDecodeFailed,
            ShortstatError::Serialization(_) => ErrorCode::LinkStorageError,
            ShortstatError::OutOfRangeValue(_) | ShortstatError::Config(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}
