use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortstatError {
    InvalidInput(String),
    AliasInUse(String),
    NotFound(String),
    BackendUnavailable(String),
    OutOfRangeValue(String),
    Encoding(String),
    Serialization(String),
    Conflict(String),
    GenerationExhausted(String),
    Config(String),
}

impl ShortstatError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortstatError::InvalidInput(_) => "E001",
            ShortstatError::AliasInUse(_) => "E002",
            ShortstatError::NotFound(_) => "E003",
            ShortstatError::BackendUnavailable(_) => "E004",
            ShortstatError::OutOfRangeValue(_) => "E005",
            ShortstatError::Encoding(_) => "E006",
            ShortstatError::Serialization(_) => "E007",
            ShortstatError::Conflict(_) => "E008",
            ShortstatError::GenerationExhausted(_) => "E009",
            ShortstatError::Config(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortstatError::InvalidInput(_) => "Invalid Input",
            ShortstatError::AliasInUse(_) => "Alias In Use",
            ShortstatError::NotFound(_) => "Resource Not Found",
            ShortstatError::BackendUnavailable(_) => "Backend Unavailable",
            ShortstatError::OutOfRangeValue(_) => "Value Out Of Range",
            ShortstatError::Encoding(_) => "Histogram Encoding Error",
            ShortstatError::Serialization(_) => "Serialization Error",
            ShortstatError::Conflict(_) => "Concurrent Update Conflict",
            ShortstatError::GenerationExhausted(_) => "Suffix Generation Exhausted",
            ShortstatError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortstatError::InvalidInput(msg)
            | ShortstatError::AliasInUse(msg)
            | ShortstatError::NotFound(msg)
            | ShortstatError::BackendUnavailable(msg)
            | ShortstatError::OutOfRangeValue(msg)
            | ShortstatError::Encoding(msg)
            | ShortstatError::Serialization(msg)
            | ShortstatError::Conflict(msg)
            | ShortstatError::GenerationExhausted(msg)
            | ShortstatError::Config(msg) => msg,
        }
    }

    /// Whether the whole operation may be safely retried by the caller.
    ///
    /// All backend writes are conditional or idempotent, so transient backend
    /// failures and lost optimistic races are retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShortstatError::BackendUnavailable(_) | ShortstatError::Conflict(_)
        )
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortstatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortstatError {}

// 便捷的构造函数
impl ShortstatError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        ShortstatError::InvalidInput(msg.into())
    }

    pub fn alias_in_use<T: Into<String>>(msg: T) -> Self {
        ShortstatError::AliasInUse(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortstatError::NotFound(msg.into())
    }

    pub fn backend_unavailable<T: Into<String>>(msg: T) -> Self {
        ShortstatError::BackendUnavailable(msg.into())
    }

    pub fn out_of_range<T: Into<String>>(msg: T) -> Self {
        ShortstatError::OutOfRangeValue(msg.into())
    }

    pub fn encoding<T: Into<String>>(msg: T) -> Self {
        ShortstatError::Encoding(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortstatError::Serialization(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        ShortstatError::Conflict(msg.into())
    }

    pub fn generation_exhausted<T: Into<String>>(msg: T) -> Self {
        ShortstatError::GenerationExhausted(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShortstatError::Config(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<redis::RedisError> for ShortstatError {
    fn from(err: redis::RedisError) -> Self {
        ShortstatError::BackendUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for ShortstatError {
    fn from(err: std::io::Error) -> Self {
        ShortstatError::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for ShortstatError {
    fn from(err: serde_json::Error) -> Self {
        ShortstatError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for ShortstatError {
    fn from(err: base64::DecodeError) -> Self {
        ShortstatError::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortstatError>;
