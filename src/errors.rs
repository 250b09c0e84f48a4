use chrono::NaiveDate;
use thiserror::Error;
use std::num::ParseIntError;

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Parse int error: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// 向前回溯交易日时越出了日历支持的范围
    #[error("Trading calendar exhausted before {0}")]
    CalendarExhausted(NaiveDate),

    /// 日期不在日历支持的范围内，无法判断是否为交易日
    #[error("Trading calendar has no data for {0}")]
    CalendarUnknown(NaiveDate),

    #[error("Fetch error: {0}")]
    Fetch(String),

    /// 抓取所需的运行环境缺失，可尝试一次自动修复
    #[error("Fetch runtime missing: {0}")]
    RuntimeMissing(String),

    /// 页面中没有预期的内容容器，按“该页无数据”处理
    #[error("Expected content container absent: {0}")]
    ParseMiscategorized(String),

    /// 缓存文件无法解析，按“无任何覆盖”处理
    #[error("Cache document corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl BriefError {
    /// 是否值得对同一页面再次尝试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BriefError::Fetch(_) | BriefError::RequestError(_) | BriefError::RuntimeMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BriefError>;

// 用于从字符串创建错误
impl From<String> for BriefError {
    fn from(s: String) -> Self {
        BriefError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for BriefError {
    fn from(s: &str) -> Self {
        BriefError::Unknown(s.to_string())
    }
}
