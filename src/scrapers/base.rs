use crate::errors::{BriefError, Result};
use crate::models::cache::DateKey;
use crate::models::news::NewsItem;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// 列表页抓取器：给定列表页地址，返回该页上 日期 -> 文章链接 的映射
#[async_trait]
pub trait PageFetcher {
    /// Name used in logs
    fn source_name(&self) -> &'static str;

    /// Fetch one list page
    ///
    /// 页面上找不到列表容器时返回 `ParseMiscategorized`。
    async fn fetch(&self, locator: &str) -> Result<HashMap<DateKey, String>>;

    /// 抓取运行环境缺失时的一次性修复，默认无法修复
    async fn install_runtime(&self) -> Result<()> {
        Err(BriefError::RuntimeMissing(format!(
            "{} has no installable runtime",
            self.source_name()
        )))
    }
}

/// 从早餐文章页中找出财经日历图片
#[async_trait]
pub trait ImageExtractor {
    async fn extract(&self, page_url: &str) -> Result<Option<String>>;
}

/// 个股新闻来源
#[async_trait]
pub trait NewsSource {
    /// 写入缓存文件的 `method` 字段
    fn method(&self) -> &'static str;

    /// 写入缓存文件的 `query` 字段
    fn query(&self, _ticker: &str, _date: Option<NaiveDate>) -> Option<String> {
        None
    }

    async fn fetch_news(&self, ticker: &str, count: usize, date: Option<NaiveDate>) -> Result<Vec<NewsItem>>;
}
