use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 单条新闻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_time: Option<String>,
}

/// 按日期缓存的个股新闻文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsCacheEntry {
    pub date: String,
    pub method: String,
    pub query: Option<String>,
    pub news: Vec<NewsItem>,
    #[serde(default)]
    pub cached_count: usize,
    #[serde(default)]
    pub news_count: usize,
    #[serde(default)]
    pub total_count: usize,
    pub last_updated: NaiveDateTime,
}

impl NewsCacheEntry {
    /// 历史日期的缓存永久有效；当日的缓存只在当日写入时有效
    pub fn is_valid(&self, historical: bool, today: NaiveDate) -> bool {
        historical || self.last_updated.date() == today
    }
}
