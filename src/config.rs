use chrono::NaiveDate;
use std::path::PathBuf;

/// 列表页的排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// 第1页是最早的条目
    OldestFirst,
    /// 第1页是最新的条目（东方财富栏目页的实际顺序）
    NewestFirst,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub cache_dir: PathBuf,
    pub news_cache_dir: PathBuf,
    pub page_size: u32,
    pub epoch: NaiveDate,
    pub cutoff_hour: u32,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub image_delay_min_ms: u64,
    pub image_delay_max_ms: u64,
    pub max_retries: u32,
    pub listing_order: ListingOrder,
    pub list_base_url: String,
    pub title_keyword: String,
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self {
            cache_dir: PathBuf::from("cache/news/eastmoney_breakfast"),
            news_cache_dir: PathBuf::from("cache/news/stock_news"),
            page_size: 20,
            // 2022-11-02 之前栏目无数据
            epoch: NaiveDate::from_ymd_opt(2022, 11, 2).unwrap_or_default(),
            cutoff_hour: 10,
            delay_min_ms: 2000,
            delay_max_ms: 5000,
            image_delay_min_ms: 1000,
            image_delay_max_ms: 3000,
            max_retries: 3,
            listing_order: ListingOrder::NewestFirst,
            list_base_url: "https://stock.eastmoney.com/a/czpnc".to_string(),
            title_keyword: "财经早餐".to_string(),
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_news_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.news_cache_dir = dir.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_cutoff_hour(mut self, hour: u32) -> Self {
        self.cutoff_hour = hour.min(23);
        self
    }

    /// 列表页之间的随机等待区间（毫秒）
    pub fn with_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay_min_ms = min_ms.min(max_ms);
        self.delay_max_ms = max_ms.max(min_ms);
        self
    }

    /// 文章页之间的随机等待区间（毫秒）
    pub fn with_image_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.image_delay_min_ms = min_ms.min(max_ms);
        self.image_delay_max_ms = max_ms.max(min_ms);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_listing_order(mut self, order: ListingOrder) -> Self {
        self.listing_order = order;
        self
    }

    pub fn with_list_base_url(mut self, url: &str) -> Self {
        self.list_base_url = url.trim_end_matches(".html").to_string();
        self
    }

    pub fn with_title_keyword(mut self, keyword: &str) -> Self {
        self.title_keyword = keyword.to_string();
        self
    }

    /// 列表页链接缓存 `{"end_date", "urls"}`
    pub fn urls_path(&self) -> PathBuf {
        self.cache_dir.join("urls_of_em.json")
    }

    /// 日期 -> 早餐文章链接
    pub fn breakfast_path(&self) -> PathBuf {
        self.cache_dir.join("breakfast.json")
    }

    /// 日期 -> 财经日历图片链接
    pub fn calendar_pic_path(&self) -> PathBuf {
        self.cache_dir.join("calendar_pic_url.json")
    }

    pub fn news_path(&self, ticker: &str, date: &str) -> PathBuf {
        self.news_cache_dir
            .join(ticker)
            .join(format!("{}_news_{}.json", ticker, date))
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::new()
    }
}
