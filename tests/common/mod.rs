#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use morning_brief::models::news::NewsItem;
use morning_brief::scrapers::base::{ImageExtractor, NewsSource, PageFetcher};
use morning_brief::{BriefError, CrawlConfig, DateKey, Result, TradingCalendar};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const BASE_URL: &str = "https://stock.eastmoney.com/a/czpnc";
pub const PAGE_SIZE: u32 = 5;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

pub fn epoch() -> NaiveDate {
    d(2024, 1, 2)
}

pub fn config(dir: &Path) -> CrawlConfig {
    CrawlConfig::new()
        .with_cache_dir(dir.join("breakfast"))
        .with_news_cache_dir(dir.join("news"))
        .with_epoch(epoch())
        .with_page_size(PAGE_SIZE)
        .with_delay_range(0, 0)
        .with_image_delay_range(0, 0)
}

pub fn article_url(date: NaiveDate) -> String {
    format!("https://finance.eastmoney.com/a/{}.html", date.format("%Y%m%d"))
}

/// 模拟的栏目列表：从 epoch 到 `published_end` 的每个交易日一条，最新的在第1页
pub struct MockListingSite {
    published_end: Mutex<NaiveDate>,
    failing_pages: Mutex<HashSet<u32>>,
    runtime_missing: AtomicBool,
    installable: bool,
    installs: AtomicUsize,
    requests: Mutex<Vec<u32>>,
}

impl MockListingSite {
    pub fn new(published_end: NaiveDate) -> Self {
        Self {
            published_end: Mutex::new(published_end),
            failing_pages: Mutex::new(HashSet::new()),
            runtime_missing: AtomicBool::new(false),
            installable: true,
            installs: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn without_runtime(mut self, installable: bool) -> Self {
        self.runtime_missing = AtomicBool::new(true);
        self.installable = installable;
        self
    }

    pub fn publish_through(&self, date: NaiveDate) {
        *self.published_end.lock().unwrap() = date;
    }

    pub fn fail_page(&self, page: u32) {
        self.failing_pages.lock().unwrap().insert(page);
    }

    pub fn heal(&self) {
        self.failing_pages.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reset_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// 最新的在前
    pub fn listing(&self) -> Vec<NaiveDate> {
        let end = *self.published_end.lock().unwrap();
        let mut days: Vec<_> = TradingCalendar::a_share().trading_days(epoch(), end).collect();
        days.reverse();
        days
    }

    pub fn page_count(&self) -> u32 {
        let total = self.listing().len() as u32;
        total.div_ceil(PAGE_SIZE).max(1)
    }
}

fn page_number(locator: &str) -> u32 {
    let stem = locator.trim_end_matches(".html");
    match stem.strip_prefix(BASE_URL).and_then(|rest| rest.strip_prefix('_')) {
        Some(n) => n.parse().unwrap(),
        None => 1,
    }
}

#[async_trait]
impl PageFetcher for MockListingSite {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, locator: &str) -> Result<HashMap<DateKey, String>> {
        if self.runtime_missing.load(Ordering::SeqCst) {
            return Err(BriefError::RuntimeMissing("browser not installed".into()));
        }

        let page = page_number(locator);
        self.requests.lock().unwrap().push(page);
        if self.failing_pages.lock().unwrap().contains(&page) {
            return Err(BriefError::Fetch(format!("{}: HTTP status 502", locator)));
        }

        let start = ((page - 1) * PAGE_SIZE) as usize;
        Ok(self
            .listing()
            .into_iter()
            .skip(start)
            .take(PAGE_SIZE as usize)
            .map(|date| (DateKey::from_date(date), article_url(date)))
            .collect())
    }

    async fn install_runtime(&self) -> Result<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        if !self.installable {
            return Err(BriefError::RuntimeMissing("install failed".into()));
        }
        self.runtime_missing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// 文章页 -> 日历图片；列在 `broken` 里的页面返回错误
pub struct MockImages {
    broken: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockImages {
    pub fn new() -> Self {
        Self {
            broken: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn break_page(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }

    pub fn heal(&self) {
        self.broken.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn image_for(page_url: &str) -> String {
        page_url.replace("/a/", "/pic/").replace(".html", ".png")
    }
}

#[async_trait]
impl ImageExtractor for MockImages {
    async fn extract(&self, page_url: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(page_url.to_string());
        if self.broken.lock().unwrap().contains(page_url) {
            return Err(BriefError::Fetch(format!("{}: timed out", page_url)));
        }
        Ok(Some(Self::image_for(page_url)))
    }
}

pub fn news_item(title: &str, publish_time: &str) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        content: format!("{}，正文内容超过十个字符。", title),
        publish_time: Some(publish_time.to_string()),
        source: "证券时报".to_string(),
        url: format!("https://finance.eastmoney.com/a/{}.html", title.len()),
        keyword: "300059".to_string(),
        search_time: None,
    }
}

pub enum Behavior {
    Items(Vec<NewsItem>),
    Empty,
    Fail,
}

pub struct MockNewsSource {
    method: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
    last_count: AtomicUsize,
}

impl MockNewsSource {
    pub fn new(method: &'static str, behavior: Behavior) -> Self {
        Self {
            method,
            behavior,
            calls: AtomicUsize::new(0),
            last_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_count(&self) -> usize {
        self.last_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    fn method(&self) -> &'static str {
        self.method
    }

    fn query(&self, ticker: &str, _date: Option<NaiveDate>) -> Option<String> {
        (self.method == "online_search").then(|| format!("{} 股票 新闻", ticker))
    }

    async fn fetch_news(&self, _ticker: &str, count: usize, _date: Option<NaiveDate>) -> Result<Vec<NewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_count.store(count, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Items(items) => Ok(items.iter().take(count).cloned().collect()),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fail => Err(BriefError::Fetch("search api unavailable".into())),
        }
    }
}
