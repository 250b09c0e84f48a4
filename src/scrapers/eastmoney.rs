use crate::errors::{BriefError, Result};
use crate::models::cache::DateKey;
use crate::scrapers::base::PageFetcher;
use crate::scrapers::{build_client, get_text, selector};
use crate::util;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const ARTICLE_ORIGIN: &str = "https://finance.eastmoney.com";

/// 东方财富“财经早餐”栏目列表页抓取器
pub struct EastMoneyListScraper {
    client: Client,
    keyword: String,
    last_request: Mutex<Option<Instant>>,
}

impl EastMoneyListScraper {
    /// 创建新的列表页抓取器，只保留标题含 `keyword` 的条目
    pub fn new(keyword: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            keyword: keyword.to_string(),
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        const MIN_INTERVAL: Duration = Duration::from_millis(500);

        let now = Instant::now();
        let should_wait = match self.last_request.lock() {
            Ok(mut last) => {
                let wait = last
                    .map(|instant| instant.elapsed())
                    .filter(|elapsed| *elapsed < MIN_INTERVAL)
                    .map(|elapsed| MIN_INTERVAL - elapsed);
                *last = Some(now);
                wait
            }
            Err(_) => None,
        };

        if let Some(wait_time) = should_wait {
            debug!("等待 {:?} 以遵守频率限制", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

#[async_trait]
impl PageFetcher for EastMoneyListScraper {
    fn source_name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch(&self, locator: &str) -> Result<HashMap<DateKey, String>> {
        info!("获取列表页 {}", locator);

        // 限制请求频率
        self.wait_for_rate_limit().await;

        let html = get_text(&self.client, locator, "https://stock.eastmoney.com/").await?;
        let mapping = parse_listing(&html, &self.keyword)?;

        info!("列表页 {} 解析出 {} 条早餐链接", locator, mapping.len());
        Ok(mapping)
    }
}

/// 解析列表页 HTML，返回 日期键 -> 文章链接
///
/// 同一页内同一日期出现多次时保留第一条。
pub fn parse_listing(html: &str, keyword: &str) -> Result<HashMap<DateKey, String>> {
    let document = Html::parse_document(html);
    let item_selector = selector("ul#newsListContent > li")?;
    let text_selector = selector("div.text")?;
    let title_selector = selector("p.title a[href]")?;
    let time_selector = selector("p.time")?;

    // 收集可能的新闻容器
    let mut candidates: Vec<ElementRef> = document
        .select(&item_selector)
        .map(|li| li.select(&text_selector).next().unwrap_or(li))
        .collect();
    if candidates.is_empty() {
        candidates = document.select(&text_selector).collect();
    }
    if candidates.is_empty() {
        return Err(BriefError::ParseMiscategorized(
            "no ul#newsListContent or div.text on list page".to_string(),
        ));
    }

    let mut mapping = HashMap::new();
    for container in candidates {
        let Some(link) = container.select(&title_selector).next() else {
            continue;
        };

        let title: String = link.text().collect::<String>().trim().to_string();
        if !title.contains(keyword) {
            continue;
        }

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let href = util::absolutize(href, ARTICLE_ORIGIN);

        let time_text: String = match container.select(&time_selector).next() {
            Some(time) => time.text().collect(),
            None => continue,
        };

        if let Some(date_key) = util::extract_date_key(&time_text) {
            mapping.entry(date_key).or_insert(href);
        }
    }

    Ok(mapping)
}
