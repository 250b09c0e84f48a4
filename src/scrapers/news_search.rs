use crate::errors::Result;
use crate::models::news::NewsItem;
use crate::scrapers::base::NewsSource;
use crate::scrapers::{build_client, selector, BROWSER_USER_AGENT};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Url};
use scraper::Html;

const HTML_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const NEWS_SITES: [&str; 5] = [
    "site:sina.com.cn",
    "site:163.com",
    "site:eastmoney.com",
    "site:cnstock.com",
    "site:hexun.com",
];

// 招聘、广告、开户之类的结果不是新闻
const NOISE_KEYWORDS: [&str; 6] = ["招聘", "求职", "广告", "登录", "注册", "开户"];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static DAYS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})天前").expect("valid regex"));
static HOURS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})小时前").expect("valid regex"));
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));
static CN_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("valid regex"));

/// 一条网页搜索结果
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
}

/// 网页搜索后端
#[async_trait]
pub trait SearchBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;
}

/// 无需脚本渲染的 HTML 搜索页后端
pub struct HtmlSearchBackend {
    client: Client,
}

impl HtmlSearchBackend {
    pub fn new() -> Result<Self> {
        Ok(Self { client: build_client()? })
    }
}

#[async_trait]
impl SearchBackend for HtmlSearchBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(HTML_SEARCH_URL)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .form(&[("q", query)])
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        parse_search_page(&html, limit)
    }
}

/// 解析搜索结果页
pub fn parse_search_page(html: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let result_selector = selector("div.result")?;
    let link_selector = selector("a.result__a[href]")?;
    let snippet_selector = selector(".result__snippet")?;

    let results: Vec<SearchResult> = document
        .select(&result_selector)
        .filter_map(|result| {
            let link = result.select(&link_selector).next()?;
            let snippet = result
                .select(&snippet_selector)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .filter(|s| !s.is_empty());
            Some(SearchResult {
                title: link.text().collect::<String>().trim().to_string(),
                link: link.value().attr("href")?.to_string(),
                snippet,
            })
        })
        .take(limit)
        .collect();

    debug!("搜索页解析出 {} 条结果", results.len());
    Ok(results)
}

/// 构建个股新闻的搜索语句，指定日期时限定为该日之前的一周
pub fn build_search_query(ticker: &str, date: Option<NaiveDate>) -> String {
    let mut base_query = format!("{} 股票 新闻 财经 股市", ticker);

    if let Some(end_date) = date {
        let start_date = end_date - Duration::days(7);
        base_query.push_str(&format!(
            " after:{} before:{}",
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d")
        ));
    }

    format!("{} ({})", base_query, NEWS_SITES.join(" OR "))
}

pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown source".to_string())
}

/// 从摘要中推断发布时间
pub fn infer_publish_time(snippet: &str, now: NaiveDateTime) -> Option<String> {
    if let Some(caps) = DAYS_AGO.captures(snippet) {
        let days: i64 = caps[1].parse().ok()?;
        return Some((now - Duration::days(days)).format(TIME_FORMAT).to_string());
    }
    if let Some(caps) = HOURS_AGO.captures(snippet) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some((now - Duration::hours(hours)).format(TIME_FORMAT).to_string());
    }
    if let Some(caps) = ISO_DATE.captures(snippet) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        return Some(format!("{} 00:00:00", date.format("%Y-%m-%d")));
    }
    if let Some(caps) = CN_DATE.captures(snippet) {
        let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)?;
        return Some(format!("{} 00:00:00", date.format("%Y-%m-%d")));
    }
    None
}

/// 把搜索结果转成新闻条目，过滤掉明显不是新闻的结果
pub fn convert_search_results(results: &[SearchResult], ticker: &str, now: NaiveDateTime) -> Vec<NewsItem> {
    let search_time = now.format(TIME_FORMAT).to_string();

    results
        .iter()
        .filter(|r| {
            let title = r.title.to_lowercase();
            !NOISE_KEYWORDS.iter().any(|k| title.contains(k))
        })
        .map(|r| NewsItem {
            title: r.title.clone(),
            content: r
                .snippet
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| r.title.clone()),
            publish_time: r.snippet.as_deref().and_then(|s| infer_publish_time(s, now)),
            source: extract_domain(&r.link),
            url: r.link.clone(),
            keyword: ticker.to_string(),
            search_time: Some(search_time.clone()),
        })
        .collect()
}

/// 基于网页搜索的新闻来源
pub struct SearchNewsSource<B> {
    backend: B,
}

impl<B> SearchNewsSource<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: SearchBackend + Send + Sync> NewsSource for SearchNewsSource<B> {
    fn method(&self) -> &'static str {
        "online_search"
    }

    fn query(&self, ticker: &str, date: Option<NaiveDate>) -> Option<String> {
        Some(build_search_query(ticker, date))
    }

    async fn fetch_news(&self, ticker: &str, count: usize, date: Option<NaiveDate>) -> Result<Vec<NewsItem>> {
        let query = build_search_query(ticker, date);
        info!("搜索查询： {}", query);

        let results = self.backend.search(&query, count * 2).await?;
        let news = convert_search_results(&results, ticker, crate::util::now_in_shanghai());
        info!("通过搜索获取到{}条新闻", news.len());
        Ok(news)
    }
}
