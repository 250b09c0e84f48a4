use crate::errors::{BriefError, Result};
use crate::models::news::NewsItem;
use crate::scrapers::base::NewsSource;
use crate::scrapers::{build_client, BROWSER_USER_AGENT};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::{json, Value};

const SEARCH_URL: &str = "https://search-api-web.eastmoney.com/search/jsonp";
const JSONP_CALLBACK: &str = "jQuery35101792940631092459_1764599530165";
const MIN_CONTENT_CHARS: usize = 10;

/// 东方财富个股新闻搜索
pub struct EastMoneyNewsScraper {
    client: Client,
}

impl EastMoneyNewsScraper {
    pub fn new() -> Result<Self> {
        Ok(Self { client: build_client()? })
    }
}

#[async_trait]
impl NewsSource for EastMoneyNewsScraper {
    fn method(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_news(&self, ticker: &str, count: usize, _date: Option<NaiveDate>) -> Result<Vec<NewsItem>> {
        info!("获取{}的东方财富新闻", ticker);

        let param = json!({
            "uid": "",
            "keyword": ticker,
            "type": ["cmsArticleWebOld"],
            "client": "web",
            "clientType": "web",
            "clientVersion": "curr",
            "param": {
                "cmsArticleWebOld": {
                    "searchScope": "default",
                    "sort": "default",
                    "pageIndex": 1,
                    "pageSize": 100,
                    "preTag": "<em>",
                    "postTag": "</em>"
                }
            }
        })
        .to_string();

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("cb", JSONP_CALLBACK), ("param", param.as_str())])
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header("Referer", "https://so.eastmoney.com/")
            .send()
            .await
            .map_err(|e| BriefError::Fetch(format!("{}: {}", SEARCH_URL, e)))?;

        let text = response.text().await?;
        let items = parse_search_response(&text, ticker, count)?;
        if items.len() < count {
            warn!("实际可获取的新闻数量({})少于请求的数量({})", items.len(), count);
        }
        Ok(items)
    }
}

/// 解析 JSONP 响应，按发布时间倒序，最多保留 `count` 条
pub fn parse_search_response(text: &str, ticker: &str, count: usize) -> Result<Vec<NewsItem>> {
    // 提取JSON部分
    let json_str = match (text.find('('), text.rfind(')')) {
        (Some(start), Some(end)) if start < end => &text[start + 1..end],
        _ => text,
    };
    let json: Value = serde_json::from_str(json_str)?;

    let mut news = Vec::new();
    if let Some(articles) = json
        .get("result")
        .and_then(|r| r.get("cmsArticleWebOld"))
        .and_then(|a| a.as_array())
    {
        for article in articles {
            let title = clean_text(article.get("title").and_then(Value::as_str).unwrap_or_default());
            let mut content = clean_text(article.get("content").and_then(Value::as_str).unwrap_or_default());
            if content.is_empty() {
                content = title.clone();
            }
            // 内容太短的跳过
            if title.is_empty() || content.chars().count() < MIN_CONTENT_CHARS {
                continue;
            }

            let code = article.get("code").and_then(Value::as_str).unwrap_or_default();
            let url = article
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("http://finance.eastmoney.com/a/{}.html", code));

            news.push(NewsItem {
                title,
                content,
                publish_time: article.get("date").and_then(Value::as_str).map(str::to_string),
                source: article
                    .get("mediaName")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                url,
                keyword: ticker.to_string(),
                search_time: None,
            });
        }
    }

    // 按发布时间排序
    news.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
    news.truncate(count);

    debug!("解析出 {} 条新闻", news.len());
    Ok(news)
}

fn clean_text(raw: &str) -> String {
    raw.replace("<em>", "")
        .replace("</em>", "")
        .replace('\u{3000}', "")
        .replace("\r\n", " ")
        .trim()
        .to_string()
}
