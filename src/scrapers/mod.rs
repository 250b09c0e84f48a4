pub mod base;
pub mod eastmoney;
pub mod article;
pub mod news;
pub mod news_search;

use crate::errors::{BriefError, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::Selector;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(BriefError::RequestError)
}

/// GET 一个页面并返回文本；网络错误与非 2xx 状态都归为 `Fetch`
pub(crate) async fn get_text(client: &Client, url: &str, referer: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
        .header("Referer", referer)
        .send()
        .await
        .map_err(|e| BriefError::Fetch(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BriefError::Fetch(format!("{}: HTTP status {}", url, status)));
    }

    response
        .text()
        .await
        .map_err(|e| BriefError::Fetch(format!("{}: {}", url, e)))
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| BriefError::DataError(format!("Invalid selector {}: {:?}", css, e)))
}
