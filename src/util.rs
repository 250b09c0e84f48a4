use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Asia::Shanghai;
use log::debug;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Url;
use std::time::Duration;

use crate::errors::{BriefError, Result};
use crate::models::cache::DateKey;

static DATE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}年\d{2}月\d{2}日)").expect("valid date key regex"));

// 日期转换工具
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(BriefError::from)
}

/// 北京时间的当前时刻
pub fn now_in_shanghai() -> NaiveDateTime {
    Utc::now().with_timezone(&Shanghai).naive_local()
}

/// 从文本中找出第一个 `YYYY年MM月DD日`
pub fn extract_date_key(text: &str) -> Option<DateKey> {
    DATE_KEY_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| DateKey::from_raw(m.as_str()))
}

/// 以 `origin` 为基准补全相对链接，无法解析时原样返回
pub fn absolutize(href: &str, origin: &str) -> String {
    let href = href.trim();
    match Url::parse(origin).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!("无法补全链接 {}（基准 {}）: {}", href, origin, e);
            href.to_string()
        }
    }
}

/// 在 `[min_ms, max_ms]` 内随机挑一个等待时长
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// 随机等待，避免触发反爬
pub async fn politeness_delay(min_ms: u64, max_ms: u64) {
    let wait = random_delay(min_ms, max_ms);
    if wait.is_zero() {
        return;
    }
    debug!("等待 {:?} 以遵守频率限制", wait);
    tokio::time::sleep(wait).await;
}
