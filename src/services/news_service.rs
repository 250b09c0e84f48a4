use crate::data_provider::CacheProvider;
use crate::errors::Result;
use crate::models::news::{NewsCacheEntry, NewsItem};
use crate::scrapers::base::NewsSource;
use crate::util;
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

const MAX_NEWS_LIMIT: usize = 100;

/// 个股新闻服务：按日缓存，缓存不足时依次尝试各新闻来源
pub struct NewsService {
    store: CacheProvider,
    sources: Vec<Arc<dyn NewsSource + Send + Sync>>,
}

impl NewsService {
    /// `sources` 按回退顺序排列，第一个返回非空结果的来源胜出
    pub fn new(store: CacheProvider, sources: Vec<Arc<dyn NewsSource + Send + Sync>>) -> Self {
        Self { store, sources }
    }

    pub async fn get_stock_news(&self, ticker: &str, max_news: usize, date: Option<NaiveDate>) -> Result<Vec<NewsItem>> {
        self.get_stock_news_at(util::now_in_shanghai(), ticker, max_news, date).await
    }

    pub async fn get_stock_news_at(
        &self,
        now: NaiveDateTime,
        ticker: &str,
        max_news: usize,
        date: Option<NaiveDate>,
    ) -> Result<Vec<NewsItem>> {
        let max_news = if max_news > MAX_NEWS_LIMIT {
            warn!("请求的新闻数量({})超过最大限制({})，已自动调整为{}条", max_news, MAX_NEWS_LIMIT, MAX_NEWS_LIMIT);
            MAX_NEWS_LIMIT
        } else {
            max_news
        };

        let today = now.date();
        let target = date.unwrap_or(today);
        let date_key = target.format("%Y-%m-%d").to_string();
        let historical = target < today;

        let cached = self.store.load_news(ticker, &date_key).unwrap_or_else(|e| {
            warn!("读取新闻缓存失败: {}", e);
            None
        });
        let cache_valid = cached
            .as_ref()
            .map_or(false, |entry| entry.is_valid(historical, today));

        let mut cached_news = match cached {
            Some(entry) if cache_valid => entry.news,
            _ => Vec::new(),
        };
        if cache_valid && cached_news.len() >= max_news {
            info!("从缓存获取到{}条{}的新闻", max_news, ticker);
            cached_news.truncate(max_news);
            return Ok(cached_news);
        }

        let cached_count = cached_news.len();
        let fetch_count = max_news.saturating_sub(cached_count).max(max_news);
        info!("缓存中有{}条新闻，需要获取{}条新闻", cached_count, fetch_count);

        let mut method = "cache".to_string();
        let mut query = None;
        let mut fresh = Vec::new();
        for source in &self.sources {
            match source.fetch_news(ticker, fetch_count, date).await {
                Ok(items) if !items.is_empty() => {
                    method = source.method().to_string();
                    query = source.query(ticker, date);
                    fresh = items;
                    break;
                }
                Ok(_) => warn!("{} 没有返回{}的新闻", source.method(), ticker),
                Err(e) => error!("{} 获取新闻失败: {}", source.method(), e),
            }
        }

        let new_count = fresh.len();
        let mut all_news = merge_news(cached_news, fresh);
        if new_count > 0 || !cache_valid {
            let entry = NewsCacheEntry {
                date: date_key,
                method,
                query,
                cached_count,
                news_count: new_count,
                total_count: all_news.len(),
                news: all_news.clone(),
                last_updated: now,
            };
            self.store.save_news(ticker, &entry)?;
        }

        all_news.truncate(max_news);
        Ok(all_news)
    }
}

/// 合并缓存与新获取的新闻，按标题去重，按发布时间倒序
///
/// 标题重复时保留缓存中的那条；没有发布时间的排在最后。
pub fn merge_news(cached: Vec<NewsItem>, fresh: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut merged: Vec<NewsItem> = cached
        .into_iter()
        .chain(fresh)
        .filter(|item| seen.insert(item.title.clone()))
        .collect();
    merged.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
    merged
}
