//! Scenario: stock news cache with source fallback

mod common;

use common::*;
use morning_brief::models::news::NewsCacheEntry;
use morning_brief::scrapers::base::NewsSource;
use morning_brief::{CacheProvider, NewsService};
use std::sync::Arc;

fn source(s: &Arc<MockNewsSource>) -> Arc<dyn NewsSource + Send + Sync> {
    s.clone()
}

fn items(n: usize) -> Vec<morning_brief::models::news::NewsItem> {
    (0..n)
        .map(|i| news_item(&format!("新闻{:02}", i), &format!("2024-03-08 {:02}:00:00", 23 - i)))
        .collect()
}

#[tokio::test]
async fn falls_back_until_a_source_returns_news() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheProvider::new(&config(dir.path()));
    let failing = Arc::new(MockNewsSource::new("eastmoney", Behavior::Fail));
    let empty = Arc::new(MockNewsSource::new("empty", Behavior::Empty));
    let search = Arc::new(MockNewsSource::new("online_search", Behavior::Items(items(8))));
    let sources: Vec<Arc<dyn NewsSource + Send + Sync>> = vec![source(&failing), source(&empty), source(&search)];
    let service = NewsService::new(store.clone(), sources);
    let now = at(d(2024, 3, 11), 11);

    let news = service
        .get_stock_news_at(now, "300059", 5, Some(d(2024, 3, 8)))
        .await
        .unwrap();
    assert_eq!(news.len(), 5);
    assert_eq!(news[0].title, "新闻00");
    assert_eq!((failing.calls(), empty.calls(), search.calls()), (1, 1, 1));

    let entry: NewsCacheEntry = store.load_news("300059", "2024-03-08").unwrap().unwrap();
    assert_eq!(entry.method, "online_search");
    assert_eq!(entry.query.as_deref(), Some("300059 股票 新闻"));
    assert_eq!(entry.cached_count, 0);
    assert_eq!(entry.news_count, 5);
    assert_eq!(entry.last_updated, now);
    assert!(store
        .news_path("300059", "2024-03-08")
        .ends_with("300059/300059_news_2024-03-08.json"));
}

#[tokio::test]
async fn historical_cache_with_enough_items_skips_sources() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheProvider::new(&config(dir.path()));
    let mock = Arc::new(MockNewsSource::new("eastmoney", Behavior::Items(items(10))));
    let service = NewsService::new(store, vec![source(&mock)]);

    service
        .get_stock_news_at(at(d(2024, 3, 8), 15), "300059", 10, Some(d(2024, 3, 8)))
        .await
        .unwrap();
    let news = service
        .get_stock_news_at(at(d(2024, 3, 11), 11), "300059", 3, Some(d(2024, 3, 8)))
        .await
        .unwrap();

    assert_eq!(news.len(), 3);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn stale_cache_for_today_is_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheProvider::new(&config(dir.path()));
    let today = d(2024, 3, 11);

    let stale = NewsCacheEntry {
        date: "2024-03-11".to_string(),
        method: "eastmoney".to_string(),
        query: None,
        news: items(10),
        cached_count: 0,
        news_count: 10,
        total_count: 10,
        last_updated: at(d(2024, 3, 10), 22),
    };
    store.save_news("300059", &stale).unwrap();

    let mock = Arc::new(MockNewsSource::new("eastmoney", Behavior::Items(vec![news_item(
        "今日新闻",
        "2024-03-11 09:30:00",
    )])));
    let service = NewsService::new(store.clone(), vec![source(&mock)]);

    let news = service.get_stock_news_at(at(today, 11), "300059", 5, None).await.unwrap();
    assert_eq!(mock.calls(), 1);
    assert_eq!(news, vec![news_item("今日新闻", "2024-03-11 09:30:00")]);

    let entry = store.load_news("300059", "2024-03-11").unwrap().unwrap();
    assert_eq!(entry.last_updated.date(), today);
    assert_eq!(entry.total_count, 1);
}

#[tokio::test]
async fn partial_cache_is_topped_up_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheProvider::new(&config(dir.path()));
    let first = Arc::new(MockNewsSource::new("eastmoney", Behavior::Items(items(3))));
    NewsService::new(store.clone(), vec![source(&first)])
        .get_stock_news_at(at(d(2024, 3, 8), 15), "300059", 3, Some(d(2024, 3, 8)))
        .await
        .unwrap();

    let second = Arc::new(MockNewsSource::new("eastmoney", Behavior::Items(items(6))));
    let news = NewsService::new(store.clone(), vec![source(&second)])
        .get_stock_news_at(at(d(2024, 3, 11), 11), "300059", 6, Some(d(2024, 3, 8)))
        .await
        .unwrap();

    assert_eq!(second.last_count(), 6);
    assert_eq!(news.len(), 6);
    let titles: Vec<_> = news.iter().map(|n| n.title.clone()).collect();
    assert_eq!(titles, (0..6).map(|i| format!("新闻{:02}", i)).collect::<Vec<_>>());

    let entry = store.load_news("300059", "2024-03-08").unwrap().unwrap();
    assert_eq!(entry.cached_count, 3);
    assert_eq!(entry.total_count, 6);
}

#[tokio::test]
async fn request_is_capped_at_one_hundred() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockNewsSource::new("eastmoney", Behavior::Items(items(20))));
    let service = NewsService::new(CacheProvider::new(&config(dir.path())), vec![source(&mock)]);

    service
        .get_stock_news_at(at(d(2024, 3, 11), 11), "300059", 500, Some(d(2024, 3, 8)))
        .await
        .unwrap();
    assert_eq!(mock.last_count(), 100);
}
