use crate::errors::Result;
use crate::models::cache::{BreakfastRecord, CalendarPicCache, DateKey};
use crate::scrapers::base::ImageExtractor;
use crate::services::crawl_service::{CrawlService, Lookup};
use crate::util;
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use std::sync::Arc;

/// 为每期早餐提取财经日历图片并缓存到 `calendar_pic_url.json`
pub struct CalendarPicService {
    crawl: Arc<CrawlService>,
    extractor: Arc<dyn ImageExtractor + Send + Sync>,
}

impl CalendarPicService {
    pub fn new(crawl: Arc<CrawlService>, extractor: Arc<dyn ImageExtractor + Send + Sync>) -> Self {
        Self { crawl, extractor }
    }

    pub async fn collect(&self, target: Option<NaiveDate>) -> Result<CalendarPicCache> {
        self.collect_at(util::now_in_shanghai(), target).await
    }

    /// 先补齐早餐链接，再给还没有图片的日期逐个提取
    ///
    /// 提取失败记为 `null`，下次运行会重试。
    pub async fn collect_at(&self, now: NaiveDateTime, target: Option<NaiveDate>) -> Result<CalendarPicCache> {
        let report = self.crawl.ensure_covered_at(now, target).await?;
        if !report.is_complete() {
            warn!("早餐链接未完全覆盖，失败页 {:?}", report.failed_pages);
        }

        let store = self.crawl.store();
        let breakfast = self.crawl.load_cache();
        let mut pics = store.load_calendar_pics()?;

        let pending: Vec<(&DateKey, &String)> = breakfast
            .entries
            .iter()
            .filter(|(key, _)| !matches!(pics.get(*key), Some(Some(_))))
            .collect();
        info!("{} 期早餐需要提取日历图片", pending.len());

        let config = self.crawl.config();
        for (i, (key, page_url)) in pending.into_iter().enumerate() {
            if i > 0 {
                util::politeness_delay(config.image_delay_min_ms, config.image_delay_max_ms).await;
            }

            let image = match self.extractor.extract(page_url).await {
                Ok(image) => image,
                Err(e) => {
                    error!("提取 {} 的日历图片失败: {}", key, e);
                    None
                }
            };
            if image.is_none() {
                warn!("{} 没有找到日历图片", key);
            }
            pics.insert(key.clone(), image);
            store.save_calendar_pics(&pics)?;
        }

        Ok(pics)
    }
}

/// 单日早餐：文章链接加日历图片
pub struct BreakfastService {
    crawl: Arc<CrawlService>,
    extractor: Arc<dyn ImageExtractor + Send + Sync>,
}

impl BreakfastService {
    pub fn new(crawl: Arc<CrawlService>, extractor: Arc<dyn ImageExtractor + Send + Sync>) -> Self {
        Self { crawl, extractor }
    }

    pub async fn specific_date(&self, date: NaiveDate) -> Result<BreakfastRecord> {
        self.specific_date_at(util::now_in_shanghai(), date).await
    }

    pub async fn specific_date_at(&self, now: NaiveDateTime, date: NaiveDate) -> Result<BreakfastRecord> {
        let key = DateKey::from_date(date);
        let page_url = match self.crawl.lookup_specific_date_at(now, date).await? {
            Lookup::Found(url) => url,
            Lookup::NotFound => {
                info!("没有找到 {} 的财经早餐", key);
                return Ok(BreakfastRecord {
                    date: key,
                    page_url: None,
                    calendar_url: None,
                });
            }
        };

        let calendar_url = self.extractor.extract(&page_url).await.unwrap_or_else(|e| {
            error!("提取 {} 的日历图片失败: {}", page_url, e);
            None
        });

        Ok(BreakfastRecord {
            date: key,
            page_url: Some(page_url),
            calendar_url,
        })
    }
}
