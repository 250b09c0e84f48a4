use crate::calendar::{TradingCalendar, TradingDay};
use crate::config::CrawlConfig;
use crate::data_provider::CacheProvider;
use crate::errors::{BriefError, Result};
use crate::models::cache::{DateKey, DateResourceCache, UrlListCache};
use crate::scrapers::base::PageFetcher;
use crate::services::resolver::PagedResourceResolver;
use crate::util;
use chrono::{NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// 一次抓取结束时缓存的覆盖状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageState {
    Empty,
    PartiallyCovered,
    FullyCovered,
}

/// `ensure_covered` 的结果
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub state: CoverageState,
    pub desired_end: NaiveDate,
    pub last_covered_date: Option<NaiveDate>,
    pub pages_fetched: Vec<u32>,
    pub failed_pages: Vec<u32>,
    pub new_entries: usize,
}

impl CrawlReport {
    pub fn is_complete(&self) -> bool {
        self.state == CoverageState::FullyCovered
    }
}

/// 单日查找的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
}

/// 增量抓取服务：按交易日推算要抓的列表页，只补缺失部分
///
/// 页与页之间顺序抓取，中间随机等待。
pub struct CrawlService {
    config: CrawlConfig,
    resolver: PagedResourceResolver,
    store: CacheProvider,
    fetcher: Arc<dyn PageFetcher + Send + Sync>,
}

impl CrawlService {
    pub fn new(
        config: CrawlConfig,
        calendar: Arc<TradingCalendar>,
        fetcher: Arc<dyn PageFetcher + Send + Sync>,
    ) -> Self {
        let resolver = PagedResourceResolver::new(calendar, &config);
        let store = CacheProvider::new(&config);
        Self {
            config,
            resolver,
            store,
            fetcher,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheProvider {
        &self.store
    }

    pub fn resolver(&self) -> &PagedResourceResolver {
        &self.resolver
    }

    /// 当前缓存，损坏时视为空
    ///
    /// 覆盖标记取连续有条目的最后一个交易日，且不超过列表页缓存的 `end_date`
    /// （没有列表页缓存时以最新条目为上限）。
    pub fn load_cache(&self) -> DateResourceCache {
        let mut cache = self.store.load_date_cache_or_empty();
        let listed_through = match self.store.load_url_list() {
            Ok(list) => list.map(|list| list.end_date),
            Err(e) => {
                warn!("{}，忽略列表页缓存", e);
                None
            }
        };
        cache.last_covered_date = listed_through
            .or_else(|| cache.latest_entry_date())
            .and_then(|through| self.resolver.covered_through(&cache, through));
        cache
    }

    pub fn desired_end(&self, now: NaiveDateTime, target: Option<NaiveDate>) -> Result<NaiveDate> {
        self.resolver
            .calendar()
            .adjusted_reference_day(now, target, self.config.cutoff_hour)
    }

    /// 重新生成列表页链接缓存 `{"end_date", "urls"}`
    pub fn refresh_listing_urls(&self, target: Option<NaiveDate>) -> Result<UrlListCache> {
        self.refresh_listing_urls_at(util::now_in_shanghai(), target)
    }

    pub fn refresh_listing_urls_at(&self, now: NaiveDateTime, target: Option<NaiveDate>) -> Result<UrlListCache> {
        let end_date = self.desired_end(now, target)?;
        let list = self.listing_urls(end_date);
        self.store.save_url_list(&list)?;
        Ok(list)
    }

    fn listing_urls(&self, end_date: NaiveDate) -> UrlListCache {
        let total_pages = self.resolver.page_count(self.resolver.ordinal_of(end_date));
        UrlListCache {
            end_date,
            urls: (1..=total_pages).map(|p| self.resolver.page_locator(p)).collect(),
        }
    }

    /// 保证缓存覆盖到 `target` 对应的基准交易日
    pub async fn ensure_covered(&self, target: Option<NaiveDate>) -> Result<CrawlReport> {
        self.ensure_covered_at(util::now_in_shanghai(), target).await
    }

    pub async fn ensure_covered_at(&self, now: NaiveDateTime, target: Option<NaiveDate>) -> Result<CrawlReport> {
        let desired_end = self.desired_end(now, target)?;
        let mut cache = self.load_cache();
        let start_marker = cache.last_covered_date;

        if cache.covers(desired_end) {
            info!("缓存已覆盖到 {}，无需抓取", desired_end);
            return Ok(CrawlReport {
                state: CoverageState::FullyCovered,
                desired_end,
                last_covered_date: start_marker,
                pages_fetched: Vec::new(),
                failed_pages: Vec::new(),
                new_entries: 0,
            });
        }

        let pages = self.resolver.pages_for_missing(start_marker, desired_end);
        info!(
            "缓存覆盖到 {:?}，目标 {}，需要抓取 {} 个列表页",
            start_marker,
            desired_end,
            pages.len()
        );

        let mut pages_fetched = Vec::new();
        let mut failed_pages = Vec::new();
        let mut new_entries = 0;

        for (i, page) in pages.iter().copied().enumerate() {
            if i > 0 {
                util::politeness_delay(self.config.delay_min_ms, self.config.delay_max_ms).await;
            }

            let locator = self.resolver.page_locator(page);
            match self.fetch_page(&locator).await {
                Ok(mapping) => {
                    new_entries += self
                        .resolver
                        .merge_page_result(&mut cache, &mapping, desired_end, &self.store)?;
                    pages_fetched.push(page);
                }
                Err(e) => {
                    error!("爬取列表页 {} 失败: {}", locator, e);
                    failed_pages.push(page);
                }
            }
        }

        // 只推进到每个交易日都已有条目的位置；失败页或尚未发布的日期留待下次
        if let Some(frontier) = self.resolver.covered_through(&cache, desired_end) {
            cache.advance_coverage(frontier);
        }
        let state = if cache.covers(desired_end) {
            self.store.save_url_list(&self.listing_urls(desired_end))?;
            CoverageState::FullyCovered
        } else if cache.is_empty() {
            CoverageState::Empty
        } else {
            warn!(
                "只覆盖到 {:?}，目标 {}，失败页 {:?}",
                cache.last_covered_date, desired_end, failed_pages
            );
            CoverageState::PartiallyCovered
        };
        self.store.save_date_cache(&cache)?;

        info!(
            "抓取完成：{:?}，新增 {} 条，失败页 {:?}",
            state, new_entries, failed_pages
        );
        Ok(CrawlReport {
            state,
            desired_end,
            last_covered_date: cache.last_covered_date,
            pages_fetched,
            failed_pages,
            new_entries,
        })
    }

    /// 只抓取目标日期附近的几页来查找单日链接
    pub async fn lookup_specific_date(&self, date: NaiveDate) -> Result<Lookup> {
        self.lookup_specific_date_at(util::now_in_shanghai(), date).await
    }

    pub async fn lookup_specific_date_at(&self, now: NaiveDateTime, date: NaiveDate) -> Result<Lookup> {
        let key = DateKey::from_date(date);
        let mut cache = self.load_cache();
        if let Some(url) = cache.get(&key) {
            return Ok(Lookup::Found(url.to_string()));
        }

        if date < self.resolver.epoch() {
            error!("特定日期 {} 早于起始日期 {}，无数据", date, self.resolver.epoch());
            return Ok(Lookup::NotFound);
        }

        match self.resolver.calendar().is_trading_day(date) {
            TradingDay::Unknown => return Err(BriefError::CalendarUnknown(date)),
            TradingDay::Closed => {
                info!("{} 不是交易日", date);
                return Ok(Lookup::NotFound);
            }
            TradingDay::Trading => {}
        }

        let reference_end = self.desired_end(now, None)?;
        if date > reference_end {
            info!("{} 的早餐尚未发布", date);
            return Ok(Lookup::NotFound);
        }

        let pages = self.resolver.candidate_pages_for(date, reference_end);
        let locators: Vec<String> = pages.iter().map(|p| self.resolver.page_locator(*p)).collect();
        info!("将爬取以下列表页: {:?}", locators);

        let mut found = HashMap::new();
        for (i, locator) in locators.iter().enumerate() {
            if i > 0 {
                util::politeness_delay(self.config.delay_min_ms, self.config.delay_max_ms).await;
            }
            match self.fetch_page(locator).await {
                Ok(mapping) => {
                    for (k, v) in mapping {
                        found.entry(k).or_insert(v);
                    }
                }
                Err(e) => error!("爬取列表页 {} 失败: {}", locator, e),
            }
        }

        // 只补条目，不推进覆盖标记
        if self.resolver.merge_entries(&mut cache, &found, reference_end) > 0 {
            self.store.save_date_cache(&cache)?;
        }

        Ok(match cache.get(&key) {
            Some(url) => Lookup::Found(url.to_string()),
            None => Lookup::NotFound,
        })
    }

    /// 带重试地抓取一页
    ///
    /// 运行环境缺失时先尝试安装一次；页面结构不符按空页处理。
    async fn fetch_page(&self, locator: &str) -> Result<HashMap<DateKey, String>> {
        let max_retries = self.config.max_retries.max(1);
        let mut attempt = 0;
        let mut remediated = false;

        loop {
            attempt += 1;
            match self.fetcher.fetch(locator).await {
                Ok(mapping) => return Ok(mapping),
                Err(BriefError::ParseMiscategorized(reason)) => {
                    warn!("{} 没有列表内容（{}），按空页处理", locator, reason);
                    return Ok(HashMap::new());
                }
                Err(BriefError::RuntimeMissing(reason)) if !remediated => {
                    warn!("{} 抓取环境缺失（{}），尝试安装后重试", self.fetcher.source_name(), reason);
                    remediated = true;
                    self.fetcher.install_runtime().await?;
                    attempt -= 1;
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    warn!("抓取 {} 失败: {}，第{}次重试...", locator, e, attempt);
                    util::politeness_delay(self.config.delay_min_ms, self.config.delay_max_ms).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
