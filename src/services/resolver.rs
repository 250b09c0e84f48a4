use crate::calendar::{TradingCalendar, TradingDay};
use crate::config::{CrawlConfig, ListingOrder};
use crate::data_provider::CacheProvider;
use crate::errors::Result;
use crate::models::cache::{DateKey, DateResourceCache};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// `ceil(ordinal / page_size)`，最小为 1
pub fn page_of(ordinal: usize, page_size: u32) -> u32 {
    let page_size = page_size.max(1) as usize;
    ordinal.div_ceil(page_size).max(1) as u32
}

/// 目标所在页及其前后各一页，限制在 `[1, page_of(total)]` 内
///
/// 栏目实际每页条数与按日历推算的位置可能差几条，多取相邻两页即可兜住。
pub fn resolve_candidate_pages(target_ordinal: usize, total_ordinal: usize, page_size: u32) -> BTreeSet<u32> {
    let page = page_of(target_ordinal, page_size);
    let last_page = page_of(total_ordinal, page_size);
    [page.saturating_sub(1), page, page + 1]
        .into_iter()
        .filter(|p| *p >= 1 && *p <= last_page)
        .collect()
}

/// 交易日序号与列表页码之间的换算
#[derive(Debug, Clone)]
pub struct PagedResourceResolver {
    calendar: Arc<TradingCalendar>,
    epoch: NaiveDate,
    page_size: u32,
    order: ListingOrder,
    base_url: String,
}

impl PagedResourceResolver {
    pub fn new(calendar: Arc<TradingCalendar>, config: &CrawlConfig) -> Self {
        Self {
            calendar,
            epoch: config.epoch,
            page_size: config.page_size.max(1),
            order: config.listing_order,
            base_url: config.list_base_url.clone(),
        }
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `[epoch, date]` 内的交易日个数
    pub fn ordinal_of(&self, date: NaiveDate) -> usize {
        if date < self.epoch {
            return 0;
        }
        self.calendar.count_trading_days(self.epoch, date)
    }

    pub fn page_count(&self, total_ordinal: usize) -> u32 {
        page_of(total_ordinal, self.page_size)
    }

    /// 日历序号在列表中的位置（从1开始）
    pub fn listing_position(&self, target_ordinal: usize, total_ordinal: usize) -> usize {
        match self.order {
            ListingOrder::OldestFirst => target_ordinal.max(1),
            ListingOrder::NewestFirst => {
                let total = total_ordinal.max(target_ordinal);
                (total + 1).saturating_sub(target_ordinal).max(1)
            }
        }
    }

    /// 查找单个日期时需要抓取的页码
    pub fn candidate_pages_for(&self, date: NaiveDate, reference_end: NaiveDate) -> BTreeSet<u32> {
        let target = self.ordinal_of(date);
        let total = self.ordinal_of(reference_end).max(target);
        let position = self.listing_position(target, total);
        resolve_candidate_pages(position, total, self.page_size)
    }

    /// 把 `(last_covered, desired_end]` 中缺失的交易日换算成页码
    ///
    /// 尚无覆盖时返回全部页；否则在缺失区间两侧各多取一页。
    pub fn pages_for_missing(&self, last_covered: Option<NaiveDate>, desired_end: NaiveDate) -> BTreeSet<u32> {
        let total = self.ordinal_of(desired_end);
        let last_page = self.page_count(total);

        let covered = match last_covered {
            Some(date) if date >= self.epoch => self.ordinal_of(date),
            _ => return (1..=last_page).collect(),
        };
        if covered >= total {
            return BTreeSet::new();
        }

        let first_missing = covered + 1;
        let (low, high) = match self.order {
            ListingOrder::OldestFirst => (first_missing, total),
            ListingOrder::NewestFirst => (1, self.listing_position(first_missing, total)),
        };

        let first_page = page_of(low, self.page_size).saturating_sub(1).max(1);
        let end_page = (page_of(high, self.page_size) + 1).min(last_page);
        (first_page..=end_page).collect()
    }

    /// 把一页结果并入缓存，返回新增条数
    ///
    /// 已有的日期不覆盖；无法解析、不是交易日或晚于 `through` 的键被丢弃。
    /// 不改动覆盖标记。
    pub fn merge_entries(
        &self,
        cache: &mut DateResourceCache,
        page: &HashMap<DateKey, String>,
        through: NaiveDate,
    ) -> usize {
        // 按日期顺序插入，保证结果与 HashMap 的遍历顺序无关
        let mut entries: Vec<_> = page.iter().collect();
        entries.sort();

        let mut added = 0;
        for (key, url) in entries {
            let Some(date) = key.to_date() else {
                warn!("丢弃无法解析的日期键 {}", key);
                continue;
            };
            if date > through || self.calendar.is_trading_day(date) != TradingDay::Trading {
                warn!("丢弃非交易日或超出范围的条目 {}", key);
                continue;
            }
            if cache.insert_if_absent(key.clone(), url.clone()) {
                added += 1;
            }
        }
        added
    }

    /// 合并一页结果并落盘
    pub fn merge_page_result(
        &self,
        cache: &mut DateResourceCache,
        page: &HashMap<DateKey, String>,
        through: NaiveDate,
        store: &CacheProvider,
    ) -> Result<usize> {
        let added = self.merge_entries(cache, page, through);
        store.save_date_cache(cache)?;
        debug!("merged {} new entries", added);
        Ok(added)
    }

    /// 从 epoch 起每个交易日都有条目的最后一天，不超过 `through`
    pub fn covered_through(&self, cache: &DateResourceCache, through: NaiveDate) -> Option<NaiveDate> {
        self.calendar
            .trading_days(self.epoch, through)
            .take_while(|day| cache.contains(&DateKey::from_date(*day)))
            .last()
    }

    /// 第1页没有后缀，其余为 `_{n}`
    pub fn page_locator(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}.html", self.base_url)
        } else {
            format!("{}_{}.html", self.base_url, page)
        }
    }
}
