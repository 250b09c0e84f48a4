use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const DATE_KEY_FORMAT: &str = "%Y年%m月%d日";

/// 缓存中使用的日期键，形如 `2024年03月08日`
///
/// 月、日固定两位，因此字符串顺序与日期顺序一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        DateKey(date.format(DATE_KEY_FORMAT).to_string())
    }

    /// 原样包装一个已格式化的键，不做校验
    pub fn from_raw(raw: &str) -> Self {
        DateKey(raw.to_string())
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DATE_KEY_FORMAT).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey::from_date(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 日期 -> 早餐文章链接，以及已覆盖到的最后日期
///
/// 键只增不改：同一日期已有链接时，后来的结果被忽略。
/// 落盘时只写平铺的 `{"2024年03月08日": "https://..."}`，
/// 覆盖标记由加载方根据日历和列表页缓存重新推算。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedDateCache", into = "BTreeMap<DateKey, String>")]
pub struct DateResourceCache {
    pub last_covered_date: Option<NaiveDate>,
    pub entries: BTreeMap<DateKey, String>,
}

// 早期版本写过 `{"last_covered_date": ..., "urls": {...}}`，仍可读取
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedDateCache {
    Wrapped { urls: BTreeMap<DateKey, String> },
    Flat(BTreeMap<DateKey, String>),
}

impl From<PersistedDateCache> for DateResourceCache {
    fn from(persisted: PersistedDateCache) -> Self {
        let entries = match persisted {
            PersistedDateCache::Wrapped { urls } => urls,
            PersistedDateCache::Flat(entries) => entries,
        };
        Self {
            last_covered_date: None,
            entries,
        }
    }
}

impl From<DateResourceCache> for BTreeMap<DateKey, String> {
    fn from(cache: DateResourceCache) -> Self {
        cache.entries
    }
}

impl DateResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DateKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &DateKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 仅当键不存在时插入，返回是否插入
    pub fn insert_if_absent(&mut self, key: DateKey, url: String) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, url);
        true
    }

    /// 推进覆盖标记，只前进不后退
    pub fn advance_coverage(&mut self, date: NaiveDate) {
        if self.last_covered_date.map_or(true, |current| date > current) {
            self.last_covered_date = Some(date);
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.last_covered_date.map_or(false, |covered| covered >= date)
    }

    pub fn latest_entry_date(&self) -> Option<NaiveDate> {
        self.entries.keys().rev().find_map(DateKey::to_date)
    }
}

/// 列表页链接缓存（`urls_of_em.json`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlListCache {
    pub end_date: NaiveDate,
    pub urls: Vec<String>,
}

/// 日期 -> 财经日历图片链接，未找到时为 `null`
pub type CalendarPicCache = BTreeMap<DateKey, Option<String>>;

/// 某一天的早餐文章及其日历图片
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakfastRecord {
    pub date: DateKey,
    pub page_url: Option<String>,
    pub calendar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_key_uses_chinese_format() {
        let key = DateKey::from_date(d(2024, 3, 8));
        assert_eq!(key.as_str(), "2024年03月08日");
        assert_eq!(key.to_date(), Some(d(2024, 3, 8)));
        assert_eq!(DateKey::from_raw("not a date").to_date(), None);
    }

    #[test]
    fn date_keys_sort_by_date() {
        let mut keys = vec![
            DateKey::from_date(d(2024, 10, 1)),
            DateKey::from_date(d(2023, 12, 29)),
            DateKey::from_date(d(2024, 2, 8)),
        ];
        keys.sort();
        let dates: Vec<_> = keys.iter().filter_map(DateKey::to_date).collect();
        assert_eq!(dates, vec![d(2023, 12, 29), d(2024, 2, 8), d(2024, 10, 1)]);
    }

    #[test]
    fn insert_keeps_first_url() {
        let mut cache = DateResourceCache::new();
        let key = DateKey::from_date(d(2024, 3, 8));
        assert!(cache.insert_if_absent(key.clone(), "https://a".into()));
        assert!(!cache.insert_if_absent(key.clone(), "https://b".into()));
        assert_eq!(cache.get(&key), Some("https://a"));
    }

    #[test]
    fn coverage_only_moves_forward() {
        let mut cache = DateResourceCache::new();
        assert!(!cache.covers(d(2022, 11, 2)));
        cache.advance_coverage(d(2024, 3, 8));
        cache.advance_coverage(d(2024, 1, 2));
        assert_eq!(cache.last_covered_date, Some(d(2024, 3, 8)));
        assert!(cache.covers(d(2024, 3, 8)));
        assert!(!cache.covers(d(2024, 3, 11)));
    }

    #[test]
    fn persists_as_flat_map() {
        let mut cache = DateResourceCache::new();
        cache.insert_if_absent(DateKey::from_date(d(2024, 3, 7)), "https://a".into());
        cache.advance_coverage(d(2024, 3, 7));

        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(json, r#"{"2024年03月07日":"https://a"}"#);

        let back: DateResourceCache = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries, cache.entries);
        assert_eq!(back.last_covered_date, None);
    }

    #[test]
    fn reads_wrapped_document() {
        let json = r#"{"last_covered_date": "2024-03-08", "urls": {"2024年03月08日": "https://b"}}"#;
        let cache: DateResourceCache = serde_json::from_str(json).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&DateKey::from_date(d(2024, 3, 8))), Some("https://b"));
    }
}
