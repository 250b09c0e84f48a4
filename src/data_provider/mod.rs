use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CrawlConfig;
use crate::errors::{BriefError, Result};
use crate::models::cache::{CalendarPicCache, DateResourceCache, UrlListCache};
use crate::models::news::NewsCacheEntry;
use std::fs;
use std::path::{Path, PathBuf};

/// 缓存数据提供者，负责各个 JSON 缓存文件的读写
///
/// 所有写入先落到同目录的临时文件，再重命名覆盖目标文件。
#[derive(Debug, Clone)]
pub struct CacheProvider {
    urls_path: PathBuf,
    breakfast_path: PathBuf,
    calendar_pic_path: PathBuf,
    config: CrawlConfig,
}

impl CacheProvider {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            urls_path: config.urls_path(),
            breakfast_path: config.breakfast_path(),
            calendar_pic_path: config.calendar_pic_path(),
            config: config.clone(),
        }
    }

    pub fn breakfast_path(&self) -> &Path {
        &self.breakfast_path
    }

    pub fn url_list_path(&self) -> &Path {
        &self.urls_path
    }

    /// 读取日期 -> 链接缓存；文件不存在时返回空缓存，解析失败返回 `CacheCorrupt`
    pub fn load_date_cache(&self) -> Result<DateResourceCache> {
        Ok(read_json(&self.breakfast_path)?.unwrap_or_default())
    }

    /// 同 [`load_date_cache`](Self::load_date_cache)，但损坏的文件按空缓存处理
    pub fn load_date_cache_or_empty(&self) -> DateResourceCache {
        match self.load_date_cache() {
            Ok(cache) => cache,
            Err(e) => {
                warn!("{}，从头开始抓取", e);
                DateResourceCache::new()
            }
        }
    }

    pub fn save_date_cache(&self, cache: &DateResourceCache) -> Result<()> {
        debug!(
            "Saving {} breakfast entries to {}",
            cache.len(),
            self.breakfast_path.display()
        );
        write_json_atomic(&self.breakfast_path, cache)
    }

    pub fn load_url_list(&self) -> Result<Option<UrlListCache>> {
        read_json(&self.urls_path)
    }

    pub fn save_url_list(&self, list: &UrlListCache) -> Result<()> {
        info!(
            "Saving {} list page urls (end date {}) to {}",
            list.urls.len(),
            list.end_date,
            self.urls_path.display()
        );
        write_json_atomic(&self.urls_path, list)
    }

    pub fn load_calendar_pics(&self) -> Result<CalendarPicCache> {
        Ok(read_json(&self.calendar_pic_path)?.unwrap_or_default())
    }

    pub fn save_calendar_pics(&self, pics: &CalendarPicCache) -> Result<()> {
        write_json_atomic(&self.calendar_pic_path, pics)
    }

    pub fn news_path(&self, ticker: &str, date: &str) -> PathBuf {
        self.config.news_path(ticker, date)
    }

    pub fn load_news(&self, ticker: &str, date: &str) -> Result<Option<NewsCacheEntry>> {
        read_json(&self.news_path(ticker, date))
    }

    pub fn save_news(&self, ticker: &str, entry: &NewsCacheEntry) -> Result<()> {
        let path = self.news_path(ticker, &entry.date);
        info!("成功保存{}条新闻到文件: {}", entry.news.len(), path.display());
        write_json_atomic(&path, entry)
    }
}

/// 读取 JSON 文件，不存在时返回 `None`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| BriefError::CacheCorrupt(format!("{}: {}", path.display(), e)))
}

/// 先写临时文件再重命名，避免写到一半的文件覆盖旧缓存
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
