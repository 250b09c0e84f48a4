use crate::config::CrawlConfig;
use crate::errors::Result;
use crate::scrapers::base::ImageExtractor;
use crate::scrapers::{build_client, get_text, selector};
use crate::util;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use scraper::Html;

const CALENDAR_CDN_HOST: &str = "np-newspic.dfcfw.com";
const CALENDAR_ALT_KEYWORD: &str = "日历";
const LARGE_IMAGE_MIN_WIDTH: u32 = 500;
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// 日历图片的查找策略，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    /// 正文区域内居中的图片
    CenteredInContent,
    /// 正文区域内声明宽度最大（且超过阈值）的图片
    LargestInContent,
    /// 图片地址位于东方财富图片域名
    CdnHost,
    /// alt 文本含“日历”
    AltKeyword,
}

impl ImageStrategy {
    pub const PRIORITY: [ImageStrategy; 4] = [
        ImageStrategy::CenteredInContent,
        ImageStrategy::LargestInContent,
        ImageStrategy::CdnHost,
        ImageStrategy::AltKeyword,
    ];

    pub fn apply(self, document: &Html) -> Option<String> {
        match self {
            ImageStrategy::CenteredInContent => {
                let img_selector = selector("div#ContentBody center img").ok()?;
                let img = document.select(&img_selector).next()?;
                let src = img.value().attr("src").or_else(|| img.value().attr("original"))?;
                normalize_image_url(src)
            }
            ImageStrategy::LargestInContent => {
                let img_selector = selector("div#ContentBody img[src]").ok()?;
                document
                    .select(&img_selector)
                    .filter_map(|img| {
                        let width = img.value().attr("width")?.trim().parse::<u32>().ok()?;
                        let src = img.value().attr("src")?;
                        (width > LARGE_IMAGE_MIN_WIDTH).then_some((width, src))
                    })
                    .max_by_key(|(width, _)| *width)
                    .and_then(|(_, src)| normalize_image_url(src))
            }
            ImageStrategy::CdnHost => {
                let img_selector = selector("img[src]").ok()?;
                document
                    .select(&img_selector)
                    .filter_map(|img| img.value().attr("src"))
                    .find(|src| src.contains(CALENDAR_CDN_HOST))
                    .and_then(normalize_image_url)
            }
            ImageStrategy::AltKeyword => {
                let img_selector = selector("img[alt]").ok()?;
                document
                    .select(&img_selector)
                    .filter(|img| {
                        img.value()
                            .attr("alt")
                            .map_or(false, |alt| alt.contains(CALENDAR_ALT_KEYWORD))
                    })
                    .filter_map(|img| img.value().attr("src"))
                    .find_map(normalize_image_url)
            }
        }
    }
}

/// 按优先级依次尝试各策略，第一个命中的胜出
pub fn find_calendar_image(html: &str) -> Option<(ImageStrategy, String)> {
    let document = Html::parse_document(html);
    ImageStrategy::PRIORITY
        .iter()
        .find_map(|strategy| strategy.apply(&document).map(|url| (*strategy, url)))
}

/// 补全协议并校验图片地址，不像图片的返回 `None`
pub fn normalize_image_url(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let url = if src.starts_with("//") {
        util::absolutize(src, "https://finance.eastmoney.com")
    } else {
        src.to_string()
    };

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }
    let lower = url.to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) || lower.contains(CALENDAR_CDN_HOST) {
        Some(url)
    } else {
        None
    }
}

/// 早餐文章页抓取器，提取其中的财经日历图片
///
/// 失败重试之间按图片请求的间隔随机等待。
pub struct EastMoneyArticleScraper {
    client: Client,
    max_retries: u32,
    delay_min_ms: u64,
    delay_max_ms: u64,
}

impl EastMoneyArticleScraper {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            max_retries: config.max_retries.max(1),
            delay_min_ms: config.image_delay_min_ms,
            delay_max_ms: config.image_delay_max_ms,
        })
    }
}

#[async_trait]
impl ImageExtractor for EastMoneyArticleScraper {
    async fn extract(&self, page_url: &str) -> Result<Option<String>> {
        let mut attempt = 0;
        let html = loop {
            attempt += 1;
            match get_text(&self.client, page_url, "https://finance.eastmoney.com/").await {
                Ok(html) => break html,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!("请求 {} 失败: {}，第{}次重试...", page_url, e, attempt);
                    util::politeness_delay(self.delay_min_ms, self.delay_max_ms).await;
                }
                Err(e) => return Err(e),
            }
        };

        match find_calendar_image(&html) {
            Some((strategy, url)) => {
                debug!("{} 通过 {:?} 找到日历图片", page_url, strategy);
                Ok(Some(url))
            }
            None => {
                debug!("{} 未找到符合条件的财经日历图片", page_url);
                Ok(None)
            }
        }
    }
}
