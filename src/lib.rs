// 公开导出的模块，供外部使用
pub mod calendar;
pub mod config;
pub mod data_provider;
pub mod errors;
pub mod models;
pub mod services;

// 抓取器与工具函数主要服务于命令行程序
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use calendar::{TradingCalendar, TradingDay};
pub use config::{CrawlConfig, ListingOrder};
pub use data_provider::CacheProvider;
pub use errors::{BriefError, Result};
pub use models::cache::{BreakfastRecord, DateKey, DateResourceCache};
pub use services::breakfast_service::{BreakfastService, CalendarPicService};
pub use services::crawl_service::{CoverageState, CrawlReport, CrawlService, Lookup};
pub use services::news_service::NewsService;
pub use services::resolver::PagedResourceResolver;
