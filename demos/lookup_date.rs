use morning_brief::{CrawlConfig, CrawlService, Lookup, TradingCalendar};
use morning_brief::scrapers::eastmoney::EastMoneyListScraper;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // 创建抓取服务
    let config = CrawlConfig::new();
    let fetcher = Arc::new(EastMoneyListScraper::new(&config.title_keyword)?);
    let calendar = Arc::new(TradingCalendar::a_share().clone());
    let service = CrawlService::new(config, calendar, fetcher);

    // 查找某一天的早餐链接
    let date = morning_brief::util::parse_date("2024-03-08")?;
    match service.lookup_specific_date(date).await? {
        Lookup::Found(url) => println!("{} 的财经早餐: {}", date, url),
        Lookup::NotFound => println!("没有找到 {} 的财经早餐", date),
    }

    // 当前缓存情况
    let cache = service.load_cache();
    println!("\n缓存条数: {}", cache.len());
    if let Some(covered) = cache.last_covered_date {
        println!("覆盖到: {}", covered);
    }

    Ok(())
}
