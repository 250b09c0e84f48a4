use morning_brief::calendar::TradingCalendar;
use morning_brief::config::CrawlConfig;
use morning_brief::data_provider::CacheProvider;
use morning_brief::scrapers::article::EastMoneyArticleScraper;
use morning_brief::scrapers::base::NewsSource;
use morning_brief::scrapers::eastmoney::EastMoneyListScraper;
use morning_brief::scrapers::news::EastMoneyNewsScraper;
use morning_brief::scrapers::news_search::{HtmlSearchBackend, SearchNewsSource};
use morning_brief::services::breakfast_service::{BreakfastService, CalendarPicService};
use morning_brief::services::crawl_service::CrawlService;
use morning_brief::services::news_service::NewsService;
use morning_brief::util;

use chrono::NaiveDate;
use clap::{App, Arg, ArgMatches, SubCommand};
use env_logger::Env;
use log::{info, warn};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;

fn date_arg(required: bool) -> Arg<'static> {
    Arg::with_name("date")
        .short('d')
        .long("date")
        .value_name("DATE")
        .help("Target date (YYYY-MM-DD), defaults to the latest published trading day")
        .required(required)
        .takes_value(true)
}

fn parse_date_arg(matches: &ArgMatches) -> Result<Option<NaiveDate>, Box<dyn Error>> {
    Ok(matches.value_of("date").map(util::parse_date).transpose()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                record.args()
            )
        })
        .init();

    let app = App::new("MorningBrief")
        .version(env!("CARGO_PKG_VERSION"))
        .about("East Money morning briefing crawler")
        .arg(
            Arg::with_name("cache-dir")
                .long("cache-dir")
                .value_name("DIR")
                .help("Directory of the breakfast caches")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("news-cache-dir")
                .long("news-cache-dir")
                .value_name("DIR")
                .help("Directory of the stock news caches")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("page-size")
                .long("page-size")
                .value_name("N")
                .help("Entries per list page")
                .global(true)
                .takes_value(true),
        );

    // 添加子命令
    let app = app
        .subcommand(
            SubCommand::with_name("urls")
                .about("Regenerate the list page url cache")
                .arg(date_arg(false)),
        )
        .subcommand(
            SubCommand::with_name("crawl")
                .about("Crawl list pages until the breakfast cache is up to date")
                .arg(date_arg(false)),
        )
        .subcommand(
            SubCommand::with_name("lookup")
                .about("Find the breakfast article and calendar image of one day")
                .arg(date_arg(true)),
        )
        .subcommand(
            SubCommand::with_name("calendar")
                .about("Extract calendar images for every cached breakfast")
                .arg(date_arg(false)),
        )
        .subcommand(
            SubCommand::with_name("news")
                .about("Fetch news of one stock")
                .arg(
                    Arg::with_name("ticker")
                        .short('t')
                        .long("ticker")
                        .value_name("TICKER")
                        .help("Stock code, e.g. 300059")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("max")
                        .short('m')
                        .long("max")
                        .value_name("MAX")
                        .help("Maximum number of news items (capped at 100)")
                        .takes_value(true)
                        .default_value("10"),
                )
                .arg(date_arg(false)),
        );

    let matches = app.get_matches();

    // 创建配置
    let mut config = CrawlConfig::new();
    if let Some(dir) = matches.value_of("cache-dir") {
        config = config.with_cache_dir(dir);
    }
    if let Some(dir) = matches.value_of("news-cache-dir") {
        config = config.with_news_cache_dir(dir);
    }
    if let Some(size) = matches.value_of("page-size") {
        config = config.with_page_size(size.parse()?);
    }

    let calendar = Arc::new(TradingCalendar::a_share().clone());
    let fetcher = Arc::new(EastMoneyListScraper::new(&config.title_keyword)?);
    let crawl = Arc::new(CrawlService::new(config.clone(), calendar, fetcher));

    match matches.subcommand() {
        Some(("urls", sub)) => {
            let list = crawl.refresh_listing_urls(parse_date_arg(sub)?)?;
            info!("截至 {} 共 {} 个列表页", list.end_date, list.urls.len());
        }
        Some(("crawl", sub)) => {
            let report = crawl.ensure_covered(parse_date_arg(sub)?).await?;
            info!(
                "覆盖状态 {:?}，覆盖到 {:?}，新增 {} 条",
                report.state, report.last_covered_date, report.new_entries
            );
            if !report.failed_pages.is_empty() {
                warn!("失败的列表页: {:?}", report.failed_pages);
            }
        }
        Some(("lookup", sub)) => {
            let date = parse_date_arg(sub)?.ok_or("missing --date")?;
            let extractor = Arc::new(EastMoneyArticleScraper::new(&config)?);
            let record = BreakfastService::new(crawl, extractor).specific_date(date).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Some(("calendar", sub)) => {
            let extractor = Arc::new(EastMoneyArticleScraper::new(&config)?);
            let pics = CalendarPicService::new(crawl, extractor)
                .collect(parse_date_arg(sub)?)
                .await?;
            let found = pics.values().filter(|url| url.is_some()).count();
            info!("共 {} 期早餐，{} 期有日历图片", pics.len(), found);
        }
        Some(("news", sub)) => {
            let ticker = sub.value_of("ticker").ok_or("missing --ticker")?;
            let max_news: usize = sub.value_of("max").unwrap_or("10").parse()?;
            let sources: Vec<Arc<dyn NewsSource + Send + Sync>> = vec![
                Arc::new(EastMoneyNewsScraper::new()?),
                Arc::new(SearchNewsSource::new(HtmlSearchBackend::new()?)),
            ];
            let service = NewsService::new(CacheProvider::new(&config), sources);
            let news = service.get_stock_news(ticker, max_news, parse_date_arg(sub)?).await?;
            println!("{}", serde_json::to_string_pretty(&news)?);
        }
        _ => info!("No command specified. Use --help for usage information."),
    }

    Ok(())
}
