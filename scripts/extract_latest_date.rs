use morning_brief::config::CrawlConfig;
use morning_brief::data_provider::CacheProvider;
use anyhow::{bail, Context};

fn main() -> anyhow::Result<()> {
    let mut config = CrawlConfig::new();
    if let Some(dir) = std::env::args().nth(1) {
        config = config.with_cache_dir(dir);
    }

    // 检查缓存文件是否存在
    let provider = CacheProvider::new(&config);
    if !provider.breakfast_path().exists() {
        bail!(
            "缓存文件 {} 不存在，请先运行 'cargo run -- crawl'",
            provider.breakfast_path().display()
        );
    }

    let cache = provider.load_date_cache().context("读取早餐缓存失败")?;
    // 完整覆盖的日期记在列表页缓存里，没有时退回最新一条
    let listed = provider
        .load_url_list()
        .context("读取列表页缓存失败")?
        .map(|list| list.end_date);
    match listed.or_else(|| cache.latest_entry_date()) {
        Some(date) => {
            println!("最新覆盖日期: {}", date);
            println!("早餐条数: {}", cache.len());
        }
        None => println!("未找到有效的日期"),
    }

    Ok(())
}
