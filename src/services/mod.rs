pub mod breakfast_service;
pub mod crawl_service;
pub mod news_service;
pub mod resolver;
