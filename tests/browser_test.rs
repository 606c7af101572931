use std::sync::Arc;

use fipi_scraper::infrastructure::launch_pool;
use fipi_scraper::services::HtmlSource;
use fipi_scraper::utils::logging;
use fipi_scraper::{Config, ContentFetcher, Subject};

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome 和网络：cargo test -- --ignored
async fn test_pool_launch_and_shutdown() {
    logging::init(true);

    let config = Config {
        browser_pool_size: 2,
        ..Config::from_env()
    };
    let pool = launch_pool(&config).await.expect("启动浏览器池失败");
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.available(), 2);

    {
        let lease = pool.acquire().await.expect("借出浏览器失败");
        assert_eq!(pool.available(), 1);
        assert!(lease.browser().version().await.is_ok());
    }
    assert_eq!(pool.available(), 2);

    pool.shutdown().await;
    assert!(pool.is_closed());
    assert!(pool.acquire().await.is_err());
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome 和网络：cargo test -- --ignored
async fn test_fetch_first_page() {
    logging::init(true);

    let config = Config {
        browser_pool_size: 1,
        ..Config::from_env()
    };
    let pool = Arc::new(launch_pool(&config).await.expect("启动浏览器池失败"));
    let fetcher = ContentFetcher::new(pool.clone(), &config);

    let page = fetcher
        .fetch(&Subject::Math.page_url(1), config.page_timeout())
        .await
        .expect("抓取页面失败");

    println!(
        "📄 {} 字节，来源 {}（iframe: {}）",
        page.html.len(),
        page.effective_url,
        page.from_frame
    );
    assert!(!page.html.is_empty());
    assert!(!fipi_scraper::parsing::segment(&page.html).is_empty());

    pool.shutdown().await;
}
