use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use fipi_scraper::storage::{MemoryRepository, ProblemRepository, TomlRepository};
use fipi_scraper::utils::logging;
use fipi_scraper::{App, Config, ScrapeOptions, StartPage, Subject};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "fipi-scraper")]
#[command(about = "抓取 FIPI 考试题库", long_about = None)]
struct Cli {
    /// 科目别名或官方名称（可多个）
    #[arg(value_parser = Subject::parse)]
    subjects: Vec<Subject>,

    /// 起始页（从 1 开始），auto 表示按已有记录推算
    #[arg(long, default_value = "auto")]
    start_page: StartPage,

    /// 本次最多抓取的页数
    #[arg(long)]
    max_pages: Option<u32>,

    /// 连续空页达到该值时停止
    #[arg(long, default_value_t = 2)]
    max_empty_pages: u32,

    /// 清空已有记录，从第 1 页开始
    #[arg(long)]
    force_restart: bool,

    /// 已知的最后一页
    #[arg(long)]
    last_page: Option<u32>,

    /// 页面导航超时（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 浏览器池大小
    #[arg(long)]
    pool_size: Option<usize>,

    /// 数据目录
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 列出所有科目后退出
    #[arg(long)]
    list_subjects: bool,

    /// 只抓取不落盘（记录保存在内存中）
    #[arg(long)]
    dry_run: bool,

    /// 以 JSON 输出汇总
    #[arg(long)]
    json: bool,

    /// 显示详细日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(pool_size) = self.pool_size {
            config.browser_pool_size = pool_size;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.page_timeout_secs = timeout;
        }
        config.verbose_logging |= self.verbose;
        config
    }

    fn options(&self, config: &Config) -> ScrapeOptions {
        ScrapeOptions {
            start_page: self.start_page,
            max_pages: self.max_pages,
            max_empty_pages: self.max_empty_pages,
            force_restart: self.force_restart,
            last_known_page: self.last_page,
            timeout_secs: config.page_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();

    // 初始化日志
    logging::init(config.verbose_logging);

    if cli.list_subjects {
        for subject in Subject::all() {
            println!(
                "{:<10} {:<40} {}",
                subject.alias(),
                subject.official_name(),
                subject.proj_id()
            );
        }
        return Ok(());
    }

    if cli.subjects.is_empty() {
        bail!("请至少指定一个科目（--list-subjects 查看全部科目）");
    }

    let options = cli.options(&config);
    options.validate().context("运行参数无效")?;

    let repository: Arc<dyn ProblemRepository> = if cli.dry_run {
        Arc::new(MemoryRepository::new())
    } else {
        Arc::new(TomlRepository::new(config.data_dir.clone()))
    };

    // 初始化并运行应用
    let app = App::initialize(config, repository).await?;
    let summaries = app.run(&cli.subjects, &options).await;
    app.shutdown().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if summaries.iter().any(|s| !s.success) {
        std::process::exit(1);
    }
    Ok(())
}
