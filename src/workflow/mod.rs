pub mod block_pipeline;
pub mod page_ctx;
pub mod page_scrape;

pub use block_pipeline::{BlockDraft, BlockPipeline, BlockStep, StepCtx, StepOutcome};
pub use page_ctx::PageCtx;
pub use page_scrape::PageScrapeOrchestrator;
