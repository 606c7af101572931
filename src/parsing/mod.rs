//! 解析层（纯函数）
//!
//! 输入 HTML 字符串，输出题块、元数据和变换后的 HTML，不做任何 I/O。

pub mod block_segmenter;
pub mod dom;
pub mod metadata_extractor;
pub mod pager;
pub mod transforms;

pub use block_segmenter::{identify_body, identify_header, segment, HeaderTier};
pub use metadata_extractor::{classify_task, MetadataExtractor};
pub use pager::detect_total_pages;
