pub mod block;
pub mod page_result;
pub mod problem;
pub mod record;
pub mod subject;

pub use block::{BlockPair, ElementGroup, MarkupNode};
pub use page_result::{LoopOutcome, PageResult, ScrapingSummary, StopReason};
pub use problem::{Problem, ProblemFactory, RecordFactory};
pub use record::{AssetKind, AssetRef, RawRecord};
pub use subject::Subject;
