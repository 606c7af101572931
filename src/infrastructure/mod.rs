//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（浏览器进程、HTTP 客户端），只暴露能力，不认识题目和科目。

pub mod browser_handle;
pub mod page_session;
pub mod resource_pool;
pub mod transport;

pub use browser_handle::{launch_pool, BrowserHandle, BrowserPool};
pub use page_session::{PageSession, Viewport};
pub use resource_pool::{Lease, PooledResource, ResourcePool};
pub use transport::{AssetTransport, HttpTransport};
