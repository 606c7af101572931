pub mod asset_downloader;
pub mod content_fetcher;
pub mod iframe_resolver;
pub mod progress;

pub use asset_downloader::AssetDownloader;
pub use content_fetcher::{ContentFetcher, HtmlSource};
pub use iframe_resolver::{locate_content_frame, FetchedPage, FrameLookup, FrameNavigator};
pub use progress::{page_number_from_url, ProgressEngine};
