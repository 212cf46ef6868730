pub mod browser;
pub mod http;
pub mod kleinanzeigen;
pub mod traits;
pub mod types;
pub mod url;

pub use browser::BrowserPageSource;
pub use http::HttpPageSource;
pub use kleinanzeigen::ListingExtractor;
pub use traits::PageSource;
pub use types::SearchCriteria;
pub use url::{build_url, SearchTarget};
