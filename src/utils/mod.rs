pub mod error;
pub mod logger;
pub mod url;

pub use logger::Logger;
pub use url::UrlUtils;
