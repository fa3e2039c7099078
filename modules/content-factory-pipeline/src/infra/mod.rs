pub mod apify;
pub mod openai;
pub mod storage;

pub use apify::ApifyScraper;
pub use openai::OpenAiAnalyzer;
pub use storage::LocalBlobStorage;
