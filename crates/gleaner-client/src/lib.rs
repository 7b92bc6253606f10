pub mod cleaner;
pub mod fetcher;
pub mod llm;
pub mod readability;

pub use cleaner::HtmdCleaner;
pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiExtractor;
pub use readability::ReadabilityExtractor;
