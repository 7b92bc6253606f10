use gleaner_client::{HtmdCleaner, OpenAiExtractor, ReadabilityExtractor, ReqwestFetcher};
use gleaner_core::batch::BatchService;
use gleaner_core::error::AppError;
use gleaner_core::structured::StructuredService;

use crate::config::ServerConfig;

pub type PageBatch = BatchService<ReqwestFetcher, ReadabilityExtractor>;
pub type EventPipeline = StructuredService<ReqwestFetcher, HtmdCleaner, OpenAiExtractor>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: ServerConfig,
    pub batch: PageBatch,
    /// `None` when no LLM API key is configured.
    pub events: Option<EventPipeline>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::with_user_agent(&config.user_agent)?;
        let fetcher = if config.allow_private_urls {
            fetcher
        } else {
            fetcher.block_private_urls()
        };

        let events = match &config.llm {
            Some(llm) => {
                let extractor = OpenAiExtractor::with_base_url(&llm.api_key, &llm.model, &llm.base_url)?;
                Some(
                    StructuredService::new(fetcher.clone(), HtmdCleaner::new(), extractor)
                        .with_timeout(config.batch.timeout),
                )
            }
            None => None,
        };

        Ok(Self {
            batch: BatchService::new(fetcher, ReadabilityExtractor::new()),
            events,
            config,
        })
    }
}
