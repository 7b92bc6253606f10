pub mod batch;
pub mod error;
pub mod models;
pub mod sink;
pub mod source;
pub mod structured;
pub mod testutil;
pub mod traits;
pub mod util;

pub use batch::{BatchConfig, BatchReporter, BatchService, NullReporter, TracingBatchReporter};
pub use error::{AppError, ExtractionError};
pub use models::{
    ContentRecord, ErrorDescriptor, Event, FetchErrorKind, FetchOutcome, FetchRequest,
    OutcomeKind, ResultRecord,
};
pub use sink::{CsvSink, JsonlSink};
pub use structured::StructuredService;
pub use traits::{Cleaner, ContentExtractor, Extractor, Fetcher, ResultSink, StructuredExtractor};
pub use util::normalize_url;
