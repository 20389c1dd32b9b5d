mod analysis;
mod chunk;
mod error;
mod query;
mod record;
mod session;
mod timerange;
pub mod vocab;

pub use analysis::{AnalysisResult, FailureCluster, SummaryStats};
pub use chunk::{ChunkKind, ClarificationRequest, IntentClassification, TextChunk};
pub use error::{InsightError, Result};
pub use query::{Intent, Query, QueryFilters, StatusFilter, StructuredQuery};
pub use record::{ExecutionRecord, NewDataEvent, TestStatus};
pub use session::SessionContext;
pub use timerange::TimeRange;
