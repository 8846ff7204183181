pub mod dashboard;
pub mod etl;
pub mod load;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{
    DateRange, LoadOutcome, NeoRow, RawFeedPayload, RejectedRecord, RowSet, RunSummary,
    TransformOutput, Verification,
};
pub use crate::domain::ports::{ArtifactSink, FeedSource, Pipeline, RowStore, StoreConnector};
pub use crate::utils::error::Result;
