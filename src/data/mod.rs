//! Data structures for differential expression analysis.

mod count_matrix;
mod dataset;
mod metadata;
mod result;

pub use count_matrix::CountMatrix;
pub use dataset::{AnnotatedDataset, DatasetStage};
pub use metadata::{Metadata, CONDITION_COLUMN};
pub use result::{DeResult, DeResultTable, ResultSummary, TABLE_HEADER};
