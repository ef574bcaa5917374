//! Filter, sort and paging primitives
//!
//! Each phase takes a sequence and produces a new one; nothing here mutates
//! its input. [`crate::engine::QueryEngine`] wires the phases together.

mod criteria;
mod dates;
mod filter;
mod paginator;
mod selectivity;
mod sort;
mod stream;

pub use criteria::{
    AttachmentPresence, CriteriaBuilder, FilterArgs, FilterCriteria, ReadStatus, build_criteria,
    build_criteria_at,
};
pub use dates::{parse_date_expression, parse_date_expression_at, validate_date_range};
pub use filter::{
    FilterOutcome, FilterStep, Predicate, PredicateKind, evaluate, evaluate_in_order,
    evaluate_with,
};
pub use paginator::{DEFAULT_PAGE_SIZE, PageInfo, Paginator};
pub use selectivity::{RankedPredicate, SelectivityEstimator};
pub use sort::{SortDirection, SortField, SortSpec, sort_in_place, sort_messages};
pub use stream::{
    CancellationToken, ChunkStream, DEFAULT_CHUNK_SIZE, DEFAULT_LARGE_RESULT_THRESHOLD,
    DEFAULT_STREAM_CEILING, StreamChunk, StreamOptions, StreamingPaginator,
};
