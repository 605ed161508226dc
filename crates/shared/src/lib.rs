// Public modules
pub mod batch;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod io;
pub mod ledger;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod selection;
pub mod store;

// Re-export commonly used types
pub use batch::{parse_batch, parse_batch_value};
pub use config::Config;
pub use dates::{parse_cutoff_date, parse_publish_date};
pub use error::{BatchError, CurateError, StoreError};
pub use filter::{FilterEngine, FilterMeta, FilterOutcome, FilterQuery};
pub use ledger::{LedgerOutcome, LedgerStatus, PostingLedger};
pub use models::{Item, LedgerEntry, SelectionMode, Source, SourceSelector};
pub use normalize::normalize;
pub use pipeline::{choose, Pipeline};
pub use publish::{PublishStatus, Publisher};
pub use selection::{select_best, Selection};
pub use store::{MergeOutcome, RecordStore};
