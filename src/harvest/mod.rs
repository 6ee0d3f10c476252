//! Harvest pipeline
//!
//! Photo handles flow through two queues:
//!
//! ```text
//! PhotoSource → intake queue → fetch workers → persistence queue → persistence workers → RecordStore
//! ```
//!
//! The [`Harvester`] owns a run from page fetching to teardown.

mod extractor;
mod orchestrator;
mod record;
mod workers;

pub use extractor::Extractor;
pub use orchestrator::{HarvestContext, HarvestReport, HarvestStage, Harvester};
pub use record::{index_score, PhotoRecord};
pub use workers::{fetch_worker, persist_record, persist_worker, FailedWrite, Pipeline, RunCounters};
