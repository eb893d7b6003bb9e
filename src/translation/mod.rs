/*!
 * Translation pipeline.
 *
 * - `request`: requests, media kinds and batch wire types
 * - `orchestrator`: one media item from source file to recorded result
 * - `batch`: batches of items, inline or through the queue
 * - `queue`: the pending-job queue hand-off
 */

pub use self::batch::{BatchCoordinator, DispatchPolicy};
pub use self::orchestrator::TranslationOrchestrator;
pub use self::queue::{JobQueue, LocalJobQueue, WorkUnit};
pub use self::request::{BatchItem, BatchResult, MediaKind, MediaRef, TranslationRequest};

pub mod batch;
pub mod orchestrator;
pub mod queue;
pub mod request;
