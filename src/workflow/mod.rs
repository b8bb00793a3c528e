pub mod post_ctx;
pub mod posting_pipeline;

pub use post_ctx::PostCtx;
pub use posting_pipeline::{PostReceipt, PostingPipeline};
