pub mod source_ctx;
pub mod source_flow;

pub use source_ctx::SourceCtx;
pub use source_flow::{SourceFlow, SourceOutcome};
