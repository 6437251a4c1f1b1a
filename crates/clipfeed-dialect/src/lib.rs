//! The dialect-portable SQL layer (C1) and transactional runtime (C2).
//!
//! Every business query in the workspace is written once, with `?`
//! placeholders and the fragment helpers on [`Dialect`], and runs unchanged
//! against either backend that [`DialectHandle`] connects to.

mod dialect;
mod handle;
mod rewrite;
mod tx;

pub use dialect::Dialect;
pub use handle::{DialectHandle, Error, RewrittenQuery};
pub use rewrite::rewrite_placeholders;
pub use tx::with_tx;
