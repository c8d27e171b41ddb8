//! Embedding providers
//!
//! Converts chunk text and queries into fixed-dimension vectors behind the
//! [`Embedder`] trait. The process shares one [`LazyEmbedder`], which builds
//! its backend on first use.

mod hash;
mod http;
mod lazy;
mod traits;

pub use hash::{identifier_tokens, HashEmbedder, DEFAULT_DIMENSIONS};
pub use http::HttpEmbedder;
pub use lazy::LazyEmbedder;
pub use traits::Embedder;
