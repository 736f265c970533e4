//! HTTP adapters for the external collaborators.
//!
//! Each adapter does transport and decoding only and maps failures into
//! [`HttpError`], whose class decides whether a call may be retried.

pub mod gemini;
pub mod graph;
pub mod http;
pub mod media;
pub mod merge;
pub mod resolver;
pub mod telegram;

pub use gemini::GeminiClient;
pub use graph::GraphApiClient;
pub use http::HttpError;
pub use media::{HttpMediaFetcher, StoreMediaFetcher};
pub use merge::MergeClient;
pub use resolver::ResolverClient;
pub use telegram::TelegramNotifier;
