//! Load HTML fragments from files into a fixture container for unit tests.
//!
//! A [`FixtureLoader`] pairs a [`ResourceFetcher`] (where fragment files come from) with a
//! [`DocumentSink`] (the container that receives the markup). Loaded text has its newlines
//! stripped with [`normalize`] before it is written.

pub mod api;
pub mod config;
pub mod error;
pub mod internal;
pub mod logging;
pub mod utils;

pub use api::{DirFetcher, FetchResponse, HttpFetcher, MemoryFetcher, ResourceFetcher};
pub use config::FixtureConfig;
pub use error::FixtureError;
pub use internal::fixture::{FixtureLoader, LoadOptions};
pub use internal::sink::{DEFAULT_CONTAINER_ID, DocumentSink, HtmlSink, MemorySink};
pub use utils::newlines::normalize;
pub use tokio_util::sync::CancellationToken;
