use crate::api::ResourceFetcher;
use crate::error::FixtureError;
use crate::internal::cache::FragmentCache;
use crate::internal::sink::DocumentSink;
use crate::utils::newlines::normalize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds for a single fragment load. The default is unbounded and not cancellable.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl LoadOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Loads fragment files through a [`ResourceFetcher`] and writes them into a [`DocumentSink`].
///
/// Loads that are not awaited before the next one starts race each other: whichever fetch
/// settles last wins the container. Await each load.
pub struct FixtureLoader<S, F> {
    sink: S,
    fetcher: F,
    defaults: LoadOptions,
    cache: Option<FragmentCache>,
}

impl<S, F> FixtureLoader<S, F>
where
    S: DocumentSink,
    F: ResourceFetcher,
{
    pub fn new(sink: S, fetcher: F) -> Self {
        Self {
            sink,
            fetcher,
            defaults: LoadOptions::default(),
            cache: None,
        }
    }

    /// Options used by [`load_fragment_file`](Self::load_fragment_file) and
    /// [`load_and_set_fragment`](Self::load_and_set_fragment).
    pub fn with_default_options(mut self, options: LoadOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Keep normalized fragments for `ttl` so repeated loads of one file skip the fetch.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(FragmentCache::new(ttl));
        self
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch `./<filename>` and return its text with all newlines stripped.
    pub async fn load_fragment_file(&self, filename: &str) -> Result<String, FixtureError> {
        self.load_fragment_file_with(filename, self.defaults.clone())
            .await
    }

    pub async fn load_fragment_file_with(
        &self,
        filename: &str,
        options: LoadOptions,
    ) -> Result<String, FixtureError> {
        if options.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(FixtureError::Cancelled {
                filename: filename.to_string(),
            });
        }

        if let Some(text) = self.cache.as_ref().and_then(|c| c.get(filename)) {
            return Ok(text);
        }

        let text = match &options.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(filename, "fixture load cancelled");
                        return Err(FixtureError::Cancelled {
                            filename: filename.to_string(),
                        });
                    }
                    result = self.fetch_bounded(filename, options.timeout) => result?,
                }
            }
            None => self.fetch_bounded(filename, options.timeout).await?,
        };

        if let Some(cache) = &self.cache {
            cache.set(filename, text.clone());
        }
        Ok(text)
    }

    /// Load `filename` and write the normalized text into the container.
    pub async fn load_and_set_fragment(&self, filename: &str) -> Result<(), FixtureError> {
        self.load_and_set_fragment_with(filename, self.defaults.clone())
            .await
    }

    pub async fn load_and_set_fragment_with(
        &self,
        filename: &str,
        options: LoadOptions,
    ) -> Result<(), FixtureError> {
        let text = self.load_fragment_file_with(filename, options).await?;
        self.set_fragment_text(&text);
        Ok(())
    }

    /// Write `text` into the container as is. No normalization is applied.
    pub fn set_fragment_text(&self, text: &str) {
        tracing::debug!(container = self.sink.id(), bytes = text.len(), "set fixture");
        self.sink.set_content(text);
    }

    pub fn get_fragment_text(&self) -> String {
        self.sink.content()
    }

    pub fn reset_fragment(&self) {
        tracing::debug!(container = self.sink.id(), "reset fixture");
        self.sink.reset();
    }

    async fn fetch_bounded(
        &self,
        filename: &str,
        timeout: Option<Duration>,
    ) -> Result<String, FixtureError> {
        let fetch = self.fetch_normalized(filename);
        match timeout {
            Some(after) => tokio::time::timeout(after, fetch).await.map_err(|_| {
                tracing::warn!(filename, ?after, "fixture fetch timed out");
                FixtureError::TimedOut {
                    filename: filename.to_string(),
                    after,
                }
            })?,
            None => fetch.await,
        }
    }

    async fn fetch_normalized(&self, filename: &str) -> Result<String, FixtureError> {
        let path = format!("./{}", filename);
        let response = self
            .fetcher
            .fetch(&path)
            .await
            .inspect_err(|e| tracing::warn!(filename, error = %e, "fixture fetch failed"))?;

        if !response.is_ok() {
            tracing::warn!(filename, status = response.status, "fixture fetch failed");
            return Err(FixtureError::Fetch {
                filename: filename.to_string(),
                status: response.status,
            });
        }

        let text = normalize(&response.body);
        tracing::debug!(filename, bytes = text.len(), "fixture loaded");
        Ok(text)
    }
}
