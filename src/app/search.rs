use log::{debug, warn};

use crate::error::SsError;

use super::query::SearchQuery;

/// One subtitle record as returned by the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchResult {
    pub(crate) download_link: String,
    /// Extension including the leading dot, e.g. `.srt`.
    pub(crate) extension: String,
    pub(crate) season: Option<String>,
    pub(crate) episode: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl SearchResult {
    pub(crate) fn season_episode(&self) -> Option<(u32, u32)> {
        let season = self.season.as_deref()?.trim().parse::<u32>().ok()?;
        let episode = self.episode.as_deref()?.trim().parse::<u32>().ok()?;
        Some((season, episode))
    }
}

pub(crate) trait SubtitleSearch {
    /// Returns the session token.
    fn log_in(&self) -> Result<String, SsError>;

    /// Runs every query in one request. The outer vector is aligned with `queries`.
    fn search(&self, token: &str, queries: &[SearchQuery])
    -> Result<Vec<Vec<SearchResult>>, SsError>;

    fn log_out(&self, token: &str) -> Result<(), SsError>;
}

/// A logged-in session. Logs out on [`SearchSession::close`] or when dropped.
pub(crate) struct SearchSession<'a> {
    service: &'a dyn SubtitleSearch,
    token: Option<String>,
}

impl<'a> SearchSession<'a> {
    pub(crate) fn open(service: &'a dyn SubtitleSearch) -> Result<Self, SsError> {
        let token = service.log_in()?;
        debug!("logged in to search service");
        Ok(Self {
            service,
            token: Some(token),
        })
    }

    pub(crate) fn search(&self, queries: &[SearchQuery]) -> Result<Vec<Vec<SearchResult>>, SsError> {
        let token = self.token.as_deref().unwrap_or_default();
        let mut results = self.service.search(token, queries)?;
        if results.len() != queries.len() {
            debug!(
                "search returned {} result lists for {} queries",
                results.len(),
                queries.len()
            );
        }
        results.resize_with(queries.len(), Vec::new);
        Ok(results)
    }

    pub(crate) fn close(mut self) {
        self.log_out();
    }

    fn log_out(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        match self.service.log_out(&token) {
            Ok(()) => debug!("logged out of search service"),
            Err(err) => warn!("logout failed: {err}"),
        }
    }
}

impl Drop for SearchSession<'_> {
    fn drop(&mut self) {
        self.log_out();
    }
}
