use super::query::SearchQuery;
use super::search::SearchResult;

/// Drops results for other episodes when the query names both season and episode.
pub(crate) fn filter_mismatched(results: Vec<SearchResult>, query: &SearchQuery) -> Vec<SearchResult> {
    let Some(wanted) = query.season_episode() else {
        return results;
    };
    results
        .into_iter()
        .filter(|result| result.season_episode() == Some(wanted))
        .collect()
}

/// First acceptable result in service order.
pub(crate) fn select(results: Vec<SearchResult>, query: &SearchQuery) -> Option<SearchResult> {
    filter_mismatched(results, query).into_iter().next()
}
