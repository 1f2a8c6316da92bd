use std::fs;
use std::path::Path;

use crate::error::SsError;

use super::fingerprint::fingerprint;
use super::guess::{NameClassifier, NameGuess};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SearchQuery {
    Name {
        text: String,
        season: Option<u32>,
        episode: Option<u32>,
        language: String,
    },
    Fingerprint {
        hash: String,
        size: u64,
        language: String,
    },
}

impl SearchQuery {
    pub(crate) fn language(&self) -> &str {
        match self {
            Self::Name { language, .. } | Self::Fingerprint { language, .. } => language,
        }
    }

    /// Season and episode, only when the query carries both.
    pub(crate) fn season_episode(&self) -> Option<(u32, u32)> {
        match self {
            Self::Name {
                season: Some(season),
                episode: Some(episode),
                ..
            } => Some((*season, *episode)),
            _ => None,
        }
    }
}

fn quoted_terms<'a>(terms: impl IntoIterator<Item = Option<&'a str>>) -> String {
    terms
        .into_iter()
        .flatten()
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{term}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn build_name_query(
    path: &Path,
    language: &str,
    classifier: &dyn NameClassifier,
) -> SearchQuery {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (text, season, episode) = match classifier.classify(&stem) {
        NameGuess::Episode {
            series,
            title,
            release_group,
            season,
            episode,
        } => (
            quoted_terms([series.as_deref(), title.as_deref(), release_group.as_deref()]),
            season,
            episode,
        ),
        NameGuess::Movie { title, year } => {
            let year = year.map(|year| year.to_string());
            (quoted_terms([title.as_deref(), year.as_deref()]), None, None)
        }
        NameGuess::Unknown => {
            let raw = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            (raw, None, None)
        }
    };

    SearchQuery::Name {
        text,
        season,
        episode,
        language: language.to_string(),
    }
}

pub(crate) fn build_fingerprint_query(path: &Path, language: &str) -> Result<SearchQuery, SsError> {
    let hash = fingerprint(path)?;
    let size = fs::metadata(path)
        .map_err(|err| SsError::io(path, err))?
        .len();
    Ok(SearchQuery::Fingerprint {
        hash,
        size,
        language: language.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fingerprint::MIN_SIZE;

    struct FixedGuess(NameGuess);

    impl NameClassifier for FixedGuess {
        fn classify(&self, _name: &str) -> NameGuess {
            self.0.clone()
        }
    }

    struct RecordingGuess(std::cell::RefCell<Vec<String>>);

    impl NameClassifier for RecordingGuess {
        fn classify(&self, name: &str) -> NameGuess {
            self.0.borrow_mut().push(name.to_string());
            NameGuess::Unknown
        }
    }

    #[test]
    fn episode_query_quotes_present_terms_and_keeps_numbers() {
        let guess = FixedGuess(NameGuess::Episode {
            series: Some("Breaking Bad".to_string()),
            title: None,
            release_group: Some("CTU".to_string()),
            season: Some(1),
            episode: Some(2),
        });

        let query = build_name_query(Path::new("/tv/bb.s01e02.mkv"), "por", &guess);

        assert_eq!(
            query,
            SearchQuery::Name {
                text: "\"Breaking Bad\" \"CTU\"".to_string(),
                season: Some(1),
                episode: Some(2),
                language: "por".to_string(),
            }
        );
        assert_eq!(query.season_episode(), Some((1, 2)));
    }

    #[test]
    fn episode_without_episode_number_has_no_filter_pair() {
        let guess = FixedGuess(NameGuess::Episode {
            series: Some("Show".to_string()),
            title: Some(String::new()),
            release_group: None,
            season: Some(3),
            episode: None,
        });

        let query = build_name_query(Path::new("show.mkv"), "eng", &guess);

        assert_eq!(query.season_episode(), None);
        match query {
            SearchQuery::Name { text, season, .. } => {
                assert_eq!(text, "\"Show\"");
                assert_eq!(season, Some(3));
            }
            other => panic!("expected name query, got {other:?}"),
        }
    }

    #[test]
    fn movie_query_uses_title_and_year() {
        let guess = FixedGuess(NameGuess::Movie {
            title: Some("The Matrix".to_string()),
            year: Some(1999),
        });

        let query = build_name_query(Path::new("matrix.avi"), "eng", &guess);

        match query {
            SearchQuery::Name { text, season, episode, language } => {
                assert_eq!(text, "\"The Matrix\" \"1999\"");
                assert_eq!((season, episode), (None, None));
                assert_eq!(language, "eng");
            }
            other => panic!("expected name query, got {other:?}"),
        }
    }

    #[test]
    fn unknown_falls_back_to_file_name_and_classifier_sees_stem() {
        let classifier = RecordingGuess(std::cell::RefCell::new(Vec::new()));

        let query = build_name_query(Path::new("some/dir/weird name.mpg"), "spa", &classifier);

        assert_eq!(classifier.0.borrow().as_slice(), ["weird name"]);
        match query {
            SearchQuery::Name { text, language, .. } => {
                assert_eq!(text, "weird name.mpg");
                assert_eq!(language, "spa");
            }
            other => panic!("expected name query, got {other:?}"),
        }
    }

    #[test]
    fn fingerprint_query_carries_hash_and_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("movie.mkv");
        fs::write(&path, vec![0_u8; MIN_SIZE as usize]).expect("write movie");

        let query = build_fingerprint_query(&path, "eng").expect("fingerprint query");

        assert_eq!(
            query,
            SearchQuery::Fingerprint {
                hash: "0000000000020000".to_string(),
                size: MIN_SIZE,
                language: "eng".to_string(),
            }
        );
        assert_eq!(query.season_episode(), None);
    }

    #[test]
    fn fingerprint_query_propagates_small_file_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiny.mkv");
        fs::write(&path, b"tiny").expect("write movie");

        let result = build_fingerprint_query(&path, "eng");
        assert!(matches!(result, Err(SsError::FileTooSmall { .. })));
    }
}
