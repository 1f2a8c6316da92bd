//! Best-effort classification of release-style file names.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NameGuess {
    Episode {
        series: Option<String>,
        title: Option<String>,
        release_group: Option<String>,
        season: Option<u32>,
        episode: Option<u32>,
    },
    Movie {
        title: Option<String>,
        year: Option<u32>,
    },
    Unknown,
}

pub(crate) trait NameClassifier {
    /// `name` is a file name with its extension already removed.
    fn classify(&self, name: &str) -> NameGuess;
}

static EPISODE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s._\-\[(])(?:s(?P<season>\d{1,2})[\s._-]?e(?P<episode>\d{1,3})|(?P<season_x>\d{1,2})x(?P<episode_x>\d{2,3}))(?:[\s._\-\])]|$)",
    )
    .expect("valid episode regex")
});

static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s._\-\[(])(?P<year>(?:19|20)\d{2})(?:[\s._\-\])]|$)").expect("valid year regex")
});

static RELEASE_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(?P<group>[A-Za-z0-9]+)$").expect("valid group regex"));

static QUALITY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:480p|576p|720p|1080p|2160p|4k|uhd|bluray|blu ray|brrip|bdrip|dvdrip|dvdscr|web dl|webdl|webrip|web|hdtv|hdrip|x264|x265|h 264|h 265|hevc|xvid|divx|aac|ac3|dts|proper|repack|remux|hdr|10bit|internal|limited)\b",
    )
    .expect("valid quality regex")
});

/// Regex classifier for scene/release naming (`Show.S01E02.Title-GROUP`,
/// `Movie.Title.1999.1080p`).
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ReleaseNameClassifier;

impl NameClassifier for ReleaseNameClassifier {
    fn classify(&self, name: &str) -> NameGuess {
        if let Some(caps) = EPISODE_MARKER.captures(name) {
            let Some(marker) = caps.get(0) else {
                return NameGuess::Unknown;
            };
            let season = caps
                .name("season")
                .or_else(|| caps.name("season_x"))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            let episode = caps
                .name("episode")
                .or_else(|| caps.name("episode_x"))
                .and_then(|m| m.as_str().parse::<u32>().ok());

            let (rest, release_group) = split_release_group(&name[marker.end()..]);
            return NameGuess::Episode {
                series: non_empty(clean_words(&name[..marker.start()])),
                title: non_empty(strip_quality_tags(&clean_words(rest))),
                release_group,
                season,
                episode,
            };
        }

        // A leading number is part of the title, so look past it for the year.
        if let Some(caps) = YEAR
            .captures_iter(name)
            .find(|caps| caps.get(0).is_some_and(|m| m.start() > 0))
            && let (Some(whole), Some(year)) = (caps.get(0), caps.name("year"))
        {
            return NameGuess::Movie {
                title: non_empty(clean_words(&name[..whole.start()])),
                year: year.as_str().parse::<u32>().ok(),
            };
        }

        let (rest, _) = split_release_group(name);
        match non_empty(strip_quality_tags(&clean_words(rest))) {
            Some(title) => NameGuess::Movie { title: Some(title), year: None },
            None => NameGuess::Unknown,
        }
    }
}

fn split_release_group(raw: &str) -> (&str, Option<String>) {
    match RELEASE_GROUP.captures(raw) {
        Some(caps) if QUALITY_TAG.is_match(&clean_words(raw)) => {
            let start = caps.get(0).map_or(raw.len(), |m| m.start());
            let group = caps.name("group").map(|m| m.as_str().to_string());
            (&raw[..start], group)
        }
        _ => (raw, None),
    }
}

fn clean_words(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch == '.' || ch == '_' { ' ' } else { ch })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|ch: char| ch == '-' || ch == '[' || ch == '(' || ch.is_whitespace())
        .to_string()
}

fn strip_quality_tags(cleaned: &str) -> String {
    let head = match QUALITY_TAG.find(cleaned) {
        Some(tag) => &cleaned[..tag.start()],
        None => cleaned,
    };
    head.trim_matches(|ch: char| ch == '-' || ch == '[' || ch == '(' || ch.is_whitespace())
        .to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> NameGuess {
        ReleaseNameClassifier.classify(name)
    }

    #[test]
    fn scene_episode_with_title_and_group() {
        assert_eq!(
            classify("Breaking.Bad.S01E01.Pilot.720p.HDTV.x264-CTU"),
            NameGuess::Episode {
                series: Some("Breaking Bad".to_string()),
                title: Some("Pilot".to_string()),
                release_group: Some("CTU".to_string()),
                season: Some(1),
                episode: Some(1),
            }
        );
    }

    #[test]
    fn episode_in_cross_notation_without_title() {
        assert_eq!(
            classify("The Office 2x05"),
            NameGuess::Episode {
                series: Some("The Office".to_string()),
                title: None,
                release_group: None,
                season: Some(2),
                episode: Some(5),
            }
        );
    }

    #[test]
    fn movie_with_year_drops_quality_tail() {
        assert_eq!(
            classify("The.Matrix.1999.1080p.BluRay.x264-GROUP"),
            NameGuess::Movie {
                title: Some("The Matrix".to_string()),
                year: Some(1999),
            }
        );
    }

    #[test]
    fn number_leading_the_title_is_not_the_year() {
        assert_eq!(
            classify("2001.A.Space.Odyssey.1968"),
            NameGuess::Movie {
                title: Some("2001 A Space Odyssey".to_string()),
                year: Some(1968),
            }
        );
    }

    #[test]
    fn plain_name_is_a_movie_without_year() {
        assert_eq!(
            classify("home_video"),
            NameGuess::Movie {
                title: Some("home video".to_string()),
                year: None,
            }
        );
    }

    #[test]
    fn dash_inside_a_plain_title_is_not_a_release_group() {
        assert_eq!(
            classify("Spider-Man"),
            NameGuess::Movie {
                title: Some("Spider-Man".to_string()),
                year: None,
            }
        );
    }

    #[test]
    fn only_tags_is_unknown() {
        assert_eq!(classify("1080p.x264"), NameGuess::Unknown);
        assert_eq!(classify("..."), NameGuess::Unknown);
    }
}
