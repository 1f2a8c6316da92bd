use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, warn};

use crate::error::SsError;

use super::download::{SubtitleFetcher, download_subtitle};
use super::guess::NameClassifier;
use super::merge::ContainerMerger;
use super::naming::{merged_movie_path, resolve_subtitle_path};
use super::query::{build_fingerprint_query, build_name_query};
use super::search::{SearchSession, SubtitleSearch};
use super::select::select;

/// External services the pipeline talks to.
pub(crate) struct Collaborators<'a> {
    pub(crate) search: &'a dyn SubtitleSearch,
    pub(crate) fetcher: &'a dyn SubtitleFetcher,
    pub(crate) merger: &'a dyn ContainerMerger,
    pub(crate) classifier: &'a dyn NameClassifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Match {
    pub(crate) movie: PathBuf,
    pub(crate) download_link: String,
    pub(crate) extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepStatus {
    Done,
    Error,
    Skipped,
}

impl StepStatus {
    fn label(self) -> &'static str {
        match self {
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MovieReport {
    pub(crate) movie: PathBuf,
    pub(crate) matched: bool,
    pub(crate) subtitle: Option<PathBuf>,
    pub(crate) download: Option<StepStatus>,
    pub(crate) merge: Option<StepStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) movie: PathBuf,
    pub(crate) detail: String,
}

#[derive(Debug, Default)]
pub(crate) struct Report {
    pub(crate) movies: Vec<MovieReport>,
    pub(crate) failures: Vec<Failure>,
}

impl Report {
    fn movie_mut(&mut self, movie: &Path) -> Option<&mut MovieReport> {
        self.movies.iter_mut().find(|report| report.movie == movie)
    }

    fn fail(&mut self, movie: &Path, err: &SsError) {
        self.failures.push(Failure {
            movie: movie.to_path_buf(),
            detail: err.detail(),
        });
    }
}

const STATUS_COLUMN: usize = 70;

pub(crate) fn status_line(text: &str, status: &str) -> String {
    let spaces = STATUS_COLUMN.saturating_sub(text.chars().count()).max(2);
    format!("{text}{}{status}", " ".repeat(spaces))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Searches for every movie in one batched call and picks a match per movie.
///
/// The returned list is aligned with `movies`. Fingerprint failures are
/// returned separately; those movies are still searched by name.
pub(crate) fn find_matches(
    movies: &[PathBuf],
    language: &str,
    collaborators: &Collaborators<'_>,
) -> Result<(Vec<Option<Match>>, Vec<Failure>), SsError> {
    let mut queries = Vec::new();
    let mut owners = Vec::new();
    let mut name_queries = Vec::with_capacity(movies.len());
    let mut failures = Vec::new();

    for (index, movie) in movies.iter().enumerate() {
        let name_query = build_name_query(movie, language, collaborators.classifier);
        debug!("{}: {:?}", movie.display(), name_query);
        queries.push(name_query.clone());
        owners.push(index);
        name_queries.push(name_query);

        match build_fingerprint_query(movie, language) {
            Ok(hash_query) => {
                queries.push(hash_query);
                owners.push(index);
            }
            Err(err) => {
                warn!("{}: searching by name only: {err}", movie.display());
                failures.push(Failure {
                    movie: movie.clone(),
                    detail: err.detail(),
                });
            }
        }
    }

    let session = SearchSession::open(collaborators.search)?;
    let results = session.search(&queries)?;
    session.close();

    let mut per_movie = vec![Vec::new(); movies.len()];
    for (owner, batch) in owners.into_iter().zip(results) {
        per_movie[owner].extend(batch);
    }

    let matches = per_movie
        .into_iter()
        .zip(movies)
        .zip(&name_queries)
        .map(|((results, movie), query)| {
            select(results, query).map(|chosen| {
                debug!(
                    "{}: picked {}",
                    movie.display(),
                    chosen.file_name.as_deref().unwrap_or(&chosen.download_link)
                );
                Match {
                    movie: movie.clone(),
                    download_link: chosen.download_link,
                    extension: chosen.extension,
                }
            })
        })
        .collect();

    Ok((matches, failures))
}

/// Runs search, download and optional merge for `movies`, printing progress to `out`.
pub(crate) fn run_pipeline(
    movies: &[PathBuf],
    language: &str,
    merge: bool,
    collaborators: &Collaborators<'_>,
    out: &mut dyn Write,
) -> Result<Report> {
    let mut movies = movies.to_vec();
    movies.sort();

    writeln!(out, "Querying OpenSubtitles.org for {} file(s)...", movies.len())?;
    writeln!(out)?;

    let (matches, failures) = find_matches(&movies, language, collaborators)?;
    let mut report = Report {
        movies: Vec::with_capacity(movies.len()),
        failures,
    };

    let mut found = Vec::new();
    for (movie, matched) in movies.iter().zip(matches) {
        let status = if matched.is_some() { "OK" } else { "No matches found." };
        writeln!(out, "{}", status_line(&format!("- {}", display_name(movie)), status))?;
        report.movies.push(MovieReport {
            movie: movie.clone(),
            matched: matched.is_some(),
            subtitle: None,
            download: None,
            merge: None,
        });
        found.extend(matched);
    }

    if found.is_empty() {
        return Ok(report);
    }

    writeln!(out)?;
    writeln!(out, "Downloading...")?;
    let mut downloaded = Vec::new();
    for matched in &found {
        let subtitle = resolve_subtitle_path(&matched.movie, language, &matched.extension);
        let status = match download_subtitle(collaborators.fetcher, &matched.download_link, &subtitle) {
            Ok(()) => {
                downloaded.push((matched.movie.clone(), subtitle.clone()));
                StepStatus::Done
            }
            Err(err) => {
                warn!("{}: download failed: {err}", matched.movie.display());
                report.fail(&matched.movie, &err);
                StepStatus::Error
            }
        };
        writeln!(
            out,
            "{}",
            status_line(&format!(" - {}", display_name(&subtitle)), status.label())
        )?;
        if let Some(entry) = report.movie_mut(&matched.movie) {
            entry.subtitle = Some(subtitle);
            entry.download = Some(status);
        }
    }

    if merge && !downloaded.is_empty() {
        writeln!(out)?;
        writeln!(out, "Embedding MKV...")?;
        for (movie, subtitle) in &downloaded {
            let already_mkv = movie
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("mkv"));
            let (shown, status) = if already_mkv {
                (movie.clone(), StepStatus::Skipped)
            } else {
                match collaborators.merger.merge(movie, subtitle, language) {
                    Ok(output) => (output, StepStatus::Done),
                    Err(err) => {
                        warn!("{}: {err}", movie.display());
                        report.fail(movie, &err);
                        (merged_movie_path(movie), StepStatus::Error)
                    }
                }
            };
            writeln!(
                out,
                "{}",
                status_line(&format!(" - {}", display_name(&shown)), status.label())
            )?;
            if let Some(entry) = report.movie_mut(movie) {
                entry.merge = Some(status);
            }
        }
    }

    Ok(report)
}

/// Prints collected per-movie failures after the run.
pub(crate) fn print_failures(failures: &[Failure], out: &mut dyn Write) -> std::io::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", "_".repeat(80))?;
    for failure in failures {
        writeln!(out, ":{{{}}}:", failure.movie.display())?;
        writeln!(out, "{}", failure.detail.trim_end())?;
    }
    Ok(())
}
