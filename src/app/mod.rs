mod discovery;
mod download;
mod fingerprint;
mod guess;
mod merge;
mod naming;
mod opensubtitles;
mod pipeline;
mod query;
mod search;
mod select;
mod xmlrpc;


use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::cli::Cli;
use crate::config::Configuration;
use crate::error::SsError;
use crate::paths::config_file_path;

use self::discovery::discover;
use self::download::HttpFetcher;
use self::guess::ReleaseNameClassifier;
use self::merge::MkvMerge;
use self::naming::has_subtitle;
use self::opensubtitles::{DEFAULT_ENDPOINT, OpenSubtitlesClient};
use self::pipeline::{Collaborators, print_failures, run_pipeline};

pub(crate) const EXIT_OK: u8 = 0;
pub(crate) const EXIT_NO_INPUT: u8 = 1;
pub(crate) const EXIT_SEARCH_FAILED: u8 = 3;
pub(crate) const EXIT_NO_MERGE_TOOL: u8 = 4;

pub fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = config_file_path()?;
    let mut config = Configuration::load(&config_path).with_context(|| {
        format!("failed to read configuration from {}", config_path.display())
    })?;

    if !cli.set.is_empty() {
        for assignment in &cli.set {
            config.apply_assignment(assignment)?;
        }
        config.save(&config_path).with_context(|| {
            format!("failed to write configuration to {}", config_path.display())
        })?;
        println!("Configuration written to {}", config_path.display());
        println!("{config}");
        if cli.inputs.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
        println!();
    } else if cli.verbose {
        println!("Configuration read from {}", config_path.display());
        println!("{config}");
        println!();
    }

    let search = OpenSubtitlesClient::new(DEFAULT_ENDPOINT);
    let fetcher = HttpFetcher::new();
    let merger = MkvMerge::new();
    let collaborators = Collaborators {
        search: &search,
        fetcher: &fetcher,
        merger: &merger,
        classifier: &ReleaseNameClassifier,
    };

    let mut stdout = io::stdout().lock();
    let code = run_with(&cli.inputs, &config, &collaborators, &mut stdout)?;
    Ok(ExitCode::from(code))
}

/// Everything after configuration: discovery, filtering, search, download, merge.
/// Returns the process exit code.
pub(crate) fn run_with(
    inputs: &[PathBuf],
    config: &Configuration,
    collaborators: &Collaborators<'_>,
    out: &mut dyn Write,
) -> Result<u8> {
    let mut movies = Vec::new();
    for item in discover(inputs, config.recursive) {
        match item {
            Ok(movie) => movies.push(movie),
            Err(err) => warn!("skipping input: {err}"),
        }
    }
    if movies.is_empty() {
        writeln!(out, "No files to search subtitles for. Aborting.")?;
        return Ok(EXIT_NO_INPUT);
    }

    if config.mkv && !collaborators.merger.is_available() {
        let missing = SsError::ToolUnavailable {
            tool: collaborators.merger.name(),
        };
        writeln!(out, "{missing}.")?;
        writeln!(
            out,
            "Either install mkvtoolnix or disable mkv merging in your config."
        )?;
        return Ok(EXIT_NO_MERGE_TOOL);
    }

    if config.skip {
        let before = movies.len();
        movies.retain(|movie| !has_subtitle(movie));
        let skipped = before - movies.len();
        if skipped > 0 {
            writeln!(out, "Skipping {skipped} files that already have subtitles.")?;
        }
    }

    writeln!(out, "Language: {}", config.language)?;
    if movies.is_empty() {
        return Ok(EXIT_NO_INPUT);
    }

    let report = match run_pipeline(&movies, &config.language, config.mkv, collaborators, out) {
        Ok(report) => report,
        Err(err) => match err.downcast_ref::<SsError>() {
            Some(SsError::Network(_) | SsError::Auth(_) | SsError::Protocol(_)) => {
                writeln!(out, "Search failed: {err}")?;
                return Ok(EXIT_SEARCH_FAILED);
            }
            _ => return Err(err),
        },
    };

    for movie in &report.movies {
        debug!(
            "{}: matched={} subtitle={:?} download={:?} merge={:?}",
            movie.movie.display(),
            movie.matched,
            movie.subtitle,
            movie.download,
            movie.merge
        );
    }
    print_failures(&report.failures, out)?;
    Ok(EXIT_OK)
}
