use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Stdio};

use log::debug;

use crate::error::SsError;

use super::naming::merged_movie_path;

pub(crate) trait ContainerMerger {
    /// Executable name, for messages.
    fn name(&self) -> String;

    fn is_available(&self) -> bool;

    /// Embeds `subtitle` into a container next to `movie`, returning its path.
    fn merge(&self, movie: &Path, subtitle: &Path, language: &str) -> Result<PathBuf, SsError>;
}

pub(crate) struct MkvMerge {
    program: PathBuf,
    leading_args: Vec<PathBuf>,
}

impl MkvMerge {
    pub(crate) fn new() -> Self {
        Self::with_program("mkvmerge", Vec::<PathBuf>::new())
    }

    /// Runs `program` with `leading_args` placed before the merge arguments,
    /// e.g. an interpreter and its script.
    pub(crate) fn with_program<I, A>(program: impl Into<PathBuf>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<PathBuf>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.program);
        cmd.args(&self.leading_args).stdin(Stdio::null());
        cmd
    }
}

fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

impl ContainerMerger for MkvMerge {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn is_available(&self) -> bool {
        self.command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn merge(&self, movie: &Path, subtitle: &Path, language: &str) -> Result<PathBuf, SsError> {
        let output_path = merged_movie_path(movie);
        debug!(
            "{} --output {} {} --language 0:{language} {}",
            self.name(),
            output_path.display(),
            movie.display(),
            subtitle.display()
        );
        let output = self
            .command()
            .arg("--output")
            .arg(&output_path)
            .arg(movie)
            .arg("--language")
            .arg(format!("0:{language}"))
            .arg(subtitle)
            .output()
            .map_err(|err| SsError::MergeFailure {
                path: movie.to_path_buf(),
                output: format!("failed to launch {}: {err}", self.name()),
            })?;

        if output.status.success() {
            Ok(output_path)
        } else {
            Err(SsError::MergeFailure {
                path: movie.to_path_buf(),
                output: combined_output(&output.stdout, &output.stderr),
            })
        }
    }
}
