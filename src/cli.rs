use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "ss",
    version,
    about = "Searches for subtitles using OpenSubtitles (http://www.opensubtitles.org)",
    after_help = "If a directory is given, search for subtitles for all movies on it (non-recursively unless `recursive` is set)."
)]
pub struct Cli {
    /// Always display the configuration and enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Persist a setting (language, recursive, skip, mkv), e.g. `--set language=por`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Movie files or directories containing them
    #[arg(value_name = "FILE_OR_DIR", required_unless_present = "set")]
    pub inputs: Vec<PathBuf>,
}
