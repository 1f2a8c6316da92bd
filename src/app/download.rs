use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;

use crate::error::SsError;
use crate::http::{self, Timeouts};

use super::opensubtitles::USER_AGENT;

pub(crate) trait SubtitleFetcher {
    /// Raw (gzip-compressed) payload behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SsError>;
}

pub(crate) struct HttpFetcher {
    timeouts: Timeouts,
}

impl HttpFetcher {
    pub(crate) fn new() -> Self {
        Self {
            timeouts: Timeouts::default(),
        }
    }
}

impl SubtitleFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SsError> {
        http::get_bytes(url, USER_AGENT, self.timeouts).map_err(SsError::Network)
    }
}

fn staging_name(url: &str) -> &str {
    url.rsplit('/')
        .next()
        .map(|segment| segment.split(['?', '#']).next().unwrap_or(segment))
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or("subtitle.gz")
}

/// Downloads `url`, gunzips it and writes the subtitle to `destination`.
///
/// The compressed payload is staged in a temporary directory that is removed
/// on every exit path.
pub(crate) fn download_subtitle(
    fetcher: &dyn SubtitleFetcher,
    url: &str,
    destination: &Path,
) -> Result<(), SsError> {
    let payload = fetcher.fetch(url)?;

    let staging = tempfile::tempdir().map_err(|err| SsError::io(std::env::temp_dir(), err))?;
    let staged = staging.path().join(staging_name(url));
    fs::write(&staged, &payload).map_err(|err| SsError::io(&staged, err))?;
    debug!("staged {} bytes at {}", payload.len(), staged.display());

    let file = File::open(&staged).map_err(|err| SsError::io(&staged, err))?;
    let mut contents = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut contents)
        .map_err(|err| SsError::io(&staged, err))?;

    fs::write(destination, contents).map_err(|err| SsError::io(destination, err))
}

#[cfg(test)]
pub(crate) fn gzip(bytes: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("compress");
    encoder.finish().expect("finish gzip")
}
