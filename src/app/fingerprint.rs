//! OpenSubtitles movie hash: file size plus the little-endian 64-bit words of
//! the first and last 64 KiB, summed with wrapping arithmetic.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::SsError;

pub(crate) const WINDOW: u64 = 65536;
pub(crate) const MIN_SIZE: u64 = WINDOW * 2;

/// Computes the hash of `path` as a 16-digit lowercase hex string.
pub(crate) fn fingerprint(path: &Path) -> Result<String, SsError> {
    let mut file = File::open(path).map_err(|err| SsError::io(path, err))?;
    let size = file.metadata().map_err(|err| SsError::io(path, err))?.len();
    if size < MIN_SIZE {
        return Err(SsError::FileTooSmall {
            path: path.to_path_buf(),
            size,
            min: MIN_SIZE,
        });
    }

    let mut hash = size;
    hash = add_window(&mut file, hash).map_err(|err| SsError::io(path, err))?;
    file.seek(SeekFrom::Start(size.saturating_sub(WINDOW)))
        .map_err(|err| SsError::io(path, err))?;
    hash = add_window(&mut file, hash).map_err(|err| SsError::io(path, err))?;

    Ok(format!("{hash:016x}"))
}

fn add_window(file: &mut File, mut hash: u64) -> std::io::Result<u64> {
    let mut buffer = vec![0_u8; WINDOW as usize];
    file.read_exact(&mut buffer)?;
    for chunk in buffer.chunks_exact(8) {
        let mut word = [0_u8; 8];
        word.copy_from_slice(chunk);
        hash = hash.wrapping_add(i64::from_le_bytes(word) as u64);
    }
    Ok(hash)
}
