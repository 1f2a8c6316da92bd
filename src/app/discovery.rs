use std::collections::{HashSet, VecDeque};
use std::fs::{self, ReadDir};
use std::path::PathBuf;

use crate::error::SsError;

pub(crate) const MOVIE_EXTENSIONS: [&str; 4] = [".avi", ".mp4", ".mpg", ".mkv"];

/// Lazily walks the given inputs and yields movie files once each.
///
/// Explicit file inputs are yielded as-is, whatever their extension. Directory
/// entries are matched on the last four characters of their name (case
/// sensitive). An input that does not exist yields a `NotFound` item and the
/// walk carries on with the next input.
pub(crate) struct MovieFiles {
    inputs: VecDeque<PathBuf>,
    dirs: Vec<(PathBuf, ReadDir)>,
    recursive: bool,
    returned: HashSet<PathBuf>,
}

pub(crate) fn discover<I, P>(inputs: I, recursive: bool) -> MovieFiles
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    MovieFiles {
        inputs: inputs.into_iter().map(Into::into).collect(),
        dirs: Vec::new(),
        recursive,
        returned: HashSet::new(),
    }
}

fn has_movie_extension(name: &str) -> bool {
    let tail = name
        .char_indices()
        .rev()
        .nth(3)
        .map(|(idx, _)| &name[idx..])
        .unwrap_or(name);
    MOVIE_EXTENSIONS.contains(&tail)
}

impl MovieFiles {
    fn next_from_dirs(&mut self) -> Option<Result<PathBuf, SsError>> {
        while let Some((dir, entries)) = self.dirs.last_mut() {
            let entry = match entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => return Some(Err(SsError::io(dir.clone(), err))),
                None => {
                    self.dirs.pop();
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() {
                if self.recursive {
                    match fs::read_dir(&path) {
                        Ok(nested) => self.dirs.push((path, nested)),
                        Err(err) => return Some(Err(SsError::io(path, err))),
                    }
                }
                continue;
            }

            let name = entry.file_name();
            if has_movie_extension(&name.to_string_lossy()) && self.returned.insert(path.clone())
            {
                return Some(Ok(path));
            }
        }
        None
    }
}

impl Iterator for MovieFiles {
    type Item = Result<PathBuf, SsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.next_from_dirs() {
                return Some(item);
            }

            let input = self.inputs.pop_front()?;
            if input.is_file() {
                if self.returned.insert(input.clone()) {
                    return Some(Ok(input));
                }
                continue;
            }
            if !input.exists() {
                return Some(Err(SsError::NotFound { path: input }));
            }
            match fs::read_dir(&input) {
                Ok(entries) => self.dirs.push((input, entries)),
                Err(err) => return Some(Err(SsError::io(input, err))),
            }
        }
    }
}
