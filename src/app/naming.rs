use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Subtitle formats offered by the search service.
pub(crate) const SUBTITLE_EXTENSIONS: [&str; 5] = [".sub", ".srt", ".ssa", ".smi", ".mpl"];

/// Sibling of `movie` named `<stem><suffix>`, keeping the stem's raw bytes.
fn sibling(movie: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(movie.file_stem().unwrap_or_default());
    name.push(suffix);
    match movie.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Picks where a downloaded subtitle goes.
///
/// `movie.srt`, then `movie.<language>.srt`, whichever does not exist yet.
/// When both exist, `movie.<language>.ss.srt` is returned even if it exists too
/// and the caller overwrites it.
pub(crate) fn resolve_subtitle_path(movie: &Path, language: &str, extension: &str) -> PathBuf {
    let candidates = [
        sibling(movie, extension),
        sibling(movie, &format!(".{language}{extension}")),
    ];
    for candidate in candidates {
        if !candidate.is_file() {
            return candidate;
        }
    }
    sibling(movie, &format!(".{language}.ss{extension}"))
}

pub(crate) fn has_subtitle(movie: &Path) -> bool {
    SUBTITLE_EXTENSIONS
        .iter()
        .any(|ext| sibling(movie, ext).is_file())
}

/// Output path of an mkv merge: the movie path with its extension swapped.
pub(crate) fn merged_movie_path(movie: &Path) -> PathBuf {
    movie.with_extension("mkv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn escalates_through_the_three_candidates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let movie = dir.path().join("movie.mkv");

        let first = resolve_subtitle_path(&movie, "eng", ".srt");
        assert_eq!(first, dir.path().join("movie.srt"));
        fs::write(&first, b"1").expect("write first");

        let second = resolve_subtitle_path(&movie, "eng", ".srt");
        assert_eq!(second, dir.path().join("movie.eng.srt"));
        fs::write(&second, b"2").expect("write second");

        let third = resolve_subtitle_path(&movie, "eng", ".srt");
        assert_eq!(third, dir.path().join("movie.eng.ss.srt"));
        fs::write(&third, b"3").expect("write third");

        // The last candidate is reused even though it exists.
        assert_eq!(resolve_subtitle_path(&movie, "eng", ".srt"), third);
    }

    #[test]
    fn relative_movie_in_current_directory() {
        assert_eq!(
            resolve_subtitle_path(Path::new("no-such-movie-here.avi"), "eng", ".sub"),
            PathBuf::from("no-such-movie-here.sub")
        );
    }

    #[test]
    fn only_the_final_extension_is_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let movie = dir.path().join("show.s01e01.720p.mkv");
        assert_eq!(
            resolve_subtitle_path(&movie, "por", ".srt"),
            dir.path().join("show.s01e01.720p.srt")
        );
    }

    #[test]
    fn directory_named_like_a_subtitle_does_not_block_the_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("movie.srt")).expect("create dir");
        assert_eq!(
            resolve_subtitle_path(&dir.path().join("movie.avi"), "eng", ".srt"),
            dir.path().join("movie.srt")
        );
    }

    #[test]
    fn has_subtitle_checks_every_known_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let movie = dir.path().join("film.avi");
        assert!(!has_subtitle(&movie));

        fs::write(dir.path().join("film.eng.srt"), b"x").expect("write");
        assert!(!has_subtitle(&movie), "language-tagged names do not count");

        fs::write(dir.path().join("film.smi"), b"x").expect("write");
        assert!(has_subtitle(&movie));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_stems_keep_their_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let movie = dir.path().join(OsStr::from_bytes(b"caf\xe9.avi"));
        let first = dir.path().join(OsStr::from_bytes(b"caf\xe9.srt"));

        assert_eq!(resolve_subtitle_path(&movie, "eng", ".srt"), first);
        assert!(!has_subtitle(&movie));

        fs::write(&first, b"1").expect("write subtitle");
        assert!(has_subtitle(&movie));
        assert_eq!(
            resolve_subtitle_path(&movie, "eng", ".srt"),
            dir.path().join(OsStr::from_bytes(b"caf\xe9.eng.srt"))
        );
    }

    #[test]
    fn merged_path_swaps_extension() {
        assert_eq!(
            merged_movie_path(Path::new("/m/clip.avi")),
            PathBuf::from("/m/clip.mkv")
        );
    }
}
