//! File name sanitization for downloaded playlists

/// Name used when a remote playlist or folder name sanitizes to nothing
const FALLBACK_NAME: &str = "Untitled";

/// Turn a remote playlist or folder name into a single safe path component
///
/// Filesystem-unsafe characters are replaced with visually similar Unicode
/// alternatives, so `AC/DC: Best Of` stays readable on disk. Leading dots are
/// replaced too, so a name can never become `..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' => '⧸',
            '\\' => '⧹',
            ':' => '꞉',
            '*' => '⁎',
            '?' => '？',
            '"' => '″',
            '<' => '‹',
            '>' => '›',
            '|' => '｜',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect();

    let trimmed = replaced.trim();
    let without_dots = trimmed.trim_start_matches('.');
    let dots = trimmed.len() - without_dots.len();

    let safe = format!("{}{}", "․".repeat(dots), without_dots);
    if safe.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe
    }
}

/// File name for a playlist, with the `.m3u` extension
pub fn playlist_file_name(name: &str) -> String {
    format!("{}.m3u", sanitize_filename(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_slashes() {
        assert_eq!(sanitize_filename("AC/DC Essentials"), "AC⧸DC Essentials");
    }

    #[test]
    fn test_sanitize_colon_and_quotes() {
        assert_eq!(
            sanitize_filename("Road Trip: \"Summer\""),
            "Road Trip꞉ ″Summer″"
        );
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Morning Coffee"), "Morning Coffee");
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Workout  "), "Workout");
    }

    #[test]
    fn test_dot_names_cannot_escape() {
        assert_eq!(sanitize_filename(".."), "․․");
        assert_eq!(sanitize_filename(".hidden"), "․hidden");
    }

    #[test]
    fn test_empty_name_falls_back() {
        assert_eq!(sanitize_filename("   "), "Untitled");
        assert_eq!(sanitize_filename(""), "Untitled");
    }

    #[test]
    fn test_playlist_file_name() {
        assert_eq!(playlist_file_name("Chill / Focus"), "Chill ⧸ Focus.m3u");
    }
}
