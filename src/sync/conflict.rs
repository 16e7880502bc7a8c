//! Rendering merge output as playlist content
//!
//! A conflict is written as a git-style block in which every line is an
//! M3U comment:
//!
//! ```text
//! #<<<<<<< local
//! #artist/local-choice.mp3
//! #=======
//! #artist/remote-choice.mp3
//! #>>>>>>> remote
//! ```
//!
//! Players and a plain re-parse therefore see only the clean lines around the
//! block. To resolve, delete the marker lines and uncomment the entries to keep.
//! The sync engine refuses to sync a file that still contains markers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::merge::Segment;
use super::store::TrackId;
use crate::utils::m3u::COMMENT_MARKER;
use crate::utils::track_line;

pub const MARKER_LOCAL: &str = "#<<<<<<< local";
pub const MARKER_SEPARATOR: &str = "#=======";
pub const MARKER_REMOTE: &str = "#>>>>>>> remote";

/// Render merge segments as M3U content, with markers around conflicts
///
/// IDs missing from `paths` render as `# unresolved track <id>` comments, and
/// paths with no line form as `# unwritable path <path>`.
pub fn render_conflicted(
    segments: &[Segment],
    paths: &HashMap<TrackId, PathBuf>,
    base_dir: &Path,
) -> String {
    let line_for = |id: &TrackId| match paths.get(id) {
        Some(path) => track_line(path, base_dir)
            .unwrap_or_else(|| format!("# unwritable path {:?}", path)),
        None => format!("# unresolved track {}", id),
    };
    let alternative_for = |id: &TrackId| {
        let line = line_for(id);
        if line.starts_with(COMMENT_MARKER) {
            line
        } else {
            format!("{}{}", COMMENT_MARKER, line)
        }
    };

    let mut lines: Vec<String> = Vec::new();
    for seg in segments {
        match seg {
            Segment::Clean(ids) => lines.extend(ids.iter().map(line_for)),
            Segment::Conflict { local, remote } => {
                lines.push(MARKER_LOCAL.to_string());
                lines.extend(local.iter().map(alternative_for));
                lines.push(MARKER_SEPARATOR.to_string());
                lines.extend(remote.iter().map(alternative_for));
                lines.push(MARKER_REMOTE.to_string());
            }
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Whether playlist content still carries unresolved conflict markers
pub fn has_conflict_markers(content: &str) -> bool {
    content.lines().map(str::trim).any(|line| {
        line.starts_with(MARKER_LOCAL) || line == MARKER_SEPARATOR || line.starts_with(MARKER_REMOTE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_m3u;

    fn paths() -> HashMap<TrackId, PathBuf> {
        HashMap::from([
            (1, PathBuf::from("/music/track1.mp3")),
            (2, PathBuf::from("/music/local.mp3")),
            (3, PathBuf::from("/music/remote.mp3")),
            (4, PathBuf::from("/music/track4.mp3")),
        ])
    }

    fn conflicted() -> Vec<Segment> {
        vec![
            Segment::Clean(vec![1]),
            Segment::Conflict {
                local: vec![2],
                remote: vec![3],
            },
            Segment::Clean(vec![4]),
        ]
    }

    #[test]
    fn test_clean_segments_render_as_paths() {
        let content = render_conflicted(&[Segment::Clean(vec![1, 4])], &paths(), Path::new("/music"));
        assert_eq!(content, "track1.mp3\ntrack4.mp3\n");
        assert!(!has_conflict_markers(&content));
    }

    #[test]
    fn test_mixed_clean_and_conflict() {
        let content = render_conflicted(&conflicted(), &paths(), Path::new("/music"));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "track1.mp3",
                "#<<<<<<< local",
                "#local.mp3",
                "#=======",
                "#remote.mp3",
                "#>>>>>>> remote",
                "track4.mp3",
            ]
        );
        assert!(has_conflict_markers(&content));
    }

    #[test]
    fn test_unresolved_id_renders_placeholder() {
        let segments = vec![
            Segment::Clean(vec![1, 99]),
            Segment::Conflict {
                local: vec![98],
                remote: vec![],
            },
        ];
        let content = render_conflicted(&segments, &paths(), Path::new("/music"));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "# unresolved track 99");
        assert_eq!(lines[3], "# unresolved track 98");
    }

    #[test]
    fn test_plain_parse_sees_only_clean_lines() {
        let content = render_conflicted(&conflicted(), &paths(), Path::new("/music"));
        let parsed = parse_m3u(&content, Path::new("/music"));
        assert_eq!(
            parsed,
            vec![
                PathBuf::from("/music/track1.mp3"),
                PathBuf::from("/music/track4.mp3"),
            ]
        );
    }

    #[test]
    fn test_comment_like_names_stay_tracks() {
        let mut paths = paths();
        paths.insert(5, PathBuf::from("/music/#1 Crush.mp3"));
        let segments = vec![
            Segment::Clean(vec![5]),
            Segment::Conflict {
                local: vec![5],
                remote: vec![],
            },
        ];
        let content = render_conflicted(&segments, &paths, Path::new("/music"));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "/music/#1 Crush.mp3");
        assert_eq!(lines[2], "#/music/#1 Crush.mp3");
    }

    #[test]
    fn test_ordinary_comments_are_not_markers() {
        assert!(!has_conflict_markers("#EXTM3U\n# my favourites\ntrack.mp3\n"));
    }
}
