//! Per-run sync summary

use std::fmt;

/// What happened to one playlist during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// New remote playlist created from a local file
    Created,
    /// Local changes pushed to the remote
    Uploaded,
    /// Remote changes written to the local file
    Downloaded,
    /// Both sides changed and merged cleanly
    Merged,
    /// Both sides changed and a conflict was written locally
    Conflicted,
    /// Both sides changed to the same tracks
    Converged,
    DeletedRemote,
    DeletedLocal,
    /// Gone on both sides, state entry dropped
    Forgotten,
    Skipped,
    Failed,
}

impl Action {
    /// Every action, in summary order
    pub const ALL: [Action; 11] = [
        Action::Created,
        Action::Uploaded,
        Action::Downloaded,
        Action::Merged,
        Action::Conflicted,
        Action::Converged,
        Action::DeletedRemote,
        Action::DeletedLocal,
        Action::Forgotten,
        Action::Skipped,
        Action::Failed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Uploaded => "uploaded",
            Action::Downloaded => "downloaded",
            Action::Merged => "merged",
            Action::Conflicted => "conflicted",
            Action::Converged => "converged",
            Action::DeletedRemote => "deleted remotely",
            Action::DeletedLocal => "deleted locally",
            Action::Forgotten => "forgotten",
            Action::Skipped => "skipped",
            Action::Failed => "failed",
        }
    }

    /// Whether the outcome deserves its own line in the summary
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            Action::Merged
                | Action::Conflicted
                | Action::DeletedRemote
                | Action::DeletedLocal
                | Action::Skipped
                | Action::Failed
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome for a single playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistOutcome {
    /// Local path or remote name, whichever identifies the playlist best
    pub playlist: String,
    pub action: Action,
    /// Nothing was written, the action is what would have happened
    pub pretend: bool,
    pub detail: Option<String>,
}

impl fmt::Display for PlaylistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pretend {
            write!(f, "would be {}: {}", self.action, self.playlist)?;
        } else {
            write!(f, "{}: {}", self.action, self.playlist)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Result of a sync run
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<PlaylistOutcome>,
    /// Playlists that needed nothing
    pub unchanged: usize,
}

impl SyncReport {
    pub fn record(
        &mut self,
        playlist: impl Into<String>,
        action: Action,
        pretend: bool,
        detail: Option<String>,
    ) {
        self.outcomes.push(PlaylistOutcome {
            playlist: playlist.into(),
            action,
            pretend,
            detail,
        });
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    /// Outcome recorded for `playlist`, if any
    #[cfg(test)]
    pub fn outcome_for(&self, playlist: &str) -> Option<&PlaylistOutcome> {
        self.outcomes.iter().find(|o| o.playlist == playlist)
    }

    /// Whether anything was written, or would have been
    pub fn has_changes(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| !matches!(o.action, Action::Skipped | Action::Failed))
    }
}
