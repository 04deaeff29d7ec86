use thiserror::Error;

use crate::state::ParentState;

/// Which recorded contact an alignment request referred to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactKind {
    Wall,
    Ledge,
}

impl std::fmt::Display for ContactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactKind::Wall => f.write_str("wall"),
            ContactKind::Ledge => f.write_str("ledge"),
        }
    }
}

/// Errors raised while advancing the avatar.
///
/// Fatal variants mean the transition table or its metadata is broken and the
/// caller should stop ticking. The rest are local to one tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AvatarError {
    #[error("unhandled non-repeating animation {parent}/{state}")]
    MissingTransition {
        parent: ParentState,
        state: &'static str,
    },
    #[error("no animation metadata for {parent}/{state}")]
    MissingAnimation {
        parent: ParentState,
        state: &'static str,
    },
    #[error("more than {limit} chained regime changes in one tick (stopped in {parent}/{state})")]
    TransitionLimitExceeded {
        limit: usize,
        parent: ParentState,
        state: &'static str,
    },
    #[error("{regime} controller invoked for {parent}/{state}")]
    WrongRegime {
        regime: ParentState,
        parent: ParentState,
        state: &'static str,
    },
    #[error("no {contact} contact recorded")]
    NoSuchContact { contact: ContactKind },
    #[error("avatar controller not ready: {reason}")]
    NotReady { reason: &'static str },
}

impl AvatarError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AvatarError::MissingTransition { .. }
                | AvatarError::MissingAnimation { .. }
                | AvatarError::TransitionLimitExceeded { .. }
                | AvatarError::WrongRegime { .. }
        )
    }
}

/// Errors raised while loading or validating animation metadata.
#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("failed to read animation metadata: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse animation metadata: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown avatar state {parent}/{state}")]
    UnknownState { parent: String, state: String },
    #[error("clip {parent}/{state} has a frame count of zero")]
    EmptyClip {
        parent: &'static str,
        state: &'static str,
    },
    #[error(
        "clip {parent}/{state} lists {frames} frames of collision blocks \
         for {frame_count} animation frames"
    )]
    FrameMismatch {
        parent: &'static str,
        state: &'static str,
        frames: usize,
        frame_count: u32,
    },
    #[error("clip {parent}/{state} frame {frame} has no \"Avatar\" block")]
    MissingBodyBlock {
        parent: &'static str,
        state: &'static str,
        frame: usize,
    },
    #[error("clip {parent}/{state} is defined twice")]
    DuplicateClip {
        parent: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_matches_error_taxonomy() {
        let missing = AvatarError::MissingTransition {
            parent: ParentState::Standing,
            state: "Standing",
        };
        assert!(missing.is_fatal());
        assert!(!AvatarError::NotReady { reason: "no tiles" }.is_fatal());
        assert!(!AvatarError::NoSuchContact {
            contact: ContactKind::Wall
        }
        .is_fatal());
    }

    #[test]
    fn missing_transition_names_the_offending_state() {
        let err = AvatarError::MissingTransition {
            parent: ParentState::Falling,
            state: "Dead",
        };
        assert_eq!(
            err.to_string(),
            "unhandled non-repeating animation Charlie_Falling/Dead"
        );
    }
}
