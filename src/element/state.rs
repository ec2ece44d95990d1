//! Load lifecycle types.

use serde::Serialize;

/// Where a controller is in its image loading lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// No source applied yet.
    #[default]
    Idle,
    /// A request is in flight for the current source.
    Loading,
    Loaded,
    Failed(FailureReason),
}

impl LoadState {
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Why a controller shows its fallback. Both render identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// `src` is absent or empty.
    MissingSource,
    /// The image failed to load or decode, for whatever reason.
    LoadFailure,
}

/// A request the host must resolve with [`LoadOutcome`].
///
/// `generation` identifies the request; a controller only accepts the
/// outcome of its most recent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub src: String,
}

/// Result of fetching and decoding an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Decoded,
    Error,
}

impl LoadOutcome {
    pub const fn from_ok(ok: bool) -> Self {
        if ok { Self::Decoded } else { Self::Error }
    }
}
