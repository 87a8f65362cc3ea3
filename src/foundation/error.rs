use crate::foundation::core::FrameIndex;

/// Convenience result type used across wovenglow.
pub type WovenResult<T> = Result<T, WovenError>;

/// Pipeline stage responsible for an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Option validation before any work starts.
    Config,
    /// Edge detection and candidate extraction.
    Extract,
    /// Seeded point-count reduction.
    Sample,
    /// Weave topology and timing construction.
    Weave,
    /// Template parsing and data embedding.
    Program,
    /// Frame-by-frame rasterization.
    Capture,
    /// Video encoding.
    Encode,
    /// Self-contained embed document.
    Embed,
}

impl Stage {
    /// Stable lowercase stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Extract => "extract",
            Self::Sample => "sample",
            Self::Weave => "weave",
            Self::Program => "program",
            Self::Capture => "capture",
            Self::Encode => "encode",
            Self::Embed => "embed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum WovenError {
    /// Unreadable or undecodable input (image file, data artifact).
    #[error("input error [{stage}]: {msg}")]
    Input {
        /// Stage that rejected the input.
        stage: Stage,
        /// What was wrong, naming the offending path or value.
        msg: String,
    },

    /// A stage produced nothing to animate.
    #[error("empty result [{stage}]: {msg}")]
    EmptyResult {
        /// Stage that came up empty.
        stage: Stage,
        /// Parameters that led to the empty result.
        msg: String,
    },

    /// The rendering template is missing or has malformed insertion markers.
    #[error("template error [program]: marker `{marker}`: {msg}")]
    Template {
        /// The marker that is missing, unknown or malformed.
        marker: String,
        /// Details.
        msg: String,
    },

    /// A frame failed to rasterize or persist; the run's frames are invalid.
    #[error("capture error [capture]: frame {frame}: {msg}")]
    Capture {
        /// Frame that failed.
        frame: FrameIndex,
        /// Details.
        msg: String,
    },

    /// Invalid or mutually inconsistent options.
    #[error("config error [{stage}]: {msg}")]
    Config {
        /// Stage whose options are inconsistent.
        stage: Stage,
        /// The offending parameter and value.
        msg: String,
    },

    /// The external encoder is missing; upstream artifacts remain valid.
    #[error("encoding unavailable [encode]: {0}")]
    EncodingUnavailable(String),

    /// The external encoder ran but did not produce a valid video.
    #[error("encoding error [encode]: {0}")]
    Encoding(String),

    /// Errors when serializing or deserializing artifacts.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WovenError {
    /// Build a [`WovenError::Input`] value.
    pub fn input(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Input {
            stage,
            msg: msg.into(),
        }
    }

    /// Build a [`WovenError::EmptyResult`] value.
    pub fn empty_result(stage: Stage, msg: impl Into<String>) -> Self {
        Self::EmptyResult {
            stage,
            msg: msg.into(),
        }
    }

    /// Build a [`WovenError::Template`] value.
    pub fn template(marker: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            marker: marker.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`WovenError::Capture`] value.
    pub fn capture(frame: FrameIndex, msg: impl Into<String>) -> Self {
        Self::Capture {
            frame,
            msg: msg.into(),
        }
    }

    /// Build a [`WovenError::Config`] value.
    pub fn config(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Config {
            stage,
            msg: msg.into(),
        }
    }

    /// Build a [`WovenError::EncodingUnavailable`] value.
    pub fn encoding_unavailable(msg: impl Into<String>) -> Self {
        Self::EncodingUnavailable(msg.into())
    }

    /// Build a [`WovenError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`WovenError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether the error must abort the run.
    ///
    /// Only a missing encoder is survivable: frames, data and program stay valid.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::EncodingUnavailable(_))
    }

    /// Re-tag any error raised while producing `frame` as a capture failure.
    pub(crate) fn at_frame(self, frame: FrameIndex) -> Self {
        match self {
            Self::Capture { .. } => self,
            other => Self::capture(frame, other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
