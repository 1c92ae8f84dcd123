//! Error type shared by every part of the colour engine.
//!
//! Nothing in the engine is fatal: callers log these and skip the affected
//! section, field or write, then carry on rendering.

use derive_more::{Display, Error};

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Error {
    /// Colour name missing from the palette registry.
    #[display("unknown colour '{name}'")]
    UnknownColor { name: String },
    /// Section name missing from the registry, or never assigned a colour.
    #[display("unknown section '{name}'")]
    UnknownSection { name: String },
    /// Inbound control payload (or one of its fields) could not be used.
    #[display("malformed payload: {reason}")]
    MalformedPayload { reason: String },
    /// A section's current colour has no position in the rotation ring.
    #[display("section '{section}' has colour '{color}' which is not in the rotation order")]
    RotationLookupFailure { section: String, color: String },
    /// Key/value store could not be read, written or committed.
    #[display("persistence unavailable: {reason}")]
    PersistenceUnavailable { reason: String },
    /// Pixel data could not be pushed to the strip.
    #[display("LED output unavailable: {reason}")]
    OutputUnavailable { reason: String },
    /// Registry definition violates a structural invariant.
    #[display("invalid palette: {reason}")]
    InvalidPalette { reason: String },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    pub(crate) fn unknown_color(name: &str) -> Self {
        Self::UnknownColor {
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown_section(name: &str) -> Self {
        Self::UnknownSection {
            name: name.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_palette(reason: impl Into<String>) -> Self {
        Self::InvalidPalette {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_key() {
        assert_eq!(
            Error::unknown_color("magenta").to_string(),
            "unknown colour 'magenta'"
        );
        let err = Error::RotationLookupFailure {
            section: "section02".to_string(),
            color: "white".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "section 'section02' has colour 'white' which is not in the rotation order"
        );
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_error(&Error::malformed("x"));
    }
}
