//! Unified error type for the exposer.
//!
//! Every module keeps its own error enum; this module folds them into a
//! single [`Error`] so script-facing functions and public API calls share
//! one result type.

use thiserror::Error;

#[cfg(feature = "config")]
use crate::config::ConfigError;
use crate::policy::ConversionError;
use crate::proxy::ConstructionError;
use crate::resolve::ResolutionError;

/// Unified error type for all exposer operations.
///
/// # Example
///
/// ```ignore
/// use native_exposer::{Exposer, Realm, Result};
///
/// fn publish(exposer: &Exposer, realm: &Realm, calc: ObjectRef) -> Result<()> {
///     exposer.expose_instance(realm, "calc", calc)?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A value could not be converted across the boundary.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A type's exposed member set could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A native instance could not be constructed from script.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Configuration could not be loaded.
    #[cfg(feature = "config")]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A native member body failed.
    #[error("Native member '{member}' failed: {source}")]
    Native {
        member: String,
        #[source]
        source: anyhow::Error,
    },

    /// A script-level failure (bad receiver, read-only property, a thrown
    /// script error).
    #[error("Script error: {0}")]
    Script(String),

    /// The exposer that generated a function has been dropped.
    #[error("Exposer has been disposed")]
    Disposed,
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a script error from a message.
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    /// Classify an error returned by a native member body.
    ///
    /// Errors that started life as exposer errors (for example a callback
    /// that failed inside the script) are recovered as-is.
    pub(crate) fn from_native(member: &str, err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(err) => match err.downcast::<ConversionError>() {
                Ok(conversion) => Self::Conversion(conversion),
                Err(source) => Self::Native {
                    member: member.to_string(),
                    source,
                },
            },
        }
    }

    /// Returns `true` if this is a conversion error.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion(_))
    }

    /// Returns `true` if this is a resolution error.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Returns `true` if this is a construction error.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction(_))
    }

    /// Returns `true` if a native member body failed.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    /// Returns `true` if the owning exposer is gone.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_native_recovers_exposer_errors() {
        let err = Error::from_native("sum", anyhow::Error::new(Error::Disposed));
        assert!(err.is_disposed());

        let err = Error::from_native(
            "sum",
            anyhow::Error::new(ConversionError::MissingArgument { index: 1 }),
        );
        assert!(err.is_conversion());

        let err = Error::from_native("sum", anyhow::anyhow!("boom"));
        assert!(err.is_native());
        assert_eq!(err.to_string(), "Native member 'sum' failed: boom");
    }
}
