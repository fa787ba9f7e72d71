//! Error code conventions shared by every weft crate.
//!
//! Each layer defines its own `thiserror` enum and implements
//! [`ErrorCode`] on it, so callers can branch on a stable string code
//! and ask whether retrying could help without matching on variants of
//! crates they don't depend on.
//!
//! | Layer | Prefix |
//! |-------|--------|
//! | attribute protocol | `ATTR_` |
//! | business invocation | `COMPONENT_` |
//! | controller chain | `CONTROLLER_` |
//! | engine | `ENGINE_` |
//! | configuration | `CONFIG_` |
//!
//! # Example
//!
//! ```
//! use weft_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum PortError {
//!     Unbound,
//!     Busy,
//! }
//!
//! impl ErrorCode for PortError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Unbound => "PORT_UNBOUND",
//!             Self::Busy => "PORT_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! assert_eq!(PortError::Unbound.code(), "PORT_UNBOUND");
//! assert!(PortError::Busy.is_recoverable());
//! ```

/// Machine-readable error classification.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE
/// - prefixed with the layer (see module docs)
/// - stable once published
///
/// # Recoverability
///
/// An error is recoverable when the same call may succeed later without
/// changing the graph definition, e.g. a binding that is currently
/// missing but can be added, or a transition vetoed by a controller that
/// may approve next time. Malformed plans and contract mismatches are
/// not recoverable.
pub trait ErrorCode {
    /// Returns the stable error code.
    fn code(&self) -> &'static str;

    /// Returns whether a retry (possibly after a graph change) may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code is non-empty, prefixed and UPPER_SNAKE_CASE.
///
/// # Panics
///
/// Panics with a descriptive message if any check fails. Intended for
/// tests that enumerate every variant of an error enum.
///
/// # Example
///
/// ```
/// use weft_types::{assert_error_code, ErrorCode};
///
/// struct Gone;
///
/// impl ErrorCode for Gone {
///     fn code(&self) -> &'static str { "NODE_GONE" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Gone, "NODE_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Runs [`assert_error_code`] over a slice of errors.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    enum SampleError {
        Missing,
        Vetoed,
    }

    impl ErrorCode for SampleError {
        fn code(&self) -> &'static str {
            match self {
                Self::Missing => "SAMPLE_MISSING",
                Self::Vetoed => "SAMPLE_VETOED",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Vetoed)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(SampleError::Missing.code(), "SAMPLE_MISSING");
        assert!(!SampleError::Missing.is_recoverable());
        assert!(SampleError::Vetoed.is_recoverable());
    }

    #[test]
    fn all_sample_codes_valid() {
        assert_error_codes(&[SampleError::Missing, SampleError::Vetoed], "SAMPLE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&SampleError::Missing, "ENGINE_");
    }

    #[test]
    fn snake_case_checks() {
        assert!(is_upper_snake_case("ENGINE_UNBOUND"));
        assert!(is_upper_snake_case("ATTR_NOT_FOUND_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("engine_unbound"));
        assert!(!is_upper_snake_case("_ENGINE"));
        assert!(!is_upper_snake_case("ENGINE_"));
        assert!(!is_upper_snake_case("ENGINE__UNBOUND"));
    }
}
