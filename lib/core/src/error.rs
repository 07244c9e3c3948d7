//! Error handling foundation for campaign-flow.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in its own
//! error module. Rejected connections and unready graphs are not errors;
//! they are ordinary return values of the engine.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Broken;

    impl std::fmt::Display for Broken {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "broken")
        }
    }

    impl std::error::Error for Broken {}

    fn fails() -> Result<(), Broken> {
        Err(Broken.into())
    }

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn typed_context_displays() {
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
