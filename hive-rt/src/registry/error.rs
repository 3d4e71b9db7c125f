// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Failures raised by the handle registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every local id in the 24-bit handle space belongs to a live context.
    #[error("handle space exhausted")]
    OutOfHandles,

    /// The requested alias is already bound to a handle.
    #[error("name `{0}` is already bound")]
    NameTaken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RegistryError::OutOfHandles.to_string(),
            "handle space exhausted"
        );
        assert!(RegistryError::NameTaken("svc".to_string())
            .to_string()
            .contains("svc"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegistryError>();
    }
}
