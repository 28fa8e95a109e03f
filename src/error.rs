//! Error types for the pack codec.

/// Errors that can occur while decoding or encoding packs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    /// The input is not a structurally valid pack.
    ///
    /// Malformed input will not become valid on retry; callers should reject
    /// the message.
    #[error("invalid pack: {0}")]
    InvalidPack(String),

    /// The value has no representation in the pack tag space.
    #[error("marshal error: {0}")]
    Marshal(String),
}

/// Alias for a `Result` with the error type [`PackError`].
pub type Result<T> = std::result::Result<T, PackError>;

impl PackError {
    /// Builds an [`InvalidPack`](Self::InvalidPack) error from any message.
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Self::InvalidPack(reason.to_string())
    }

    /// Builds a [`Marshal`](Self::Marshal) error from any message.
    pub fn marshal(reason: impl std::fmt::Display) -> Self {
        Self::Marshal(reason.to_string())
    }

    pub fn is_invalid_pack(&self) -> bool {
        matches!(self, Self::InvalidPack(_))
    }

    pub fn is_marshal(&self) -> bool {
        matches!(self, Self::Marshal(_))
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for PackError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::marshal(msg)
    }
}

#[cfg(feature = "serde")]
impl serde::de::Error for PackError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::invalid(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_reason() {
        let e = PackError::invalid("truncated header");
        assert_eq!(e.to_string(), "invalid pack: truncated header");
        assert!(e.is_invalid_pack());
        assert!(!e.is_marshal());

        let e = PackError::marshal("key too long");
        assert_eq!(e.to_string(), "marshal error: key too long");
        assert!(e.is_marshal());
    }
}
