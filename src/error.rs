use thiserror::Error;

/// Errors raised while constructing a tee.
///
/// Every variant is produced synchronously by
/// [`tee_with_options`](crate::tee_with_options) before any item is pulled
/// from the source; nothing in this crate fails once streaming has begun.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum TeeError {
    /// `max_chunk_difference` was NaN or negative.
    ///
    /// Any non-negative value is accepted, including `f64::INFINITY` to
    /// disable coordination entirely.
    #[error("max_chunk_difference must be a non-negative number, got {0}")]
    InvalidMaxChunkDifference(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_offending_value() {
        let err = TeeError::InvalidMaxChunkDifference(-1.0);
        assert_eq!(
            err.to_string(),
            "max_chunk_difference must be a non-negative number, got -1"
        );
    }
}
