use std::fmt;

/// Result alias for binary manifest scanning.
pub type ParseResult<T> = Result<T, ParseError>;

/// Hard failures raised while scanning a binary manifest.
///
/// Everything else the scanner runs into (unknown chunks, garbage sizes, bad
/// string offsets, undecodable text) is absorbed and only narrows the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer cannot even hold the 8 byte document header.
    TooSmall { len: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooSmall { len } => {
                write!(f, "File too small ({len} bytes, need at least 8)")
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_small_message_mentions_length() {
        let err = ParseError::TooSmall { len: 3 };
        assert_eq!(err.to_string(), "File too small (3 bytes, need at least 8)");
    }
}
