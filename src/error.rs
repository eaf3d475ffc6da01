//! Crate-wide error types.

use displaydoc::Display;

/// Errors that can occur while signing, verifying, loading key material, or
/// parsing/encoding a signature file.
#[derive(Debug, Display)]
pub enum Error {
    /// signer index {0} out of range for a ring of size {1}
    SignerIndexOutOfRange(usize, usize),
    /// signer's secret key does not match ring member at index {0}
    SignerKeyMismatch(usize),
    /// ring member modulus at index {0} does not fit in the domain width
    ModulusTooLarge(usize),
    /// malformed PEM key material: {0}
    InvalidPem(String),
    /// unsupported or non-RSA key type
    UnsupportedKeyType,
    /// wrong password for encrypted private key
    BadPassword,
    /// invalid input: {0}
    InvalidArgument(String),
    /// malformed signature file: {0}
    Codec(CodecError),
    /// I/O error: {0}
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Codec(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Structural errors in the PEM+base64 signature wire format. Distinct from
/// a [`crate::ring::Ring::verify`] returning `false`: a `CodecError` means
/// the bytes never described a well-formed signature in the first place.
#[derive(Debug, Display)]
pub enum CodecError {
    /// signature file carries no ring public keys
    NoRingKeys,
    /// a ring needs at least 2 public keys, signature file carries {0}
    RingTooSmall(usize),
    /// base64 decode failure: {0}
    Base64(base64::DecodeError),
    /// signature file is missing the trailing integer/IV line
    MissingTrailer,
    /// signature file is missing the IV
    MissingIv,
    /// IV must be exactly 16 bytes, got {0}
    BadIvLength(usize),
    /// ring size ({0}) does not match encoded integer count ({1})
    RingSizeMismatch(usize, usize),
    /// malformed PEM block: {0}
    Pem(String),
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Base64(err) => Some(err),
            _ => None,
        }
    }
}
