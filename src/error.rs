//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while encoding material, building events, or
//! coordinating with other participants.
//!
//! Errors fall into a small taxonomy (see [`ErrorKind`]) so callers can tell
//! "this text is garbage" apart from "this configuration is invalid" apart
//! from "this signature does not verify" without matching every variant.

use thiserror::Error;

/// The broad class an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or undersized CESR text, or a declared/actual size mismatch.
    StructuralDecode,
    /// Invalid threshold/witness/count combination at construction time.
    Configuration,
    /// A digest or signature mismatch on otherwise well-formed input.
    CryptographicVerification,
    /// An external wait (multisig, delegation, operation) ran out of retries.
    CoordinationTimeout,
    /// A serializer or the OS got in the way.
    Serialization,
}

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// A multisig participant built its event from different inputs than we
    /// did. The digests will never line up.
    #[error("group inputs diverge from the local participant's inputs")]
    CoordinationInputMismatch,

    /// A coordination state machine was asked to make a move it can't make
    /// from where it is.
    #[error("invalid coordination transition: {0}")]
    CoordinationState(String),

    /// Waited as long as we were willing to.
    #[error("timed out waiting on {label} after {attempts} attempts")]
    CoordinationTimeout { label: String, attempts: u32 },

    /// Bad key.
    #[error("key is invalid")]
    CryptoBadKey,

    /// Bad seed given to a cryptographic function.
    #[error("incorrect seed given for keypair")]
    CryptoBadSeed,

    /// A recomputed digest does not match the one we were handed.
    #[error("digest does not match content")]
    CryptoDigestMismatch,

    /// Could not expand a key with HKDF.
    #[error("key stretching failed")]
    CryptoHKDFFailed,

    /// Could not generate key from password
    #[error("key derivation from password failed")]
    CryptoKDFFailed,

    /// Failed to open a sealed object.
    #[error("failed to open a sealed object")]
    CryptoOpenFailed,

    /// Failed to seal an object.
    #[error("failed to seal an object")]
    CryptoSealFailed,

    /// A signature failed to verify.
    #[error("the given signature/public key/data combo does not verify")]
    CryptoSignatureVerificationFailed,

    /// An error while decoding base64 text.
    #[error("base64 decoding error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// An event is missing something, has the wrong type, or otherwise can't
    /// be built or read as asked.
    #[error("invalid event: {0}")]
    EventInvalid(String),

    /// A required field is missing from a map.
    #[error("missing field `{0}`")]
    FieldMissing(String),

    /// An index or ondex doesn't fit the code it's being encoded with.
    #[error("invalid index {index} for code {code}")]
    InvalidIndex { code: String, index: u64 },

    /// A count doesn't fit the counter code it's being encoded with.
    #[error("invalid count {count} for code {code}")]
    InvalidCount { code: String, count: u64 },

    /// An IO error
    #[error("io error {0:?}")]
    IoError(#[from] std::io::Error),

    /// A keeper was asked to do something its configuration doesn't allow.
    #[error("keeper misconfigured: {0}")]
    KeeperInvalid(String),

    /// The prefix pads of a decoded primitive were not zero.
    #[error("non-zero pad bits in material")]
    NonZeroPad,

    /// Tried to rotate (or interact with) an identifier that committed to no
    /// next keys.
    #[error("identifier {0} is not transferable")]
    NonTransferable(String),

    /// A hex ordinal was malformed.
    #[error("invalid number: {0}")]
    NumberInvalid(String),

    /// More text was handed to a strict decoder than the code calls for.
    #[error("unexpected trailing material ({0} extra chars)")]
    Overage(usize),

    /// The prefix derivation rules weren't met.
    #[error("invalid prefix derivation: {0}")]
    PrefixInvalid(String),

    /// An error while engaging in json serialization.
    #[error("json serialization error")]
    SerializeJson(#[from] serde_json::Error),

    /// An error while engaging in yaml serialization.
    #[error("yaml serialization error")]
    SerializeYaml(#[from] serde_yaml::Error),

    /// Not enough material to decode the primitive.
    #[error("not enough material: need {need}, have {have}")]
    Shortage { need: usize, have: usize },

    /// Raw bytes don't match the size a code calls for.
    #[error("raw size mismatch for code {code}: expected {expected}, got {got}")]
    SizeMismatch { code: String, expected: usize, got: usize },

    /// A signing threshold is malformed or doesn't fit its key list.
    #[error("invalid signing threshold: {0}")]
    ThresholdInvalid(String),

    /// A code we recognize but can't do anything with (for instance, a digest
    /// algorithm we don't compute).
    #[error("unsupported code {0}")]
    UnsupportedCode(String),

    /// A serialization kind other than JSON.
    #[error("unsupported serialization kind {0}")]
    UnsupportedKind(String),

    /// The code at the front of the material isn't in our tables.
    #[error("unexpected code {0}")]
    UnexpectedCode(String),

    /// A version string failed to parse, or declares a size that doesn't
    /// match the message.
    #[error("invalid version string: {0}")]
    VersionInvalid(String),

    /// Witness list, cuts, adds, or toad don't add up.
    #[error("invalid witness configuration: {0}")]
    WitnessInvalid(String),
}

impl Error {
    /// Which part of the taxonomy this error lives in.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeserializeBase64(_)
            | Self::InvalidCount { .. }
            | Self::InvalidIndex { .. }
            | Self::NonZeroPad
            | Self::NumberInvalid(_)
            | Self::Overage(_)
            | Self::Shortage { .. }
            | Self::SizeMismatch { .. }
            | Self::UnexpectedCode(_)
            | Self::VersionInvalid(_) => ErrorKind::StructuralDecode,

            Self::CoordinationInputMismatch
            | Self::CoordinationState(_)
            | Self::EventInvalid(_)
            | Self::FieldMissing(_)
            | Self::KeeperInvalid(_)
            | Self::NonTransferable(_)
            | Self::PrefixInvalid(_)
            | Self::ThresholdInvalid(_)
            | Self::UnsupportedCode(_)
            | Self::UnsupportedKind(_)
            | Self::WitnessInvalid(_) => ErrorKind::Configuration,

            Self::CryptoBadKey
            | Self::CryptoBadSeed
            | Self::CryptoDigestMismatch
            | Self::CryptoHKDFFailed
            | Self::CryptoKDFFailed
            | Self::CryptoOpenFailed
            | Self::CryptoSealFailed
            | Self::CryptoSignatureVerificationFailed => ErrorKind::CryptographicVerification,

            Self::CoordinationTimeout { .. } => ErrorKind::CoordinationTimeout,

            Self::IoError(_) | Self::SerializeJson(_) | Self::SerializeYaml(_) => ErrorKind::Serialization,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // std::io::Error and the serializer errors are not comparable, so we
        // compare debug output instead.
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
