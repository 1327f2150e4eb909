//! The derivation code registry.
//!
//! Every CESR primitive starts with a code that tells a reader what the
//! material is and how long it is. Codes are not self-delimiting, so a reader
//! looks at the first character to learn how many "hard" characters make up
//! the code, then looks those up here to learn the soft size (index/count
//! characters), the full size, and the lead size.
//!
//! These tables must be reproduced bit-for-bit for interoperability, so they
//! are closed enums with `const` lookups rather than open maps.

/// Size metadata for a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizage {
    /// Hard size in chars (the stable part of the code).
    pub hs: usize,
    /// Soft size in chars (index, count, or variable size).
    pub ss: usize,
    /// Full size in chars. `None` for variable sized codes.
    pub fs: Option<usize>,
    /// Lead size in bytes prepended to raw before encoding.
    pub ls: usize,
}

impl Sizage {
    const fn fixed(hs: usize, fs: usize) -> Self {
        Self { hs, ss: 0, fs: Some(fs), ls: 0 }
    }

    const fn variable(hs: usize, ss: usize, ls: usize) -> Self {
        Self { hs, ss, fs: None, ls }
    }

    /// Raw size in bytes for a fixed code.
    pub fn raw_size(&self) -> Option<usize> {
        self.fs.map(|fs| ((fs - self.hs - self.ss) * 3) / 4 - self.ls)
    }
}

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[allow(non_camel_case_types)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every code in the table.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// The code's text form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            /// Look up a code by its exact text form.
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                $name::from_code(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown code {}", s)))
            }
        }
    };
}

code_table! {
    /// Codes for non-indexed material: keys, digests, seeds, signatures,
    /// numbers, and variable-length strings/bytes.
    MatterCode {
        /// Ed25519 256 bit random seed for private key
        Ed25519_Seed => "A",
        /// Ed25519 verification key non-transferable, basic derivation.
        Ed25519N => "B",
        /// X25519 public encryption key
        X25519 => "C",
        /// Ed25519 verification key basic derivation
        Ed25519 => "D",
        /// Blake3 256 bit digest self-addressing derivation.
        Blake3_256 => "E",
        /// Blake2b 256 bit digest self-addressing derivation.
        Blake2b_256 => "F",
        /// Blake2s 256 bit digest self-addressing derivation.
        Blake2s_256 => "G",
        /// SHA3 256 bit digest self-addressing derivation.
        SHA3_256 => "H",
        /// SHA2 256 bit digest self-addressing derivation.
        SHA2_256 => "I",
        /// ECDSA secp256k1 256 bit random Seed for private key
        ECDSA_256k1_Seed => "J",
        /// Ed448 448 bit random Seed for private key
        Ed448_Seed => "K",
        /// X448 public encryption key
        X448 => "L",
        /// Short 2 byte b2 number
        Short => "M",
        /// Big 8 byte b2 number
        Big => "N",
        /// X25519 private decryption key
        X25519_Private => "O",
        /// X25519 sealed box cipher bytes of sodium seed
        X25519_Cipher_Seed => "P",
        /// 128 bit random salt or 128 bit number
        Salt_128 => "0A",
        /// Ed25519 signature.
        Ed25519_Sig => "0B",
        /// ECDSA secp256k1 signature.
        ECDSA_256k1_Sig => "0C",
        /// Blake3 512 bit digest self-addressing derivation.
        Blake3_512 => "0D",
        /// Blake2b 512 bit digest self-addressing derivation.
        Blake2b_512 => "0E",
        /// SHA3 512 bit digest self-addressing derivation.
        SHA3_512 => "0F",
        /// SHA2 512 bit digest self-addressing derivation.
        SHA2_512 => "0G",
        /// Long 4 byte b2 number
        Long => "0H",
        /// ECDSA secp256k1 verification key non-transferable, basic derivation.
        ECDSA_256k1N => "1AAA",
        /// ECDSA secp256k1 verification or encryption key, basic derivation
        ECDSA_256k1 => "1AAB",
        /// Ed448 non-transferable prefix public signing verification key. Basic derivation.
        Ed448N => "1AAC",
        /// Ed448 public signing verification key. Basic derivation.
        Ed448 => "1AAD",
        /// Ed448 signature. Self-signing derivation.
        Ed448_Sig => "1AAE",
        /// Byte encoded 3 byte ternary
        Tern => "1AAF",
        /// Base64 custom encoded 32 char ISO-8601 DateTime
        DateTime => "1AAG",
        /// X25519 sealed box cipher bytes of sodium salt
        X25519_Cipher_Salt => "1AAH",
        /// String Base64 only lead size 0
        StrB64_L0 => "4A",
        /// String Base64 only lead size 1
        StrB64_L1 => "5A",
        /// String Base64 only lead size 2
        StrB64_L2 => "6A",
        /// String Base64 only big lead size 0
        StrB64_Big_L0 => "7AAA",
        /// String Base64 only big lead size 1
        StrB64_Big_L1 => "8AAA",
        /// String Base64 only big lead size 2
        StrB64_Big_L2 => "9AAA",
        /// Byte String lead size 0
        Bytes_L0 => "4B",
        /// Byte String lead size 1
        Bytes_L1 => "5B",
        /// Byte String lead size 2
        Bytes_L2 => "6B",
        /// Byte String big lead size 0
        Bytes_Big_L0 => "7AAB",
        /// Byte String big lead size 1
        Bytes_Big_L1 => "8AAB",
        /// Byte String big lead size 2
        Bytes_Big_L2 => "9AAB",
    }
}

impl MatterCode {
    /// Size metadata for this code.
    pub const fn sizage(&self) -> Sizage {
        use MatterCode::*;
        match self {
            Ed25519_Seed | Ed25519N | X25519 | Ed25519 | Blake3_256 | Blake2b_256 | Blake2s_256 | SHA3_256 | SHA2_256
            | ECDSA_256k1_Seed | X25519_Private => Sizage::fixed(1, 44),
            Ed448_Seed | X448 => Sizage::fixed(1, 76),
            Short => Sizage::fixed(1, 4),
            Big => Sizage::fixed(1, 12),
            X25519_Cipher_Seed => Sizage::fixed(1, 124),
            Salt_128 => Sizage::fixed(2, 24),
            Ed25519_Sig | ECDSA_256k1_Sig | Blake3_512 | Blake2b_512 | SHA3_512 | SHA2_512 => Sizage::fixed(2, 88),
            Long => Sizage::fixed(2, 8),
            ECDSA_256k1N | ECDSA_256k1 => Sizage::fixed(4, 48),
            Ed448N | Ed448 => Sizage::fixed(4, 80),
            Ed448_Sig => Sizage::fixed(4, 156),
            Tern => Sizage::fixed(4, 8),
            DateTime => Sizage::fixed(4, 36),
            X25519_Cipher_Salt => Sizage::fixed(4, 100),
            StrB64_L0 | Bytes_L0 => Sizage::variable(2, 2, 0),
            StrB64_L1 | Bytes_L1 => Sizage::variable(2, 2, 1),
            StrB64_L2 | Bytes_L2 => Sizage::variable(2, 2, 2),
            StrB64_Big_L0 | Bytes_Big_L0 => Sizage::variable(4, 4, 0),
            StrB64_Big_L1 | Bytes_Big_L1 => Sizage::variable(4, 4, 1),
            StrB64_Big_L2 | Bytes_Big_L2 => Sizage::variable(4, 4, 2),
        }
    }

    /// Is this a digest (self-addressing) code?
    pub fn is_digestive(&self) -> bool {
        use MatterCode::*;
        matches!(
            self,
            Blake3_256 | Blake2b_256 | Blake2s_256 | SHA3_256 | SHA2_256 | Blake3_512 | Blake2b_512 | SHA3_512 | SHA2_512
        )
    }

    /// Is this a public key code for a non-transferable identifier?
    pub fn is_non_transferable(&self) -> bool {
        use MatterCode::*;
        matches!(self, Ed25519N | ECDSA_256k1N | Ed448N)
    }

    /// Can this code be used as an identifier prefix?
    pub fn is_prefixive(&self) -> bool {
        use MatterCode::*;
        self.is_digestive() || matches!(self, Ed25519N | Ed25519 | ECDSA_256k1N | ECDSA_256k1 | Ed448N | Ed448)
    }

    /// Is this one of the number codes [`Number`](crate::cesr::Number) uses?
    pub fn is_numeric(&self) -> bool {
        use MatterCode::*;
        matches!(self, Short | Long | Big | Salt_128)
    }
}

/// The two families of variable sized material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFamily {
    /// Raw is base64 text decoded to bytes.
    StrB64,
    /// Raw is arbitrary bytes.
    Bytes,
}

impl VariableFamily {
    /// Pick the variable code for the given lead size, small or big.
    pub(crate) fn code(&self, ls: usize, big: bool) -> MatterCode {
        use MatterCode::*;
        match (self, big, ls) {
            (Self::StrB64, false, 0) => StrB64_L0,
            (Self::StrB64, false, 1) => StrB64_L1,
            (Self::StrB64, false, _) => StrB64_L2,
            (Self::StrB64, true, 0) => StrB64_Big_L0,
            (Self::StrB64, true, 1) => StrB64_Big_L1,
            (Self::StrB64, true, _) => StrB64_Big_L2,
            (Self::Bytes, false, 0) => Bytes_L0,
            (Self::Bytes, false, 1) => Bytes_L1,
            (Self::Bytes, false, _) => Bytes_L2,
            (Self::Bytes, true, 0) => Bytes_Big_L0,
            (Self::Bytes, true, 1) => Bytes_Big_L1,
            (Self::Bytes, true, _) => Bytes_Big_L2,
        }
    }
}

/// How many hard chars a matter code starting with `first` has.
pub(crate) fn matter_hard_size(first: u8) -> Option<usize> {
    match first {
        b'A'..=b'Z' | b'a'..=b'z' => Some(1),
        b'0' | b'4' | b'5' | b'6' => Some(2),
        b'1' | b'2' | b'3' | b'7' | b'8' | b'9' => Some(4),
        _ => None,
    }
}

/// Size metadata for indexed codes. Adds the "other" size: how many of the
/// soft chars carry the ondex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xizage {
    pub hs: usize,
    pub ss: usize,
    pub os: usize,
    pub fs: usize,
    pub ls: usize,
}

impl Xizage {
    const fn new(hs: usize, ss: usize, os: usize, fs: usize) -> Self {
        Self { hs, ss, os, fs, ls: 0 }
    }

    /// Raw size in bytes.
    pub fn raw_size(&self) -> usize {
        ((self.fs - self.hs - self.ss) * 3) / 4 - self.ls
    }
}

code_table! {
    /// Codes for indexed signatures.
    IndexerCode {
        /// Ed25519 sig appears same in both lists if any.
        Ed25519_Sig => "A",
        /// Ed25519 sig appears in current list only.
        Ed25519_Crt_Sig => "B",
        /// ECDSA secp256k1 sig appears same in both lists if any.
        ECDSA_256k1_Sig => "C",
        /// ECDSA secp256k1 sig appears in current list only.
        ECDSA_256k1_Crt_Sig => "D",
        /// Ed448 signature appears in both lists.
        Ed448_Sig => "0A",
        /// Ed448 signature appears in current list only.
        Ed448_Crt_Sig => "0B",
        /// Ed25519 sig appears in both lists.
        Ed25519_Big_Sig => "2A",
        /// Ed25519 sig appears in current list only.
        Ed25519_Big_Crt_Sig => "2B",
        /// ECDSA secp256k1 sig appears in both lists.
        ECDSA_256k1_Big_Sig => "2C",
        /// ECDSA secp256k1 sig appears in current list only.
        ECDSA_256k1_Big_Crt_Sig => "2D",
        /// Ed448 signature appears in both lists.
        Ed448_Big_Sig => "3A",
        /// Ed448 signature appears in current list only.
        Ed448_Big_Crt_Sig => "3B",
    }
}

impl IndexerCode {
    /// Size metadata for this code.
    pub const fn xizage(&self) -> Xizage {
        use IndexerCode::*;
        match self {
            Ed25519_Sig | Ed25519_Crt_Sig | ECDSA_256k1_Sig | ECDSA_256k1_Crt_Sig => Xizage::new(1, 1, 0, 88),
            Ed448_Sig | Ed448_Crt_Sig => Xizage::new(2, 2, 1, 156),
            Ed25519_Big_Sig | Ed25519_Big_Crt_Sig | ECDSA_256k1_Big_Sig | ECDSA_256k1_Big_Crt_Sig => Xizage::new(2, 4, 2, 92),
            Ed448_Big_Sig | Ed448_Big_Crt_Sig => Xizage::new(2, 6, 3, 160),
        }
    }

    /// Does this signature only count against the current key list?
    pub fn is_current_only(&self) -> bool {
        use IndexerCode::*;
        matches!(
            self,
            Ed25519_Crt_Sig | ECDSA_256k1_Crt_Sig | Ed448_Crt_Sig | Ed25519_Big_Crt_Sig | ECDSA_256k1_Big_Crt_Sig | Ed448_Big_Crt_Sig
        )
    }
}

/// How many hard chars an indexer code starting with `first` has.
pub(crate) fn indexer_hard_size(first: u8) -> Option<usize> {
    match first {
        b'A'..=b'Z' | b'a'..=b'z' => Some(1),
        b'0'..=b'4' => Some(2),
        _ => None,
    }
}

code_table! {
    /// Codes for counters, which frame groups of attached material.
    CounterCode {
        /// Qualified Base64 Indexed Signature.
        ControllerIdxSigs => "-A",
        /// Qualified Base64 Indexed Signature.
        WitnessIdxSigs => "-B",
        /// Composed Base64 Couple, pre+cig.
        NonTransReceiptCouples => "-C",
        /// Composed Base64 Quadruple, pre+snu+dig+sig.
        TransReceiptQuadruples => "-D",
        /// Composed Base64 Couple, fnu+dts.
        FirstSeenReplayCouples => "-E",
        /// Composed Base64 Group, pre+snu+dig+ControllerIdxSigs group.
        TransIdxSigGroups => "-F",
        /// Composed Base64 couple, snu+dig of given delegators or issuers event
        SealSourceCouples => "-G",
        /// Composed Base64 Group, pre+ControllerIdxSigs group.
        TransLastIdxSigGroups => "-H",
        /// Composed Base64 triple, pre+snu+dig of anchoring source event
        SealSourceTriples => "-I",
        /// Composed Base64 path+sig group
        SadPathSig => "-J",
        /// Composed Base64 Group path+TransIdxSigGroup of SAID of content
        SadPathSigGroup => "-K",
        /// Composed Grouped Pathed Material Quadlet (4 char each)
        PathedMaterialQuadlets => "-L",
        /// Composed Grouped Attached Material Quadlet (4 char each)
        AttachedMaterialQuadlets => "-V",
        /// Composed Grouped Attached Material Quadlet (4 char each)
        BigAttachedMaterialQuadlets => "-0V",
        /// KERI ACDC Protocol Stack CESR Version
        KERIProtocolStack => "--AAA",
    }
}

impl CounterCode {
    /// Size metadata for this code. Counters are always fixed size.
    pub const fn sizage(&self) -> Sizage {
        match self {
            Self::BigAttachedMaterialQuadlets => Sizage { hs: 3, ss: 5, fs: Some(8), ls: 0 },
            Self::KERIProtocolStack => Sizage { hs: 5, ss: 3, fs: Some(8), ls: 0 },
            _ => Sizage { hs: 2, ss: 2, fs: Some(4), ls: 0 },
        }
    }
}

/// How many hard chars a counter code starting with `selector` has. Counter
/// codes all start with `-`, so the second char picks the size.
pub(crate) fn counter_hard_size(selector: &[u8]) -> Option<usize> {
    match selector {
        [b'-', b'-', ..] => Some(5),
        [b'-', b'0', ..] => Some(3),
        [b'-', b'A'..=b'Z', ..] | [b'-', b'a'..=b'z', ..] => Some(2),
        _ => None,
    }
}
