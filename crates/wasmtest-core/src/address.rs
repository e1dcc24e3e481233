//! Contract and account addresses
//!
//! An address is a 20-byte identifier. Its text form is base58check:
//! a version byte, the 20 address bytes, and the first four bytes of a
//! double SHA-256 over both.

use sha2::{Digest, Sha256};

/// Length of an address in bytes
pub const ADDR_LEN: usize = 20;

/// Version byte prefixed to addresses before base58 encoding
pub const ADDRESS_VERSION: u8 = 0x17;

const CHECKSUM_LEN: usize = 4;

/// Fixed-length binary account or contract identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDR_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDR_LEN]);

    /// Derive an address from contract code or any other seed bytes.
    ///
    /// Takes the first 20 bytes of SHA-256 over the input.
    pub fn from_code(code: &[u8]) -> Self {
        let digest = Sha256::digest(code);
        let mut bytes = [0u8; ADDR_LEN];
        bytes.copy_from_slice(&digest[..ADDR_LEN]);
        Address(bytes)
    }

    pub fn to_base58(&self) -> String {
        let mut data = Vec::with_capacity(1 + ADDR_LEN + CHECKSUM_LEN);
        data.push(ADDRESS_VERSION);
        data.extend_from_slice(&self.0);
        let check = checksum(&data);
        data.extend_from_slice(&check);
        bs58::encode(data).into_string()
    }

    /// Parse a base58check address, verifying version byte and checksum.
    ///
    /// The error message is a bare reason; callers wrap it with the
    /// offending token.
    pub fn from_base58(encoded: &str) -> std::result::Result<Self, String> {
        let data = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| format!("invalid base58: {}", e))?;
        if data.len() != 1 + ADDR_LEN + CHECKSUM_LEN {
            return Err(format!("decoded length {} is not 25 bytes", data.len()));
        }
        if data[0] != ADDRESS_VERSION {
            return Err(format!("unknown address version 0x{:02x}", data[0]));
        }
        let (body, check) = data.split_at(1 + ADDR_LEN);
        if checksum(body).as_slice() != check {
            return Err("checksum mismatch".into());
        }
        let mut bytes = [0u8; ADDR_LEN];
        bytes.copy_from_slice(&body[1..]);
        Ok(Address(bytes))
    }
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
