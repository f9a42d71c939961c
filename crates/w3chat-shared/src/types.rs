use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{ADDRESS_SIZE, DEFAULT_PAGE_SIZE};
use crate::error::AddressError;

// Principal identity = 20-byte account address, as handed over by the
// hosting runtime after it authenticated the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// The all-zero address carried by default (unregistered) records.
    pub const ZERO: Address = Address([0u8; ADDRESS_SIZE]);

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a hex address. The `0x` prefix is optional and either case is
    /// accepted.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_SIZE * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }
        let bytes = hex::decode(digits)?;
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn short(&self) -> String {
        self.to_hex()[..10].to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Sequential group identifier. The first group created gets id 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl GroupId {
    pub const FIRST: GroupId = GroupId(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of a private conversation. Built from the unordered pair of
/// participants, so `ThreadKey::new(a, b) == ThreadKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey(String);

impl ThreadKey {
    pub fn new(a: &Address, b: &Address) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{}:{}", hex::encode(lo.0), hex::encode(hi.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Offset/limit window over an append-only message sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// `(limit, offset)` clamped into SQLite's signed 64-bit range.
    pub fn sql_bounds(&self) -> (i64, i64) {
        let clamp = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        (clamp(self.limit), clamp(self.offset))
    }

    /// Number of items this window yields over a sequence of `len` items.
    pub fn expected_len(&self, len: u64) -> u64 {
        self.limit.min(len.saturating_sub(self.offset))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_address() -> Address {
        Address(rand::random())
    }

    #[test]
    fn test_address_hex_forms() {
        let addr = Address::from_hex("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(addr.to_hex(), "0xabcdef0123456789abcdef0123456789abcdef01");

        let bare = Address::from_hex("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(addr, bare);
        assert_eq!(addr.short(), "0xabcdef01");
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(AddressError::InvalidLength(4))
        ));
        assert!(Address::from_hex(&format!("0x{}", "zz".repeat(20))).is_err());
    }

    #[test]
    fn test_address_error_reports_bad_digit() {
        let err = Address::from_hex(&format!("0x{}", "zz".repeat(20))).unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidHex(hex::FromHexError::InvalidHexCharacter { c: 'z', index: 0 })
        );
        assert_ne!(err, AddressError::InvalidLength(40));
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = random_address();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_thread_key_is_symmetric() {
        let a = random_address();
        let b = random_address();
        assert_eq!(ThreadKey::new(&a, &b), ThreadKey::new(&b, &a));

        let c = random_address();
        if c != a && c != b {
            assert_ne!(ThreadKey::new(&a, &b), ThreadKey::new(&a, &c));
        }
    }

    #[test]
    fn test_page_expected_len() {
        let page = Page::new(0, 2);
        assert_eq!(page.expected_len(3), 2);
        assert_eq!(Page::new(2, 10).expected_len(3), 1);
        assert_eq!(Page::new(5, 10).expected_len(3), 0);
        assert_eq!(Page::new(0, 0).expected_len(3), 0);
    }

    #[test]
    fn test_page_sql_bounds_clamp() {
        let page = Page::new(u64::MAX, u64::MAX);
        assert_eq!(page.sql_bounds(), (i64::MAX, i64::MAX));
        assert_eq!(Page::new(3, 7).sql_bounds(), (7, 3));
    }

    #[test]
    fn test_group_id_sequence() {
        assert_eq!(GroupId::FIRST.next(), GroupId(2));
    }
}
