//! SMC key identifiers
//!
//! Every SMC register is addressed by a four-character ASCII key. Fan keys are
//! built from an index and a suffix (`F0Ac`, `F2Tg`, ...); sensor keys come from
//! the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SmcError};
use crate::smc::MAX_FANS;

/// A four-byte ASCII SMC key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SmcKey([u8; 4]);

/// Per-fan register suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanKey {
    /// Actual RPM (`Ac`, fpe2, read)
    Actual,
    /// Minimum RPM (`Mn`, fpe2, read)
    Minimum,
    /// Maximum RPM (`Mx`, fpe2, read)
    Maximum,
    /// Mode (`Md`, 1 byte, 0 = auto, 1 = manual)
    Mode,
    /// Target RPM (`Tg`, fpe2, write in manual mode)
    Target,
}

impl FanKey {
    /// The two suffix characters of this register
    pub const fn suffix(self) -> [u8; 2] {
        match self {
            FanKey::Actual => *b"Ac",
            FanKey::Minimum => *b"Mn",
            FanKey::Maximum => *b"Mx",
            FanKey::Mode => *b"Md",
            FanKey::Target => *b"Tg",
        }
    }
}

impl SmcKey {
    /// Parse a key from text. It must be exactly four ASCII bytes.
    pub fn new(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 4 || !text.is_ascii() {
            return Err(SmcError::InvalidParameter(format!(
                "SMC key must be exactly 4 ASCII characters, got {:?}",
                text
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Build a key from raw wire bytes
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        if !bytes.is_ascii() {
            return Err(SmcError::InvalidParameter(format!(
                "SMC key must be ASCII, got {:02X?}",
                bytes
            )));
        }
        Ok(Self(bytes))
    }

    /// Build the key for one register of fan `index` (`F<index><suffix>`)
    pub fn fan(index: u8, register: FanKey) -> Result<Self> {
        if index as usize >= MAX_FANS {
            return Err(SmcError::InvalidParameter(format!(
                "Fan index out of range: {} (must be 0-{})",
                index,
                MAX_FANS - 1
            )));
        }
        let [a, b] = register.suffix();
        Ok(Self([b'F', b'0' + index, a, b]))
    }

    /// Raw wire bytes, in transmission order
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Key as text
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for SmcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmcKey {
    type Err = SmcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SmcKey {
    type Error = SmcError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<SmcKey> for String {
    fn from(key: SmcKey) -> Self {
        key.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse() {
        let key = SmcKey::new("TC0P").unwrap();
        assert_eq!(key.as_bytes(), b"TC0P");
        assert_eq!(key.to_string(), "TC0P");
    }

    #[test]
    fn test_key_with_space() {
        let key: SmcKey = "REV ".parse().unwrap();
        assert_eq!(key.as_bytes(), b"REV ");
    }

    #[test]
    fn test_key_wrong_length() {
        assert!(matches!(
            SmcKey::new("TC10C"),
            Err(SmcError::InvalidParameter(_))
        ));
        assert!(SmcKey::new("TC0").is_err());
        assert!(SmcKey::new("").is_err());
    }

    #[test]
    fn test_key_non_ascii() {
        // "T°C" is four bytes but not ASCII
        assert!(SmcKey::new("T°C").is_err());
    }

    #[test]
    fn test_fan_keys() {
        assert_eq!(SmcKey::fan(0, FanKey::Actual).unwrap().as_str(), "F0Ac");
        assert_eq!(SmcKey::fan(1, FanKey::Minimum).unwrap().as_str(), "F1Mn");
        assert_eq!(SmcKey::fan(2, FanKey::Maximum).unwrap().as_str(), "F2Mx");
        assert_eq!(SmcKey::fan(3, FanKey::Mode).unwrap().as_str(), "F3Md");
        assert_eq!(SmcKey::fan(5, FanKey::Target).unwrap().as_str(), "F5Tg");
    }

    #[test]
    fn test_fan_key_index_out_of_range() {
        let result = SmcKey::fan(6, FanKey::Actual);
        assert!(matches!(result, Err(SmcError::InvalidParameter(_))));
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = SmcKey::new("TA0P").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"TA0P\"");

        let back: SmcKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<SmcKey>("\"TOOLONG\"").is_err());
    }
}
