use std::fmt::{Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::AccessError;

pub const ROLE_ID_LEN: usize = 32;

/// Name of the role held by the owner, it administers every role
pub const ROOT_OWNER: &str = "ROOT_OWNER";

/**
 * 32-byte role identifier, the Keccak-256 digest of the role name
 */
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RoleId([u8; ROLE_ID_LEN]);

impl RoleId {
    /// Returned when looking up a name that is not registered
    pub const ZERO: RoleId = RoleId([0; ROLE_ID_LEN]);

    pub const fn new(bytes: [u8; ROLE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /**
     * Derive the identifier of a role name
     */
    pub fn from_name(name: &str) -> Self {
        let mut bytes = [0u8; ROLE_ID_LEN];
        bytes.copy_from_slice(&Keccak256::digest(name.as_bytes()));
        Self(bytes)
    }

    /**
     * Identifier of `ROOT_OWNER`, the admin role of every role unless configured otherwise
     */
    pub fn root_owner() -> Self {
        Self::from_name(ROOT_OWNER)
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; ROLE_ID_LEN] {
        &self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for RoleId {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| AccessError::InvalidRoleId(s.to_string()))?;
        let mut bytes = [0u8; ROLE_ID_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AccessError::InvalidRoleId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for RoleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_known_answers() {
        assert_eq!(
            RoleId::from_name("").to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            RoleId::from_name("abc").to_string(),
            "0x4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn derivation_is_stable() {
        assert_eq!(RoleId::from_name("MINTER"), RoleId::from_name("MINTER"));
        assert_ne!(RoleId::from_name("MINTER"), RoleId::from_name("minter"));
        assert_eq!(RoleId::root_owner(), RoleId::from_name("ROOT_OWNER"));
        assert!(!RoleId::root_owner().is_zero());
    }

    #[test]
    fn parse() {
        let id = RoleId::from_name("MINTER");
        assert_eq!(id.to_string().parse::<RoleId>().unwrap(), id);
        // Names never parse as identifiers
        assert!("MINTER".parse::<RoleId>().is_err());
        assert!("0x1234".parse::<RoleId>().is_err());
    }
}
