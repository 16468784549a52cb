//! Enumerations shared by the capture and reader paths.

use serde::{Deserialize, Serialize};

/// Book side of a quote.
///
/// On disk the side is a single ASCII tag byte (`b'b'` / `b'a'`), which is
/// what the capture files have always carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Bid,
    Ask,
}

impl Side {
    pub const BID_TAG: u8 = b'b';
    pub const ASK_TAG: u8 = b'a';

    /// The on-disk tag byte.
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            Self::Bid => Self::BID_TAG,
            Self::Ask => Self::ASK_TAG,
        }
    }

    /// Parse an on-disk tag byte. Returns `None` for unknown tags.
    #[inline]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            Self::BID_TAG => Some(Self::Bid),
            Self::ASK_TAG => Some(Self::Ask),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Bid => "b",
            Self::Ask => "a",
        })
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bid" | "b" => Ok(Self::Bid),
            "ask" | "a" => Ok(Self::Ask),
            other => Err(format!("unknown side `{other}` (expected bid or ask)")),
        }
    }
}
