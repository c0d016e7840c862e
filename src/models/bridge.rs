//! Bridge records and their storage categories.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Pluggable transport advertised by a bridge line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Obfs4,
    Webtunnel,
}

impl Transport {
    /// Parse the leading transport tag of a bridge line.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "obfs4" => Some(Self::Obfs4),
            "webtunnel" => Some(Self::Webtunnel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Obfs4 => "obfs4",
            Self::Webtunnel => "webtunnel",
        }
    }
}

/// Address family of a bridge endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Classify a bracket-stripped address literal.
    ///
    /// Any colon means IPv6. This is a heuristic, not address validation.
    pub fn of(address: &str) -> Self {
        if address.contains(':') {
            Self::Ipv6
        } else {
            Self::Ipv4
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

/// Storage bucket for a bridge: transport crossed with address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category {
    pub transport: Transport,
    pub family: AddressFamily,
}

impl Category {
    pub const OBFS4_IPV4: Self = Self::new(Transport::Obfs4, AddressFamily::Ipv4);
    pub const OBFS4_IPV6: Self = Self::new(Transport::Obfs4, AddressFamily::Ipv6);
    pub const WEBTUNNEL_IPV4: Self = Self::new(Transport::Webtunnel, AddressFamily::Ipv4);
    pub const WEBTUNNEL_IPV6: Self = Self::new(Transport::Webtunnel, AddressFamily::Ipv6);

    /// Every category, in storage order.
    pub const ALL: [Self; 4] = [
        Self::OBFS4_IPV4,
        Self::OBFS4_IPV6,
        Self::WEBTUNNEL_IPV4,
        Self::WEBTUNNEL_IPV6,
    ];

    pub const fn new(transport: Transport, family: AddressFamily) -> Self {
        Self { transport, family }
    }

    /// Identifier used for file names, e.g. `obfs4_ipv4`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.transport.as_str(), self.family.as_str())
    }

    /// Heading used in notifications, e.g. `OBFS4 IPV4`.
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.transport.as_str().to_uppercase(),
            self.family.as_str().to_uppercase()
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.transport.as_str(), self.family.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

/// Transport-specific arguments of a bridge line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportArgs {
    Obfs4 {
        cert: String,
        #[serde(rename = "iat-mode")]
        iat_mode: String,
    },
    Webtunnel {
        url: String,
        ver: String,
    },
}

impl TransportArgs {
    pub fn transport(&self) -> Transport {
        match self {
            Self::Obfs4 { .. } => Transport::Obfs4,
            Self::Webtunnel { .. } => Transport::Webtunnel,
        }
    }
}

/// One advertised bridge, as persisted in a category store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRecord {
    /// The trimmed original line; identity for de-duplication
    #[serde(rename = "bridge")]
    pub raw: String,

    /// Address literal without brackets
    #[serde(rename = "ip")]
    pub address: String,

    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,

    /// 40 hex character relay identity
    pub fingerprint: String,

    #[serde(flatten)]
    pub args: TransportArgs,

    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

impl BridgeRecord {
    pub fn transport(&self) -> Transport {
        self.args.transport()
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// Category derived from the parsed content of the line.
    pub fn category(&self) -> Category {
        Category::new(self.transport(), self.family())
    }
}

/// Older stores wrote the port as a string.
fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
