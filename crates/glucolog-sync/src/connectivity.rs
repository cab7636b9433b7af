//! Network reachability model.
//!
//! The host platform reports its active network through the
//! [`Connectivity`] trait. Only two facts matter to the sync gate: whether
//! the network is connected (or connecting) and whether it is metered
//! mobile data.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of the active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NetworkType {
    /// Cellular data.
    Mobile,
    /// Cellular data over a tethering (dial-up networking) APN.
    MobileDun,
    /// Wireless LAN.
    Wifi,
    /// Wired LAN.
    Ethernet,
    /// Bluetooth tethering.
    Bluetooth,
    /// Virtual private network.
    Vpn,
    /// Anything else.
    Other,
}

impl NetworkType {
    /// Whether this is a metered mobile connection.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        matches!(self, NetworkType::Mobile | NetworkType::MobileDun)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkType::Mobile => "mobile",
            NetworkType::MobileDun => "mobile_dun",
            NetworkType::Wifi => "wifi",
            NetworkType::Ethernet => "ethernet",
            NetworkType::Bluetooth => "bluetooth",
            NetworkType::Vpn => "vpn",
            NetworkType::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "mobile" | "cellular" => Ok(NetworkType::Mobile),
            "mobile_dun" => Ok(NetworkType::MobileDun),
            "wifi" => Ok(NetworkType::Wifi),
            "ethernet" => Ok(NetworkType::Ethernet),
            "bluetooth" => Ok(NetworkType::Bluetooth),
            "vpn" => Ok(NetworkType::Vpn),
            "other" => Ok(NetworkType::Other),
            _ => Err(format!("unknown network type '{}'", s)),
        }
    }
}

/// Connection state of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// The host's active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub network_type: NetworkType,
    pub state: NetworkState,
}

impl NetworkInfo {
    /// A connected network of the given type.
    pub fn connected(network_type: NetworkType) -> Self {
        Self {
            network_type,
            state: NetworkState::Connected,
        }
    }

    /// Whether data can flow now or shortly.
    #[must_use]
    pub fn is_connected_or_connecting(&self) -> bool {
        matches!(
            self.state,
            NetworkState::Connected | NetworkState::Connecting
        )
    }

    /// Whether the network is metered mobile data.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.network_type.is_mobile()
    }
}

/// Source of the host's active network.
pub trait Connectivity: Send + Sync {
    /// The active network, or `None` when there is none.
    fn active_network(&self) -> Option<NetworkInfo>;
}

/// Connectivity with a fixed active network.
///
/// Used by hosts without a platform connectivity service (the CLI takes the
/// value from its configuration) and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConnectivity {
    network: Option<NetworkInfo>,
}

impl StaticConnectivity {
    /// Create with the given active network.
    pub fn new(network: Option<NetworkInfo>) -> Self {
        Self { network }
    }
}

impl Connectivity for StaticConnectivity {
    fn active_network(&self) -> Option<NetworkInfo> {
        self.network
    }
}
