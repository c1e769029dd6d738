//! Supported networks and the network → token → address table.
//!
//! The built-in table only lists token deployments with well-known addresses.
//! Anything else (testnet tokens, CST) is registered by the caller through
//! [`TokenRegistry::with_token`] before the client is constructed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::CosetError;

/// Networks a Coset oracle can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Mantle,
    MantleTestnet,
    Cronos,
    CronosTestnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mantle,
        Network::MantleTestnet,
        Network::Cronos,
        Network::CronosTestnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mantle => "mantle",
            Network::MantleTestnet => "mantle-testnet",
            Network::Cronos => "cronos",
            Network::CronosTestnet => "cronos-testnet",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mantle => 5000,
            Network::MantleTestnet => 5003,
            Network::Cronos => 25,
            Network::CronosTestnet => 338,
        }
    }

    /// CAIP-2 identifier, e.g. `eip155:5000`.
    pub fn caip2(&self) -> String {
        format!("eip155:{}", self.chain_id())
    }

    /// Public JSON-RPC endpoint.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Mantle => "https://rpc.mantle.xyz",
            Network::MantleTestnet => "https://rpc.sepolia.mantle.xyz",
            Network::Cronos => "https://evm.cronos.org",
            Network::CronosTestnet => "https://evm-t3.cronos.org",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = CosetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CosetError::Config(format!("unsupported network: {s}")))
    }
}

/// Token symbols accepted as payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentToken {
    Usdc,
    Cst,
}

impl PaymentToken {
    pub fn symbol(&self) -> &'static str {
        match self {
            PaymentToken::Usdc => "USDC",
            PaymentToken::Cst => "CST",
        }
    }
}

impl fmt::Display for PaymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PaymentToken {
    type Err = CosetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USDC" => Ok(PaymentToken::Usdc),
            "CST" => Ok(PaymentToken::Cst),
            _ => Err(CosetError::Config(format!("unsupported payment token: {s}"))),
        }
    }
}

/// A token deployment on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u32,
}

/// USDC on Mantle mainnet.
pub const MANTLE_USDC: Address = address!("0x09Bc4E0D864854c6aFB6eB9A9cdF58aC190D0dF9");

/// USDC on Cronos mainnet.
pub const CRONOS_USDC: Address = address!("0xc21223249CA28397B4B6541dfFaEcC539BfF0c59");

/// USDC has 6 decimal places on both networks.
pub const USDC_DECIMALS: u32 = 6;

/// Static (network, symbol) → token deployment table.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<(Network, PaymentToken), TokenInfo>,
}

impl TokenRegistry {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of well-known deployments.
    pub fn builtin() -> Self {
        Self::empty()
            .with_token(Network::Mantle, PaymentToken::Usdc, MANTLE_USDC, USDC_DECIMALS)
            .with_token(Network::Cronos, PaymentToken::Usdc, CRONOS_USDC, USDC_DECIMALS)
    }

    /// Add or replace one entry.
    pub fn with_token(
        mut self,
        network: Network,
        token: PaymentToken,
        address: Address,
        decimals: u32,
    ) -> Self {
        self.tokens
            .insert((network, token), TokenInfo { address, decimals });
        self
    }

    /// Resolve a symbol on a network. Missing entries are a configuration error.
    pub fn resolve(&self, network: Network, token: PaymentToken) -> Result<TokenInfo, CosetError> {
        self.tokens.get(&(network, token)).copied().ok_or_else(|| {
            CosetError::Config(format!("token {token} is not supported on network {network}"))
        })
    }
}
