// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the service configuration.
//!
//! The configuration is a TOML document with four directives:
//!
//! ```toml
//! connection = "/var/run/chain/node.ipc"
//! ethlinknameservers = ["ns1.ethdns.xyz", "ns2.ethdns.xyz"]
//! ipfsgatewaya = ["176.9.154.81"]
//! ipfsgatewayaaaa = ["2a01:4f8:160:4069::2"]
//! ```
//!
//! `connection` (the backend RPC endpoint, a URL or socket path) and
//! at least one nameserver are required; the gateway address lists may
//! be empty, which disables the corresponding record synthesis.
//! Nameservers may be written without the trailing dot. Unrecognized
//! directives are fatal, as is any value that does not parse.

use std::fmt;
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{de, Deserialize};

use crate::engine::Policy;
use crate::name::Name;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads and validates the configuration from the file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw = fs::read_to_string(path.as_ref()).context("failed to read the configuration file")?;
    load_from_str(&raw)
}

/// Loads and validates a configuration document.
pub fn load_from_str(raw: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(raw).context("failed to parse the configuration file")?;
    config.validate()?;
    debug!(
        "Configuration loaded:\n\
         Connection:  {}\n\
         Nameservers: {}\n\
         Gateway A:   {}\n\
         Gateway AAAA: {}",
        config.connection,
        config.eth_link_name_servers.len(),
        config.ipfs_gateway_a.len(),
        config.ipfs_gateway_aaaa.len(),
    );
    Ok(config)
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION STRUCTURE                                            //
////////////////////////////////////////////////////////////////////////

/// The complete configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The backend RPC endpoint (URL or local socket path).
    pub connection: String,

    /// The authoritative nameserver names.
    #[serde(rename = "ethlinknameservers")]
    pub eth_link_name_servers: Vec<ConfigName>,

    /// Default A targets in content-hash mode.
    #[serde(rename = "ipfsgatewaya", default)]
    pub ipfs_gateway_a: Vec<Ipv4Addr>,

    /// Default AAAA targets in content-hash mode.
    #[serde(rename = "ipfsgatewayaaaa", default)]
    pub ipfs_gateway_aaaa: Vec<Ipv6Addr>,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.connection.is_empty() {
            return Err(anyhow!("invalid connection; no value"));
        }
        if self.eth_link_name_servers.is_empty() {
            return Err(anyhow!("invalid ethlinknameservers; no value"));
        }
        Ok(())
    }

    /// Converts the configuration into the engine's synthesis policy.
    pub fn policy(&self) -> Policy {
        Policy {
            name_servers: self
                .eth_link_name_servers
                .iter()
                .map(|n| n.0.clone())
                .collect(),
            ipfs_gateway_a: self.ipfs_gateway_a.clone(),
            ipfs_gateway_aaaa: self.ipfs_gateway_aaaa.clone(),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// NAME WRAPPER FOR SERDE                                             //
////////////////////////////////////////////////////////////////////////

/// A deserializable wrapper over [`Name`] that appends the trailing
/// dot when the configured value lacks one.
#[derive(Clone, Debug)]
pub struct ConfigName(pub Name);

impl<'de> Deserialize<'de> for ConfigName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_str(ConfigNameVisitor)
    }
}

#[derive(Debug)]
struct ConfigNameVisitor;

impl<'de> de::Visitor<'de> for ConfigNameVisitor {
    type Value = ConfigName;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("domain name")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let qualified;
        let value = if value.ends_with('.') {
            value
        } else {
            qualified = format!("{}.", value);
            &qualified
        };
        value
            .parse()
            .map(ConfigName)
            .map_err(|e| E::custom(format!("invalid domain name: {}", e)))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
