//! Library defaults: which codes new keys and digests use, how hard salts
//! get stretched, and how patient we are with other participants.
//!
//! Configs are read from YAML. Anything left out takes its default, so an
//! empty document is a valid config.

use crate::{
    cesr::MatterCode,
    crypto::Tier,
    error::Result,
    identifier::coordination::PollConfig,
    util::ser::deserialize_human,
};
use getset::Getters;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
#[serde(default)]
pub struct Config {
    /// Salt stretching work factor.
    tier: Tier,
    /// Use the cheapest stretching there is. Tests only.
    temp: bool,
    /// Next-key digest code.
    dcode: MatterCode,
    /// Current key seed code.
    icode: MatterCode,
    /// Next key seed code.
    ncode: MatterCode,
    /// How many current keys a new identifier gets.
    count: usize,
    /// How many next keys a new identifier commits to.
    ncount: usize,
    transferable: bool,
    poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: Tier::Low,
            temp: false,
            dcode: MatterCode::Blake3_256,
            icode: MatterCode::Ed25519_Seed,
            ncode: MatterCode::Ed25519_Seed,
            count: 1,
            ncount: 1,
            transferable: true,
            poll: PollConfig::default(),
        }
    }
}

impl Config {
    /// Load a config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        deserialize_human(yaml.as_bytes())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Turn on cheap stretching.
    pub fn with_temp(mut self, temp: bool) -> Self {
        self.temp = temp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tier(), &Tier::Low);
        assert_eq!(config.dcode(), &MatterCode::Blake3_256);
        assert_eq!(config.icode(), &MatterCode::Ed25519_Seed);
        assert_eq!(config.count(), &1);
        assert!(config.transferable());
        assert_eq!(config.poll().max_retries(), &10);
        assert_eq!(config.poll().initial_backoff_ms(), &250);
        assert_eq!(config.poll().max_backoff_ms(), &5000);
        assert_eq!(config.poll().timeout_ms(), &60000);
    }

    #[test]
    fn from_yaml() {
        let yaml = r#"
tier: high
dcode: "F"
count: 3
ncount: 2
transferable: false
poll:
  max_retries: 3
  timeout_ms: 100
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.tier(), &Tier::High);
        assert_eq!(config.dcode(), &MatterCode::Blake2b_256);
        assert_eq!(config.count(), &3);
        assert_eq!(config.ncount(), &2);
        assert!(!config.transferable());
        assert_eq!(config.poll().max_retries(), &3);
        assert_eq!(config.poll().initial_backoff_ms(), &250);
        assert_eq!(config.poll().timeout_ms(), &100);

        let again = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(config, again);

        assert!(Config::from_yaml("dcode: ZZZ").is_err());
    }
}
