//! Harness configuration loaded from TOML file.

use std::fs;

use arb_types::{Key, Venue};
use serde::{Deserialize, Serialize};

use crate::error::KeeperError;

/// Top-level harness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeeperConfig {
    /// Fee (bps) the fee oracle falls back to before it has learned
    /// anything for a given (pool, direction).
    pub default_fee_bps: u64,

    /// How often the synthetic event loop advances, in milliseconds.
    pub tick_interval_ms: u64,

    /// Minimum interval between two `start_refresh` calls for the same
    /// pool, in milliseconds.
    pub min_refresh_interval_ms: u64,

    /// Capacity of the in-memory trace buffer.
    pub trace_buffer_capacity: usize,

    pub cache: CacheConfig,
    pub topology: TopologyConfig,
    pub solver: SolverSettings,

    /// Pools the harness discovers, freezes, activates and quotes against.
    pub pools: Vec<TrackedPool>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CacheConfig {
    pub tick_arrays: usize,
    pub bin_arrays: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TopologyConfig {
    pub tick_array_radius: i32,
    pub bin_array_radius: i32,
}

/// Mirrors `arb_core::solver::SolverConfig`, kept as a separate TOML-facing
/// type so the wire format does not change shape if the core's internal
/// defaults do.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SolverSettings {
    pub min_profit_abs: u128,
    pub min_profit_bps: u64,
    pub min_trade_size: u128,
    pub max_impact_bps: u64,
    pub max_input: u128,
}

/// One pool the harness seeds and keeps alive. Fields irrelevant to
/// `venue` are left `None`; `validate` checks the combination actually
/// matches what that venue family needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackedPool {
    pub name: String,
    pub venue: Venue,

    #[serde(with = "key_hex")]
    pub pool: Key,
    #[serde(with = "key_hex")]
    pub base_mint: Key,
    #[serde(with = "key_hex")]
    pub quote_mint: Key,
    #[serde(with = "key_hex")]
    pub base_vault: Key,
    #[serde(with = "key_hex")]
    pub quote_vault: Key,

    /// `CpmmExplicitFee` only.
    #[serde(default)]
    pub fee_numerator: Option<u64>,
    #[serde(default)]
    pub fee_denominator: Option<u64>,

    /// `CpmmSharedFee` (singleton config) and `Clmm` (venue config).
    #[serde(default, with = "key_hex::option")]
    pub fee_config: Option<Key>,

    /// `Clmm` only.
    #[serde(default)]
    pub tick_spacing: Option<u16>,

    /// `Dlmm` only.
    #[serde(default)]
    pub bin_step_bps: Option<u16>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl KeeperConfig {
    pub fn load(path: &str) -> Result<Self, KeeperError> {
        let content = fs::read_to_string(path)?;
        let config: KeeperConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<(), KeeperError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), KeeperError> {
        if self.pools.is_empty() {
            return Err(KeeperError::InvalidConfig("pools: at least one tracked pool is required".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(KeeperError::InvalidConfig("tick_interval_ms must be greater than 0".into()));
        }
        if self.cache.tick_arrays == 0 || self.cache.bin_arrays == 0 {
            return Err(KeeperError::InvalidConfig("cache ceilings must be greater than 0".into()));
        }
        if self.solver.max_impact_bps > 10_000 {
            return Err(KeeperError::InvalidConfig("solver.max_impact_bps must be at most 10000".into()));
        }
        for pool in &self.pools {
            pool.validate()?;
        }
        Ok(())
    }

    pub fn enabled_pools(&self) -> Vec<&TrackedPool> {
        self.pools.iter().filter(|p| p.enabled).collect()
    }
}

impl TrackedPool {
    fn validate(&self) -> Result<(), KeeperError> {
        if self.name.is_empty() {
            return Err(KeeperError::InvalidConfig("pool name must not be empty".into()));
        }
        if self.pool.is_zero() || self.base_vault.is_zero() || self.quote_vault.is_zero() {
            return Err(KeeperError::InvalidConfig(format!("pool {}: pool and vault keys must be non-zero", self.name)));
        }
        match self.venue {
            Venue::CpmmExplicitFee => {
                if self.fee_numerator.is_none() || self.fee_denominator.is_none() {
                    return Err(KeeperError::InvalidConfig(format!(
                        "pool {}: cpmm_explicit_fee requires fee_numerator and fee_denominator",
                        self.name
                    )));
                }
            }
            Venue::CpmmSharedFee | Venue::Clmm => {
                if self.fee_config.is_none() {
                    return Err(KeeperError::InvalidConfig(format!("pool {}: requires fee_config", self.name)));
                }
                if self.venue == Venue::Clmm && self.tick_spacing.is_none() {
                    return Err(KeeperError::InvalidConfig(format!("pool {}: clmm requires tick_spacing", self.name)));
                }
            }
            Venue::Dlmm => {
                if self.bin_step_bps.is_none() {
                    return Err(KeeperError::InvalidConfig(format!("pool {}: dlmm requires bin_step_bps", self.name)));
                }
            }
        }
        Ok(())
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            default_fee_bps: 30,
            tick_interval_ms: 500,
            min_refresh_interval_ms: 5_000,
            trace_buffer_capacity: 4_096,
            cache: CacheConfig { tick_arrays: 18_000, bin_arrays: 18_000 },
            topology: TopologyConfig { tick_array_radius: 7, bin_array_radius: 1 },
            solver: SolverSettings {
                min_profit_abs: 0,
                min_profit_bps: 0,
                min_trade_size: 1,
                max_impact_bps: 2_000,
                max_input: 1_000_000_000,
            },
            pools: vec![],
        }
    }
}

/// Writes a ready-to-edit example configuration, seeded with one pool of
/// each venue family, to `path`.
pub fn create_example_config(path: &str) -> Result<(), KeeperError> {
    let example = KeeperConfig {
        pools: vec![
            TrackedPool {
                name: "SOL/USDC cpmm".into(),
                venue: Venue::CpmmExplicitFee,
                pool: Key::new([1; 32]),
                base_mint: Key::new([2; 32]),
                quote_mint: Key::new([3; 32]),
                base_vault: Key::new([4; 32]),
                quote_vault: Key::new([5; 32]),
                fee_numerator: Some(30),
                fee_denominator: Some(10_000),
                fee_config: None,
                tick_spacing: None,
                bin_step_bps: None,
                enabled: true,
            },
            TrackedPool {
                name: "SOL/USDC clmm".into(),
                venue: Venue::Clmm,
                pool: Key::new([6; 32]),
                base_mint: Key::new([2; 32]),
                quote_mint: Key::new([3; 32]),
                base_vault: Key::new([7; 32]),
                quote_vault: Key::new([8; 32]),
                fee_numerator: None,
                fee_denominator: None,
                fee_config: Some(Key::new([9; 32])),
                tick_spacing: Some(64),
                bin_step_bps: None,
                enabled: true,
            },
        ],
        ..KeeperConfig::default()
    };
    example.save(path)
}

/// Custom serde module for [`Key`]: plain lowercase hex, matching the
/// teacher's string-encoded-key idiom but without a base58 dependency.
mod key_hex {
    use arb_types::Key;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(key: &Key, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode(key.as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Key, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode(&s).map(Key::new).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(key: &Option<Key>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match key {
                Some(k) => serializer.serialize_some(&encode(k.as_bytes())),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Key>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| decode(&s).map(Key::new).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

    fn encode(bytes: &[u8; 32]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn decode(s: &str) -> Result<[u8; 32], String> {
        if s.len() != 64 {
            return Err(format!("expected a 64-character hex string, got {} characters", s.len()));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in out.iter_mut().enumerate() {
            let byte_str = &s[i * 2..i * 2 + 2];
            *chunk = u8::from_str_radix(byte_str, 16).map_err(|e| e.to_string())?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let mut config = KeeperConfig::default();
        config.pools.push(TrackedPool {
            name: "test".into(),
            venue: Venue::CpmmExplicitFee,
            pool: Key::new([1; 32]),
            base_mint: Key::new([2; 32]),
            quote_mint: Key::new([3; 32]),
            base_vault: Key::new([4; 32]),
            quote_vault: Key::new([5; 32]),
            fee_numerator: Some(30),
            fee_denominator: Some(10_000),
            fee_config: None,
            tick_spacing: None,
            bin_step_bps: None,
            enabled: true,
        });
        assert!(config.validate().is_ok());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let reparsed: KeeperConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.pools[0].pool, config.pools[0].pool);
    }

    #[test]
    fn empty_pool_list_fails_validation() {
        let config = KeeperConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn cpmm_pool_without_fee_fields_fails_validation() {
        let mut config = KeeperConfig::default();
        config.pools.push(TrackedPool {
            name: "bad".into(),
            venue: Venue::CpmmExplicitFee,
            pool: Key::new([1; 32]),
            base_mint: Key::new([2; 32]),
            quote_mint: Key::new([3; 32]),
            base_vault: Key::new([4; 32]),
            quote_vault: Key::new([5; 32]),
            fee_numerator: None,
            fee_denominator: None,
            fee_config: None,
            tick_spacing: None,
            bin_step_bps: None,
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn max_impact_bps_above_ten_thousand_fails_validation() {
        let mut config = KeeperConfig::default();
        config.solver.max_impact_bps = 10_001;
        config.pools.push(TrackedPool {
            name: "test".into(),
            venue: Venue::CpmmExplicitFee,
            pool: Key::new([1; 32]),
            base_mint: Key::new([2; 32]),
            quote_mint: Key::new([3; 32]),
            base_vault: Key::new([4; 32]),
            quote_vault: Key::new([5; 32]),
            fee_numerator: Some(30),
            fee_denominator: Some(10_000),
            fee_config: None,
            tick_spacing: None,
            bin_step_bps: None,
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn key_hex_round_trips() {
        let key = Key::new([0xab; 32]);
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "key_hex")] Key);
        let s = toml::to_string(&Wrapper(key)).unwrap();
        let back: Wrapper = toml::from_str(&s).unwrap();
        assert_eq!(back.0, key);
    }
}
