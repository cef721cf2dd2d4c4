//! Pool configuration that callers can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cache length at which a miss starts evicting.
pub const DEFAULT_DROP_THRESHOLD: usize = 10;

/// Fixed-point match ratio in units of 1/256.
///
/// A cached buffer of `cached` bytes is an acceptable match for `requested`
/// bytes iff `cached >= requested` and `(cached * ratio) >> 8 <= requested`.
/// Zero accepts any buffer at least as large as the request; [`MatchRatio::ONE`]
/// accepts only an exact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MatchRatio(u32);

impl MatchRatio {
    const SHIFT: u32 = 8;

    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << Self::SHIFT);

    /// Quantize a ratio in `[0, 1]`. Returns `None` outside that range or for NaN.
    pub fn from_f32(ratio: f32) -> Option<Self> {
        if !(0.0..=1.0).contains(&ratio) {
            return None;
        }
        Some(Self((ratio * Self::ONE.0 as f32) as u32))
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32 / Self::ONE.0 as f32
    }

    pub fn accepts(self, cached: usize, requested: usize) -> bool {
        cached >= requested
            && ((cached as u128 * self.0 as u128) >> Self::SHIFT) <= requested as u128
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Reuse tightness in `[0, 1]`. 0 accepts any larger cached buffer.
    pub match_ratio: f32,

    /// Once the cache holds this many buffers, a miss may evict one.
    /// 0 attempts eviction on every miss; `usize::MAX` effectively never does.
    pub drop_threshold: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            match_ratio: 0.0,
            drop_threshold: DEFAULT_DROP_THRESHOLD,
        }
    }
}

impl PoolConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SCRATCHPOOL_MATCH_RATIO`: match ratio in `[0, 1]`
    /// - `SCRATCHPOOL_DROP_THRESHOLD`: eviction threshold
    ///
    /// Values that do not parse are ignored. Range checks happen in [`PoolConfig::validate`].
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SCRATCHPOOL_MATCH_RATIO") {
            if let Ok(v) = s.parse::<f32>() {
                cfg.match_ratio = v;
            }
        }

        if let Ok(s) = std::env::var("SCRATCHPOOL_DROP_THRESHOLD") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.drop_threshold = v;
            }
        }

        cfg
    }

    /// Parse and validate a JSON object; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the ratio range and return its quantized form.
    pub fn validate(&self) -> Result<MatchRatio> {
        MatchRatio::from_f32(self.match_ratio).ok_or_else(|| Error::InvalidConfiguration {
            field: "match_ratio",
            value: self.match_ratio.to_string(),
        })
    }
}
