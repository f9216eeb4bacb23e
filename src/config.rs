//! Join reorder configuration.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Join reorder configuration options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    /// Try `A ⋈ B → B ⋈ A`.
    pub enable_commute: bool,
    /// Try `A ⋈ (B ⋈ C) → (A ⋈ B) ⋈ C`.
    pub enable_left_associate: bool,
    /// Try `(A ⋈ B) ⋈ C → A ⋈ (B ⋈ C)`.
    pub enable_right_associate: bool,
    /// Try `(A ⋈ B) ⋈ (C ⋈ D) → (A ⋈ C) ⋈ (B ⋈ D)`.
    pub enable_exchange: bool,
    /// Allow rotations that leave a new join without any conjunct.
    pub allow_cross_products: bool,
    /// Upper bound on alternatives returned by one exploration.
    pub max_alternatives: usize,
    /// Validate every produced plan before handing it out.
    pub validate_rewrites: bool,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            enable_commute: true,
            enable_left_associate: true,
            enable_right_associate: true,
            enable_exchange: true,
            allow_cross_products: false,
            max_alternatives: 64,
            validate_rewrites: cfg!(debug_assertions),
        }
    }
}

impl ReorderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReorderConfig =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.max_alternatives == 0 {
            return Err(Error::InvalidConfig("max_alternatives must be at least 1".into()));
        }
        Ok(())
    }

    /// Set enable_commute flag.
    pub fn enable_commute(mut self, value: bool) -> Self {
        self.enable_commute = value;
        self
    }

    /// Set enable_left_associate flag.
    pub fn enable_left_associate(mut self, value: bool) -> Self {
        self.enable_left_associate = value;
        self
    }

    /// Set enable_right_associate flag.
    pub fn enable_right_associate(mut self, value: bool) -> Self {
        self.enable_right_associate = value;
        self
    }

    /// Set enable_exchange flag.
    pub fn enable_exchange(mut self, value: bool) -> Self {
        self.enable_exchange = value;
        self
    }

    /// Set allow_cross_products flag.
    pub fn allow_cross_products(mut self, value: bool) -> Self {
        self.allow_cross_products = value;
        self
    }

    /// Set max_alternatives. Zero is clamped to one.
    pub fn max_alternatives(mut self, value: usize) -> Self {
        self.max_alternatives = value.max(1);
        self
    }

    /// Set validate_rewrites flag.
    pub fn validate_rewrites(mut self, value: bool) -> Self {
        self.validate_rewrites = value;
        self
    }
}
