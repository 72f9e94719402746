//! Configuration file support for the dry-plan engine.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/dryplan/config.toml`.
//! The fixed heuristics of the planner (calorie floor, slot budget
//! shares, the weekly restriction schedule, reply delays) live here so
//! they can be tuned without touching the engine.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub dry: DryConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Calorie budget and slot split configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Daily calorie target never drops below this
    #[serde(default = "default_calorie_floor")]
    pub calorie_floor: i32,

    /// Maintenance multiplier for the weight-loss goal
    #[serde(default = "default_loss_coefficient")]
    pub loss_coefficient: f64,

    /// Maintenance multiplier for the muscle-gain goal
    #[serde(default = "default_gain_coefficient")]
    pub gain_coefficient: f64,

    /// Breakfast share of the daily budget
    #[serde(default = "default_breakfast_share")]
    pub breakfast_share: f64,

    /// Lunch share of the daily budget
    #[serde(default = "default_lunch_share")]
    pub lunch_share: f64,

    /// Dinner share of the daily budget; the snack absorbs the remainder
    #[serde(default = "default_dinner_share")]
    pub dinner_share: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            calorie_floor: default_calorie_floor(),
            loss_coefficient: default_loss_coefficient(),
            gain_coefficient: default_gain_coefficient(),
            breakfast_share: default_breakfast_share(),
            lunch_share: default_lunch_share(),
            dinner_share: default_dinner_share(),
        }
    }
}

/// Weekly tightening schedule for the dry (cutting) goal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DryConfig {
    /// Week-1 maintenance multiplier
    #[serde(default = "default_dry_base_coefficient")]
    pub base_coefficient: f64,

    /// Weekly reduction of the multiplier
    #[serde(default = "default_dry_weekly_step")]
    pub weekly_step: f64,

    /// The multiplier never drops below this (-25% of maintenance)
    #[serde(default = "default_dry_coefficient_floor")]
    pub coefficient_floor: f64,

    /// Week-1 protein ratio and its weekly increase/cap
    #[serde(default = "default_protein_base")]
    pub protein_base: f64,
    #[serde(default = "default_protein_step")]
    pub protein_step: f64,
    #[serde(default = "default_protein_cap")]
    pub protein_cap: f64,

    /// Week-1 fat ratio and its weekly decrease/floor
    #[serde(default = "default_fat_base")]
    pub fat_base: f64,
    #[serde(default = "default_fat_step")]
    pub fat_step: f64,
    #[serde(default = "default_fat_floor")]
    pub fat_floor: f64,

    /// Carbs absorb the remainder but never drop below this
    #[serde(default = "default_carb_floor")]
    pub carb_floor: f64,

    /// High-carb meal keys banned per week beyond week 1
    #[serde(default = "default_bans_per_week")]
    pub bans_per_week: usize,

    /// A filtered pool keeps at least this many meals
    #[serde(default = "default_min_pool_survivors")]
    pub min_pool_survivors: usize,
}

impl Default for DryConfig {
    fn default() -> Self {
        Self {
            base_coefficient: default_dry_base_coefficient(),
            weekly_step: default_dry_weekly_step(),
            coefficient_floor: default_dry_coefficient_floor(),
            protein_base: default_protein_base(),
            protein_step: default_protein_step(),
            protein_cap: default_protein_cap(),
            fat_base: default_fat_base(),
            fat_step: default_fat_step(),
            fat_floor: default_fat_floor(),
            carb_floor: default_carb_floor(),
            bans_per_week: default_bans_per_week(),
            min_pool_survivors: default_min_pool_survivors(),
        }
    }
}

/// Simulated-latency and transcript-save configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Delay before a short assistant reply appears (ms)
    #[serde(default = "default_short_reply_ms")]
    pub short_reply_ms: u64,

    /// Delay before an analysis/plan reply appears (ms)
    #[serde(default = "default_analysis_reply_ms")]
    pub analysis_reply_ms: u64,

    /// Transcript saves are coalesced over this window (ms)
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            short_reply_ms: default_short_reply_ms(),
            analysis_reply_ms: default_analysis_reply_ms(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

// Default value functions
fn default_calorie_floor() -> i32 {
    1200
}

fn default_loss_coefficient() -> f64 {
    0.825
}

fn default_gain_coefficient() -> f64 {
    1.185
}

fn default_breakfast_share() -> f64 {
    0.25
}

fn default_lunch_share() -> f64 {
    0.35
}

fn default_dinner_share() -> f64 {
    0.30
}

fn default_dry_base_coefficient() -> f64 {
    0.8462
}

fn default_dry_weekly_step() -> f64 {
    0.015
}

fn default_dry_coefficient_floor() -> f64 {
    0.75
}

fn default_protein_base() -> f64 {
    0.40
}

fn default_protein_step() -> f64 {
    0.025
}

fn default_protein_cap() -> f64 {
    0.50
}

fn default_fat_base() -> f64 {
    0.30
}

fn default_fat_step() -> f64 {
    0.015
}

fn default_fat_floor() -> f64 {
    0.20
}

fn default_carb_floor() -> f64 {
    0.15
}

fn default_bans_per_week() -> usize {
    4
}

fn default_min_pool_survivors() -> usize {
    2
}

fn default_short_reply_ms() -> u64 {
    800
}

fn default_analysis_reply_ms() -> u64 {
    1800
}

fn default_save_debounce_ms() -> u64 {
    1500
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("dryplan").join("config.toml")
    }

    /// Reject configurations the planner cannot work with
    pub fn validate(&self) -> Result<()> {
        let shares =
            self.plan.breakfast_share + self.plan.lunch_share + self.plan.dinner_share;
        if !(0.0..1.0).contains(&shares) {
            return Err(Error::Config(format!(
                "slot shares must leave room for the snack, got {:.2}",
                shares
            )));
        }
        if self.plan.calorie_floor <= 0 {
            return Err(Error::Config("calorie_floor must be positive".into()));
        }
        if self.dry.coefficient_floor > self.dry.base_coefficient {
            return Err(Error::Config(
                "dry coefficient floor exceeds the base coefficient".into(),
            ));
        }
        if self.dry.min_pool_survivors == 0 {
            return Err(Error::Config("min_pool_survivors must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.plan.calorie_floor, 1200);
        assert_eq!(config.plan.breakfast_share, 0.25);
        assert_eq!(config.dry.base_coefficient, 0.8462);
        assert_eq!(config.dry.bans_per_week, 4);
        assert_eq!(config.session.save_debounce_ms, 1500);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.plan.calorie_floor, parsed.plan.calorie_floor);
        assert_eq!(config.dry.protein_cap, parsed.dry.protein_cap);
        assert_eq!(config.session.short_reply_ms, parsed.session.short_reply_ms);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[dry]
bans_per_week = 6
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dry.bans_per_week, 6);
        assert_eq!(config.dry.min_pool_survivors, 2); // default
        assert_eq!(config.plan.calorie_floor, 1200); // default
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[plan]\ncalorie_floor = 1400").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.plan.calorie_floor, 1400);
    }

    #[test]
    fn test_invalid_shares_rejected() {
        let toml_str = r#"
[plan]
breakfast_share = 0.5
lunch_share = 0.4
dinner_share = 0.3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }
}
