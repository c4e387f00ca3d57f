//! CLI configuration loader and defaults
//!
//! `scorch.toml` holds the fixed parameters of a deployment: the admin,
//! the minter identities of each collaborator, the presale phase table
//! keeper settings and the clock mode. Token quantities are whole tokens (TOML integers
//! cannot hold base-unit amounts); prices are payment base units per
//! whole token.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, Bps, Timestamp, BASE_UNITS_PER_TOKEN, MAX_BPS};
use lib_vesting::{Phase, PresaleConfig, DEFAULT_PAYMENT_BURN_BPS};

use crate::error::{CliError, CliResult};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILENAME: &str = "scorch.toml";

/// State file used when neither `--state` nor `state_path` is given
pub const DEFAULT_STATE_FILENAME: &str = "scorch-state.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScorchConfig {
    /// Ledger admin, presale admin, airdrop and payroll admin
    pub admin: Address,
    /// Receives the unburned share of presale payments
    pub operations: Address,
    /// Address tokens get "stuck" at when sent to the ledger itself
    pub ledger_address: Address,
    /// Minter identity of the vesting schedule
    pub presale_minter: Address,
    /// Minter identity used for airdrops
    pub airdrop_minter: Address,
    pub payment_burn_bps: Bps,
    pub state_path: Option<PathBuf>,
    pub phases: Vec<PhaseConfig>,
    pub payroll: PayrollConfig,
    /// Genesis time of a simulated deployment
    ///
    /// Only read by `init`. When set, the state file carries its own clock
    /// that starts here and moves only through the admin's `advance-clock`.
    /// When absent the deployment runs on wall time.
    pub simulated_clock: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhaseConfig {
    /// Payment base units per whole token
    pub price: u64,
    /// Whole tokens on sale in this phase
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PayrollConfig {
    /// Minter identity used for salaries
    pub minter: Address,
    /// Address allowed to call `distribute-salary` besides the admin
    pub keeper: Option<Address>,
    /// Keeper loop period
    pub interval_secs: u64,
}

impl Default for ScorchConfig {
    fn default() -> Self {
        Self {
            admin: Address::repeat(0x0A),
            operations: Address::repeat(0x0C),
            ledger_address: Address::repeat(0x5C),
            presale_minter: Address::repeat(0x0B),
            airdrop_minter: Address::repeat(0x0D),
            payment_burn_bps: DEFAULT_PAYMENT_BURN_BPS,
            state_path: None,
            phases: vec![
                PhaseConfig { price: 1_000, tokens: 1_000_000_000 },
                PhaseConfig { price: 2_000, tokens: 1_000_000_000 },
                PhaseConfig { price: 4_000, tokens: 1_000_000_000 },
            ],
            payroll: PayrollConfig::default(),
            simulated_clock: None,
        }
    }
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            minter: Address::repeat(0x0E),
            keeper: None,
            interval_secs: 3_600,
        }
    }
}

impl ScorchConfig {
    pub fn validate(&self) -> CliResult<()> {
        let identities = [
            ("admin", self.admin),
            ("operations", self.operations),
            ("ledger_address", self.ledger_address),
            ("presale_minter", self.presale_minter),
            ("airdrop_minter", self.airdrop_minter),
            ("payroll.minter", self.payroll.minter),
        ];
        for (name, address) in identities {
            if address.is_zero() {
                return Err(CliError::InvalidConfiguration(format!("{} is the zero address", name)));
            }
        }
        // The admin only ever grants the minter role to others
        for (name, minter) in &identities[3..] {
            if *minter == self.admin {
                return Err(CliError::InvalidConfiguration(format!("{} must differ from admin", name)));
            }
        }
        if self.payment_burn_bps > MAX_BPS {
            return Err(CliError::InvalidConfiguration(format!(
                "payment_burn_bps {} exceeds {}",
                self.payment_burn_bps, MAX_BPS
            )));
        }
        if self.phases.is_empty() {
            return Err(CliError::InvalidConfiguration("at least one [[phases]] entry is required".into()));
        }
        if let Some(index) = self.phases.iter().position(|p| p.price == 0) {
            return Err(CliError::InvalidConfiguration(format!("phase {} has zero price", index)));
        }
        if self.payroll.interval_secs == 0 {
            return Err(CliError::InvalidConfiguration("payroll.interval_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn presale(&self) -> PresaleConfig {
        PresaleConfig {
            admin: self.admin,
            presale_address: self.presale_minter,
            operations: self.operations,
            payment_burn_bps: self.payment_burn_bps,
        }
    }

    /// Phase table in base units
    pub fn phase_table(&self) -> Vec<Phase> {
        self.phases
            .iter()
            .map(|p| Phase::new(p.price as Amount, p.tokens as Amount * BASE_UNITS_PER_TOKEN))
            .collect()
    }

    /// `--state` wins over `state_path`, which wins over the default
    pub fn resolve_state_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.state_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILENAME))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILENAME)
}

/// Load the config
///
/// An explicit path must exist. Without one, a missing default file
/// yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<ScorchConfig> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        if path.is_some() {
            return Err(CliError::ConfigError(format!(
                "Configuration file not found: {}",
                config_path.display()
            )));
        }
        return Ok(ScorchConfig::default());
    }

    let raw = fs::read_to_string(&config_path).map_err(|e| CliError::ConfigLoadFailed {
        path: config_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let config: ScorchConfig = toml::from_str(&raw).map_err(|e| CliError::ConfigLoadFailed {
        path: config_path.display().to_string(),
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &ScorchConfig) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CliError::ConfigError(format!("Failed to create config directory: {}", e)))?;
    }
    let data = toml::to_string_pretty(config)
        .map_err(|e| CliError::ConfigError(format!("Failed to serialize config: {}", e)))?;
    fs::write(path, data)
        .map_err(|e| CliError::ConfigError(format!("Failed to write config: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ScorchConfig::default().validate().unwrap();
        assert_eq!(ScorchConfig::default().phase_table().len(), 3);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(load_config(Some(&missing)), Err(CliError::ConfigError(_))));
    }

    #[test]
    fn test_parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.toml");
        let admin = "aa".repeat(32);
        let keeper = "0x".to_string() + &"cd".repeat(32);
        fs::write(
            &path,
            format!(
                r#"
admin = "{admin}"
payment_burn_bps = 9000
state_path = "state/scorch.json"

[[phases]]
price = 500
tokens = 10

[payroll]
keeper = "{keeper}"
interval_secs = 60
"#
            ),
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.admin, Address::repeat(0xAA));
        assert_eq!(config.payment_burn_bps, 9_000);
        assert_eq!(config.payroll.keeper, Some(Address::repeat(0xCD)));
        assert_eq!(config.payroll.interval_secs, 60);
        // Unset fields keep their defaults
        assert_eq!(config.operations, ScorchConfig::default().operations);
        assert_eq!(config.payroll.minter, PayrollConfig::default().minter);

        let phases = config.phase_table();
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].price, 500);
        assert_eq!(phases[0].tokens_available, 10 * BASE_UNITS_PER_TOKEN);
        assert_eq!(
            config.resolve_state_path(None),
            PathBuf::from("state/scorch.json")
        );
        assert_eq!(
            config.resolve_state_path(Some(Path::new("other.json"))),
            PathBuf::from("other.json")
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.toml");

        fs::write(&path, "payment_burn_bps = 10001\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::InvalidConfiguration(_))
        ));

        fs::write(&path, "admin = \"not-hex\"\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::ConfigLoadFailed { .. })
        ));

        fs::write(&path, "phases = []\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_minter_identity_cannot_be_admin() {
        for field in ["presale_minter", "airdrop_minter", "payroll.minter"] {
            let mut config = ScorchConfig::default();
            match field {
                "presale_minter" => config.presale_minter = config.admin,
                "airdrop_minter" => config.airdrop_minter = config.admin,
                _ => config.payroll.minter = config.admin,
            }
            match config.validate() {
                Err(CliError::InvalidConfiguration(msg)) => assert!(msg.contains(field), "{}", msg),
                other => panic!("{} accepted as admin: {:?}", field, other),
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorch.toml");
        let admin = "aa".repeat(32);
        fs::write(&path, format!("admin = \"{admin}\"\nairdrop_minter = \"{admin}\"\n")).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scorch.toml");
        let mut config = ScorchConfig::default();
        config.payroll.keeper = Some(Address::repeat(0x42));
        config.simulated_clock = Some(1_700_000_000);

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }
}
