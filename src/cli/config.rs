//! TrustDAO configuration file handling
//!
//! Provides default configuration generation and loading for the operator CLI.
//! Configuration files are TOML format.
//!
//! ## Initial vs Live Settings
//!
//! The `[governance]` table only seeds a NEW governance state. Once bootstrap
//! mode is disabled, settings change exclusively through executed
//! `setting_change` proposals and live in the governance state itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trustdao::governance::GovernanceSettings;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// TrustDAO operator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustDaoConfig {
    /// Initial governance settings
    #[serde(default)]
    pub governance: GovernanceSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl TrustDaoConfig {
    /// Load configuration from a TOML file and validate the governance settings
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: TrustDaoConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config
            .governance
            .validate()
            .map_err(|e| format!("Invalid governance settings in '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        let defaults = GovernanceSettings::default();
        format!(
            r#"# TrustDAO Configuration
#
# The [governance] table seeds a NEW governance state only. After bootstrap
# mode is disabled, settings change exclusively through executed
# setting_change proposals voted on by the trusted members.
#
# Durations are in seconds. Token amounts are decimal strings in base units.

[governance]
# Fraction of valid members whose votes pass a proposal, in (0, 0.90]
quorum = "{quorum}"

# Bond each member deposits on joining
bond_amount = "{bond_amount}"

# Minimum valid members; below this, registered nodes may auto-join
min_members = {min_members}

# Minimum time between two proposals by the same member
proposal_cooldown = {proposal_cooldown}

# Delay between proposal creation and the start of voting
vote_delay = {vote_delay}

# Length of the voting period
voting_duration = {voting_duration}

# Time after voting ends during which a passed proposal can be executed
execution_window = {execution_window}

# Time a challenged member has to respond
challenge_window = {challenge_window}

# Minimum time between two challenges by the same challenger
challenge_cooldown = {challenge_cooldown}

# Fee a non-member pays to issue a challenge
challenge_cost = "{challenge_cost}"

# Time after an approved leave during which the member may withdraw
leave_window = {leave_window}

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/trustdao/trustdao.log"
"#,
            quorum = defaults.quorum,
            bond_amount = defaults.bond_amount,
            min_members = defaults.min_members,
            proposal_cooldown = defaults.proposal_cooldown,
            vote_delay = defaults.vote_delay,
            voting_duration = defaults.voting_duration,
            execution_window = defaults.execution_window,
            challenge_window = defaults.challenge_window,
            challenge_cooldown = defaults.challenge_cooldown,
            challenge_cost = defaults.challenge_cost,
            leave_window = defaults.leave_window,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml();

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}
