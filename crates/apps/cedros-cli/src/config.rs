//! CLI configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use cedros_pay::CedrosConfig;

use crate::error::{CliError, CliResult};

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax; unset variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

/// CLI configuration loaded from TOML.
///
/// ```toml
/// [cedros]
/// server_url = "https://pay.example.com"
/// public_key = "${CEDROS_PUBLIC_KEY}"
/// network = "devnet"
///
/// [wallet]
/// keypair = "~/.config/solana/id.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Client core configuration.
    pub cedros: CedrosConfig,
    /// Local signing wallet.
    pub wallet: WalletConfig,
}

/// Local wallet settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Solana CLI keypair file used by `pay`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypair: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from a file.
    /// Environment variables in `${VAR}` format are expanded in URLs, the
    /// public key and the keypair path.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        config.cedros.server_url = expand_env_vars(&config.cedros.server_url);
        config.cedros.public_key = expand_env_vars(&config.cedros.public_key);
        if let Some(endpoint) = &config.cedros.solana_endpoint {
            config.cedros.solana_endpoint = Some(expand_env_vars(endpoint));
        }
        if let Some(keypair) = &config.wallet.keypair {
            config.wallet.keypair = Some(expand_path(&keypair.to_string_lossy()));
        }

        Ok(config)
    }

    /// Load configuration from the default location.
    pub fn load_default() -> CliResult<Self> {
        let path = default_config_path();
        Self::load(&path)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to the default location.
    pub fn save_default(&self) -> CliResult<()> {
        let path = default_config_path();
        self.save(&path)
    }
}

/// Expand `${VAR}` and a leading `~/`.
fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_env_vars(raw);
    match expanded.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(expanded),
    }
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default config directory.
///
/// Priority:
/// 1. `CEDROS_CONFIG_DIR` environment variable (if set)
/// 2. Platform-specific config directory (e.g., `~/.config/cedros` on Linux)
/// 3. Fallback to `~/.cedros`
pub fn default_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CEDROS_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "cedros", "cedros")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".cedros"))
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Format minor units with `decimals` places, trimming trailing zeros
/// beyond two places.
pub fn format_amount(minor_units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return minor_units.to_string();
    }
    let scale = 10u128.pow(u32::from(decimals));
    let units = u128::from(minor_units);
    let whole = units / scale;
    let frac = format!("{:0width$}", units % scale, width = usize::from(decimals));
    let trimmed = frac.trim_end_matches('0');
    let frac = if trimmed.len() < 2 {
        &frac[..2.min(frac.len())]
    } else {
        trimmed
    };
    format!("{}.{}", whole, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedros_pay::SolanaNetwork;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.cedros.network, SolanaNetwork::MainnetBeta);
        assert!(config.wallet.keypair.is_none());
    }

    #[test]
    fn test_missing_file_gives_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = CliConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.cedros = CedrosConfig::new("https://pay.example.com").with_network(SolanaNetwork::Devnet);
        config.wallet.keypair = Some(PathBuf::from("/keys/payer.json"));
        config.save(&path).unwrap();

        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("CEDROS_TEST_SERVER", "https://env.example.com");
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[cedros]\nserver_url = \"${CEDROS_TEST_SERVER}\"\npublic_key = \"${CEDROS_TEST_UNSET_9876}\"\n",
        )
        .unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.cedros.server_url, "https://env.example.com");
        assert_eq!(config.cedros.public_key, "${CEDROS_TEST_UNSET_9876}");
        std::env::remove_var("CEDROS_TEST_SERVER");
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[cedros\nserver_url =").unwrap();
        assert!(matches!(CliConfig::load(&path), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("CEDROS_TEST_KEY", "pk_test_1");
        assert_eq!(expand_env_vars("${CEDROS_TEST_KEY}"), "pk_test_1");
        assert_eq!(expand_env_vars("a_${CEDROS_TEST_KEY}_b"), "a_pk_test_1_b");
        assert_eq!(expand_env_vars("${NONEXISTENT_VAR_12345}"), "${NONEXISTENT_VAR_12345}");
        std::env::remove_var("CEDROS_TEST_KEY");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_500_000, 6), "1.50");
        assert_eq!(format_amount(1_234_567, 6), "1.234567");
        assert_eq!(format_amount(5, 6), "0.000005");
        assert_eq!(format_amount(0, 6), "0.00");
        assert_eq!(format_amount(42, 0), "42");
        assert_eq!(format_amount(7, 1), "0.7");
    }
}
