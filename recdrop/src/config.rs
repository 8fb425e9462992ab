//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `RECDROP_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `RECDROP_` override YAML values
//! 3. **Deployment variables** - The unprefixed `PORT`, `UPLOAD_DIR`, `UPLOAD_TOKEN`,
//!    `MAX_UPLOAD_MB` and `CORS_ORIGINS`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `RECDROP_LIMITS__MAX_UPLOAD_MB=10` sets the `limits.max_upload_mb` field.
//!
//! `UPLOAD_TOKEN` and `RECDROP_UPLOAD_TOKEN` are read verbatim; every other variable goes through
//! figment's value parsing (`10` is a number, `true` a boolean).
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use recdrop::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Require a shared secret on every request
//! UPLOAD_TOKEN=s3cret
//!
//! # Allow two browser origins
//! CORS_ORIGINS="https://app.example.com, https://admin.example.com"
//!
//! # Store recordings elsewhere, capped at 10 MiB
//! UPLOAD_DIR=/var/lib/recdrop
//! MAX_UPLOAD_MB=10
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
    value::Dict,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Origins allowed when none are configured.
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://127.0.0.1:65246",
    "http://localhost:65246",
    "http://localhost:8080",
    "http://localhost:3000",
];

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RECDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory recordings are written to, relative to the working directory unless absolute
    pub upload_dir: PathBuf,
    /// Shared secret required as `Authorization: Bearer <token>`. Absent or empty disables auth.
    #[serde(deserialize_with = "deserialize_token", skip_serializing_if = "Option::is_none")]
    pub upload_token: Option<String>,
    /// Size and type limits for uploaded files
    pub limits: UploadLimitsConfig,
    /// Cross-origin access for browser clients
    pub cors: CorsConfig,
    /// Console log output format
    pub log_format: LogFormat,
}

/// Upload limits configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadLimitsConfig {
    /// Maximum size of the uploaded file in MiB (default: 50)
    pub max_upload_mb: u64,
    /// The declared content-type of the file must start with this prefix
    pub accepted_mime_prefix: String,
}

impl UploadLimitsConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for UploadLimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 50,
            accepted_mime_prefix: "audio/webm".to_string(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the API, compared by exact string equality.
    /// Accepts a YAML list or a comma-separated string; an empty value falls back to
    /// [`DEFAULT_CORS_ORIGINS`].
    #[serde(deserialize_with = "deserialize_origins")]
    pub allowed_origins: Vec<String>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            max_age: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            upload_token: None,
            limits: UploadLimitsConfig::default(),
            cors: CorsConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(raw.filter(|token| !token.is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OriginList {
    List(Vec<String>),
    Csv(String),
}

fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match OriginList::deserialize(deserializer)? {
        OriginList::List(list) => list,
        OriginList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };

    let origins: Vec<String> = raw
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() { Ok(default_origins()) } else { Ok(origins) }
}

/// An environment variable as an unparsed `upload_token` value; empty when the variable is unset.
fn raw_env_token(var: &str) -> Serialized<Dict> {
    let mut dict = Dict::new();
    if let Ok(token) = std::env::var(var) {
        dict.insert("upload_token".to_string(), token.into());
    }
    Serialized::defaults(dict)
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.limits.max_upload_mb == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_upload_mb must be at least 1".to_string(),
            });
        }

        if self.limits.accepted_mime_prefix.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: limits.accepted_mime_prefix cannot be empty".to_string(),
            });
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: upload_dir cannot be empty".to_string(),
            });
        }

        // Origins are matched by exact string equality, so a wildcard would never match anything
        if self.cors.allowed_origins.iter().any(|origin| origin == "*") {
            return Err(Error::Internal {
                operation: "Config validation: CORS wildcard origin '*' is not supported. Specify explicit origins.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed environment variables override specific values
            .merge(Env::prefixed("RECDROP_").ignore(&["config", "upload_token"]).split("__"))
            // Plain deployment variables
            .merge(Env::raw().only(&["PORT", "UPLOAD_DIR"]))
            .merge(Env::raw().only(&["MAX_UPLOAD_MB"]).map(|_| "limits.max_upload_mb".into()))
            .merge(Env::raw().only(&["CORS_ORIGINS"]).map(|_| "cors.allowed_origins".into()))
            // Tokens skip value parsing, `007` stays a string
            .merge(raw_env_token("RECDROP_UPLOAD_TOKEN"))
            .merge(raw_env_token("UPLOAD_TOKEN"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 3000);
            assert_eq!(config.upload_dir, PathBuf::from("uploads"));
            assert_eq!(config.upload_token, None);
            assert_eq!(config.limits.max_upload_mb, 50);
            assert_eq!(config.limits.max_size_bytes(), 50 * 1024 * 1024);
            assert_eq!(config.limits.accepted_mime_prefix, "audio/webm");
            assert_eq!(config.cors.allowed_origins, DEFAULT_CORS_ORIGINS.to_vec());
            assert_eq!(config.log_format, LogFormat::Pretty);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
upload_dir: /tmp/recordings
upload_token: hello
limits:
  max_upload_mb: 5
cors:
  allowed_origins:
    - https://app.example.com
  max_age: 600
log_format: json
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 4000);
            assert_eq!(config.upload_dir, PathBuf::from("/tmp/recordings"));
            assert_eq!(config.upload_token.as_deref(), Some("hello"));
            assert_eq!(config.limits.max_upload_mb, 5);
            assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
            assert_eq!(config.cors.max_age, Some(600));
            assert_eq!(config.log_format, LogFormat::Json);

            Ok(())
        });
    }

    #[test]
    fn test_deployment_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 4000\n")?;

            jail.set_env("PORT", "8080");
            jail.set_env("UPLOAD_DIR", "data/rec");
            jail.set_env("UPLOAD_TOKEN", "s3cret");
            jail.set_env("MAX_UPLOAD_MB", "10");
            jail.set_env("CORS_ORIGINS", "https://a.example, https://b.example ,");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 8080);
            assert_eq!(config.upload_dir, PathBuf::from("data/rec"));
            assert_eq!(config.upload_token.as_deref(), Some("s3cret"));
            assert_eq!(config.limits.max_upload_mb, 10);
            assert_eq!(config.cors.allowed_origins, vec!["https://a.example", "https://b.example"]);

            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_override() {
        Jail::expect_with(|jail| {
            jail.set_env("RECDROP_HOST", "127.0.0.1");
            jail.set_env("RECDROP_LIMITS__MAX_UPLOAD_MB", "7");
            jail.set_env("RECDROP_CONFIG", "ignored.yaml");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.limits.max_upload_mb, 7);
            assert_eq!(config.bind_address(), "127.0.0.1:3000");

            Ok(())
        });
    }

    #[test]
    fn test_env_token_is_kept_verbatim() {
        for raw in ["123456", "007", "1.50", "[a]", "true", "s3cret, with comma"] {
            Jail::expect_with(|jail| {
                jail.set_env("UPLOAD_TOKEN", raw);

                let config = Config::load(&args("test.yaml"))?;
                assert_eq!(config.upload_token.as_deref(), Some(raw));

                Ok(())
            });
        }
    }

    #[test]
    fn test_prefixed_env_token_is_kept_verbatim() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "upload_token: from-yaml\n")?;
            jail.set_env("RECDROP_UPLOAD_TOKEN", "007");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.upload_token.as_deref(), Some("007"));

            Ok(())
        });
    }

    #[test]
    fn test_deployment_token_overrides_prefixed_token() {
        Jail::expect_with(|jail| {
            jail.set_env("RECDROP_UPLOAD_TOKEN", "prefixed");
            jail.set_env("UPLOAD_TOKEN", "0042");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.upload_token.as_deref(), Some("0042"));

            Ok(())
        });
    }

    #[test]
    fn test_empty_env_token_disables_auth() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "upload_token: from-yaml\n")?;
            jail.set_env("UPLOAD_TOKEN", "");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.upload_token, None);

            Ok(())
        });
    }

    #[test]
    fn test_empty_token_disables_auth() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "upload_token: \"\"\n")?;

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.upload_token, None);

            Ok(())
        });
    }

    #[test]
    fn test_empty_origin_list_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("CORS_ORIGINS", " , ");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.cors.allowed_origins, DEFAULT_CORS_ORIGINS.to_vec());

            Ok(())
        });
    }

    #[test]
    fn test_config_validation_zero_upload_size() {
        let mut config = Config::default();
        config.limits.max_upload_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_wildcard_origin() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_mime_prefix() {
        let mut config = Config::default();
        config.limits.accepted_mime_prefix = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_field: 1\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }
}
