use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MIN_INTERVAL_HOURS: u32 = 24;
pub const DEFAULT_MAX_INTERVAL_HOURS: u32 = 90;

/// Top-level config (snapdrift.toml + SNAPDRIFT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapdriftConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Interval bounds and pool-cycling policy for the send scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_min_hours")]
    pub min_interval_hours: u32,
    #[serde(default = "default_max_hours")]
    pub max_interval_hours: u32,
    /// When every active image has been sent, clear all sent flags and start
    /// a new cycle instead of skipping sends until a manual reset.
    #[serde(default = "bool_true")]
    pub auto_cycle: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_hours: DEFAULT_MIN_INTERVAL_HOURS,
            max_interval_hours: DEFAULT_MAX_INTERVAL_HOURS,
            auto_cycle: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub provider: DeliveryProvider,
    /// Destination phone number in E.164 form (used as-is for Twilio; for
    /// Pushbullet it is informational only — pushes go to the account).
    pub recipient: String,
    /// Public base URL under which stored images are reachable, e.g. the
    /// dashboard's `/images` route exposed through a tunnel or CDN.
    pub public_base_url: String,
    pub twilio: Option<TwilioConfig>,
    pub pushbullet: Option<PushbulletConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryProvider {
    #[default]
    Twilio,
    Pushbullet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushbulletConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_min_hours() -> u32 {
    DEFAULT_MIN_INTERVAL_HOURS
}

fn default_max_hours() -> u32 {
    DEFAULT_MAX_INTERVAL_HOURS
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snapdrift/snapdrift.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snapdrift/snapdrift.toml", home)
}

impl SnapdriftConfig {
    /// Load config from a TOML file with SNAPDRIFT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.snapdrift/snapdrift.toml
    ///
    /// Env overrides use double underscores as section separators, e.g.
    /// `SNAPDRIFT_SCHEDULER__MIN_INTERVAL_HOURS=12`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SnapdriftConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SNAPDRIFT_").split("__"))
            .extract()
            .map_err(|e| crate::error::SnapdriftError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Validate everything that must hold before the scheduler may start.
    ///
    /// Interval bounds are re-checked by the scheduler on every `start`;
    /// this front-loads the same check plus provider credential presence so
    /// a misconfigured instance fails at boot rather than at first fire.
    pub fn validate(&self) -> crate::error::Result<()> {
        let s = &self.scheduler;
        if s.min_interval_hours == 0 || s.max_interval_hours == 0 {
            return Err(crate::error::SnapdriftError::Config(
                "interval bounds must be positive".into(),
            ));
        }
        if s.min_interval_hours > s.max_interval_hours {
            return Err(crate::error::SnapdriftError::Config(format!(
                "min_interval_hours ({}) exceeds max_interval_hours ({})",
                s.min_interval_hours, s.max_interval_hours
            )));
        }

        let d = &self.delivery;
        if !d.public_base_url.starts_with("http://") && !d.public_base_url.starts_with("https://") {
            return Err(crate::error::SnapdriftError::Config(
                "public_base_url must be an http(s) URL".into(),
            ));
        }
        match d.provider {
            DeliveryProvider::Twilio => {
                let t = d.twilio.as_ref().ok_or_else(|| {
                    crate::error::SnapdriftError::Config(
                        "provider is twilio but [delivery.twilio] is missing".into(),
                    )
                })?;
                validate_phone_number(&d.recipient, "delivery.recipient")?;
                validate_phone_number(&t.from_number, "delivery.twilio.from_number")?;
                if t.account_sid.is_empty() || t.auth_token.is_empty() {
                    return Err(crate::error::SnapdriftError::Config(
                        "twilio account_sid / auth_token must not be empty".into(),
                    ));
                }
            }
            DeliveryProvider::Pushbullet => {
                let p = d.pushbullet.as_ref().ok_or_else(|| {
                    crate::error::SnapdriftError::Config(
                        "provider is pushbullet but [delivery.pushbullet] is missing".into(),
                    )
                })?;
                if p.api_key.is_empty() {
                    return Err(crate::error::SnapdriftError::Config(
                        "pushbullet api_key must not be empty".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// E.164 shape check: leading `+`, then 7–15 digits.
fn validate_phone_number(value: &str, field: &str) -> crate::error::Result<()> {
    let rest = value.strip_prefix('+').unwrap_or("");
    let ok = (7..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(crate::error::SnapdriftError::Config(format!(
            "{field}: expected E.164 number like +15551234567, got {value:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SnapdriftConfig {
        SnapdriftConfig {
            scheduler: SchedulerConfig::default(),
            delivery: DeliveryConfig {
                provider: DeliveryProvider::Twilio,
                recipient: "+15551230000".into(),
                public_base_url: "https://pics.example.com".into(),
                twilio: Some(TwilioConfig {
                    account_sid: "ACxxxx".into(),
                    auth_token: "secret".into(),
                    from_number: "+15559870000".into(),
                }),
                pushbullet: None,
            },
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn inverted_interval_bounds_rejected() {
        let mut cfg = base_config();
        cfg.scheduler.min_interval_hours = 90;
        cfg.scheduler.max_interval_hours = 24;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_interval_bound_rejected() {
        let mut cfg = base_config();
        cfg.scheduler.min_interval_hours = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn equal_bounds_allowed() {
        let mut cfg = base_config();
        cfg.scheduler.min_interval_hours = 48;
        cfg.scheduler.max_interval_hours = 48;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_recipient_rejected() {
        let mut cfg = base_config();
        cfg.delivery.recipient = "555-123".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn twilio_without_credentials_rejected() {
        let mut cfg = base_config();
        cfg.delivery.twilio = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pushbullet_provider_requires_api_key() {
        let mut cfg = base_config();
        cfg.delivery.provider = DeliveryProvider::Pushbullet;
        cfg.delivery.pushbullet = Some(PushbulletConfig {
            api_key: String::new(),
        });
        assert!(cfg.validate().is_err());
        cfg.delivery.pushbullet = Some(PushbulletConfig {
            api_key: "o.token".into(),
        });
        assert!(cfg.validate().is_ok());
    }
}
