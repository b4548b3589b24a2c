use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL is not set")?;
        let secret = get("JWT_SECRET").context("JWT_SECRET is not set")?;
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let expires_in = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_expiry(&raw)
                .with_context(|| format!("invalid JWT_EXPIRES_IN {raw:?}"))?,
            None => Duration::from_secs(60 * 60 * 24),
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "blogql".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "blogql-users".into()),
            expires_in,
        };

        Ok(Self {
            database_url,
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            jwt,
        })
    }
}

/// Longest accepted token lifetime: ten years.
pub const MAX_EXPIRY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Parses `"3600"`, `"30s"`, `"15m"`, `"12h"` or `"7d"`.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().context("expiry must start with a number")?;

    let scale: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        other => anyhow::bail!("unknown expiry unit {other:?}"),
    };
    let secs = value
        .checked_mul(scale)
        .filter(|s| *s <= MAX_EXPIRY_SECS)
        .with_context(|| format!("expiry must not exceed {MAX_EXPIRY_SECS} seconds"))?;
    anyhow::ensure!(secs > 0, "expiry must be positive");
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_expiry_units() {
        assert_eq!(parse_expiry("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_expiry("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_expiry("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_expiry("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_expiry("1d").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_bad_expiry() {
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("d").is_err());
        assert!(parse_expiry("10w").is_err());
        assert!(parse_expiry("0").is_err());
        assert!(parse_expiry("100000000000d").is_err());
        assert!(parse_expiry("300000000000000d").is_err());
        assert!(parse_expiry(&u64::MAX.to_string()).is_err());
    }

    #[test]
    fn expiry_is_capped_at_ten_years() {
        assert_eq!(parse_expiry("3650d").unwrap(), Duration::from_secs(MAX_EXPIRY_SECS));
        assert!(parse_expiry("3651d").is_err());
    }

    #[test]
    fn oversized_expiry_fails_config_load() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "k"),
            ("JWT_EXPIRES_IN", "100000000000d"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRES_IN"));
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.jwt.issuer, "blogql");
        assert_eq!(cfg.jwt.audience, "blogql-users");
        assert_eq!(cfg.jwt.expires_in, Duration::from_secs(86_400));
    }

    #[test]
    fn secret_is_required() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn explicit_expiry_is_used() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "k"),
            ("JWT_EXPIRES_IN", "30m"),
        ]))
        .unwrap();
        assert_eq!(cfg.jwt.expires_in, Duration::from_secs(1800));
    }
}
