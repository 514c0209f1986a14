use crate::public_link::DEFAULT_LINK_TTL_HOURS;
use crate::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Shared directory for originals and signed copies.
    pub upload_dir: PathBuf,
    /// JSON snapshot of the records. In memory only when unset.
    pub data_file: Option<PathBuf>,
    /// HMAC secret bearer tokens are signed with.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Public links are handed out as `<public_link_base>/<token>`.
    pub public_link_base: String,
    pub link_ttl_hours: i64,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = parse_or(&lookup, "PORT", 8000)?;
        let listen_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|err| Error::Validation(format!("invalid listen address: {}", err)))?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| Error::Validation("JWT_SECRET must be set".to_owned()))?;

        let link_ttl_hours = parse_or(&lookup, "PUBLIC_LINK_TTL_HOURS", DEFAULT_LINK_TTL_HOURS)?;
        if link_ttl_hours <= 0 {
            return Err(Error::Validation(
                "PUBLIC_LINK_TTL_HOURS must be positive".to_owned(),
            ));
        }

        Ok(Config {
            listen_addr,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            data_file: lookup("DATA_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            jwt_secret,
            jwt_issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "pdf-esign".to_owned()),
            public_link_base: lookup("PUBLIC_LINK_BASE")
                .unwrap_or_else(|| "http://localhost:5173/public".to_owned())
                .trim_end_matches('/')
                .to_owned(),
            link_ttl_hours,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("{} has an invalid value `{}`", key, value))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, Error> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(config.data_file.is_none());
        assert_eq!(config.link_ttl_hours, 24);
        assert_eq!(config.public_link_base, "http://localhost:5173/public");
    }

    #[test]
    fn secret_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("JWT_SECRET", "")]).is_err());
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = config_from(&[("JWT_SECRET", "x"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config_from(&[("JWT_SECRET", "x"), ("PUBLIC_LINK_TTL_HOURS", "0")]).is_err());
    }

    #[test]
    fn link_base_loses_trailing_slash() {
        let config = config_from(&[
            ("JWT_SECRET", "x"),
            ("PUBLIC_LINK_BASE", "https://sign.example.com/p/"),
        ])
        .unwrap();
        assert_eq!(config.public_link_base, "https://sign.example.com/p");
    }
}
