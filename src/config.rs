use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

pub const KEYRING_SERVICE: &str = "pshare-session";
pub const KEYRING_USER: &str = "pshare";
pub const ENV_PREFIX: &str = "PSHARE_";

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    pub base_url: Option<Url>,
    pub default_expiration: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    base_url: Option<Url>,
    default_expiration: Option<String>,
    session: Option<String>,
}

pub struct Config {
    pub base_url: Url,
    pub default_expiration: Option<String>,
    pub session_cookie: Option<String>,
}

fn merge_config<F>(base: ConfigFile, override_config: ConfigEnv, keyring_session: F) -> Result<Config>
where
    F: FnOnce() -> Result<Option<String>>,
{
    let default_expiration = override_config
        .default_expiration
        .or(base.default_expiration);

    let base_url = override_config
        .base_url
        .or(base.base_url)
        .ok_or(anyhow!(
            "No server URL provided; run `pshare config` or set {ENV_PREFIX}BASE_URL"
        ))?;

    let session_cookie = match override_config.session {
        Some(session) => Some(session),
        None => keyring_session()?,
    };

    Ok(Config {
        base_url,
        default_expiration,
        session_cookie,
    })
}

fn keyring_session() -> Result<Option<String>> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    match entry.get_secret() {
        Ok(secret) => Ok(Some(String::from_utf8(secret)?)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e).context("Unable to read session cookie from OS keyring"),
    }
}

fn config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("org", "pshare", "pshare")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::prefixed(ENV_PREFIX)
        .from_env::<ConfigEnv>()
        .unwrap_or_default();

    let file_config = if let Ok(config) = fs::read_to_string(config_path()?) {
        toml::from_str(&config).context("Failed to parse config.toml")?
    } else {
        ConfigFile::default()
    };

    merge_config(file_config, env_config, keyring_session)
}

pub fn write_config(config: ConfigFile) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    fs::write(&path, toml::to_string_pretty(&config)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn set_session_keyring(cookie: String) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_secret(cookie.as_bytes())?;
    println!("Session cookie stored for use with pshare");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Option<Url> {
        Some(Url::parse(s).unwrap())
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            base_url: url("https://file.example.com"),
            default_expiration: Some("7d".into()),
        };
        let env = ConfigEnv {
            base_url: url("https://env.example.com"),
            default_expiration: None,
            session: Some("token=env".into()),
        };

        let config = merge_config(file, env, || panic!("keyring must not be consulted")).unwrap();
        assert_eq!(config.base_url.as_str(), "https://env.example.com/");
        assert_eq!(config.default_expiration.as_deref(), Some("7d"));
        assert_eq!(config.session_cookie.as_deref(), Some("token=env"));
    }

    #[test]
    fn test_session_falls_back_to_keyring() {
        let file = ConfigFile {
            base_url: url("https://file.example.com"),
            default_expiration: None,
        };
        let config = merge_config(file, ConfigEnv::default(), || {
            Ok(Some("token=stored".into()))
        })
        .unwrap();
        assert_eq!(config.session_cookie.as_deref(), Some("token=stored"));
    }

    #[test]
    fn test_missing_base_url_is_an_error() {
        let result = merge_config(ConfigFile::default(), ConfigEnv::default(), || Ok(None));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_roundtrips_through_toml() {
        let text = "base_url = \"https://share.example.com/\"\ndefault_expiration = \"30d\"\n";
        let parsed: ConfigFile = toml::from_str(text).unwrap();
        assert_eq!(parsed.base_url, url("https://share.example.com/"));
        assert_eq!(parsed.default_expiration.as_deref(), Some("30d"));
    }
}
