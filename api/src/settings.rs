use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{processor::stripe, sqlite};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    /// Base URL of the web client, used to build checkout redirect URLs.
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub sqlite: sqlite::Settings,
    pub stripe: stripe::Settings,
    pub site: SiteSettings,
}

impl Settings {
    /// Defaults, then `config/default.toml` and `config/local.toml` if present,
    /// then `CLUBSPHERE_`-prefixed environment variables (`__` separates sections).
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("sqlite.url", "sqlite://clubsphere.db")?
            .set_default("stripe.secret_key", "")?
            .set_default("stripe.base_url", "https://api.stripe.com")?
            .set_default("stripe.currency", "usd")?
            .set_default("site.domain", "http://localhost:5173")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("CLUBSPHERE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
