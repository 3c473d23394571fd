use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration, layered from config files and `DESK_*`
/// environment variables (environment wins).
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Country calling code prepended to wa.me links, without the plus sign.
    pub whatsapp_country_code: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("DESK"))
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 8080)?
            .set_default("whatsapp_country_code", "593")?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_everything_but_the_database() {
        std::env::set_var("DESK_DATABASE_URL", "postgres://localhost/subsdesk_test");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.whatsapp_country_code, "593");
        std::env::remove_var("DESK_DATABASE_URL");
    }
}
