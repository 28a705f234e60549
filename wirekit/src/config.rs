//! Framework configuration. [ApplicationConfig] is created with opinionated default values, which
//! can then be overwritten by environment variables prefixed with `WIREKIT_` or the `wirekit.json`
//! file. The config can also be given explicitly to the
//! [ApplicationBuilder](crate::application::ApplicationBuilder).

use config::{Config, Environment, File};
use serde::Deserialize;
use wirekit_di::instance::{error_ptr, ErrorPtr};
use wirekit_di::lifetime::{ServiceLifetime, UnknownLifetimeError};

const CONFIG_ENV_PREFIX: &str = "WIREKIT";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "wirekit.json";

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,

    /// Lifetime of services without explicit lifetime and lifetime markers. Such services are not
    /// registered if not set.
    pub default_lifetime: Option<ServiceLifetime>,

    /// Names of additional plug-in modules.
    pub plugins: Vec<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            default_lifetime: None,
            plugins: Vec::new(),
        }
    }
}

impl TryFrom<OptionalApplicationConfig> for ApplicationConfig {
    type Error = UnknownLifetimeError;

    fn try_from(value: OptionalApplicationConfig) -> Result<Self, Self::Error> {
        let default = Self::default();
        Ok(Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            default_lifetime: value
                .default_lifetime
                .map(|lifetime| lifetime.parse::<ServiceLifetime>())
                .transpose()?
                .or(default.default_lifetime),
            plugins: value.plugins.unwrap_or(default.plugins),
        })
    }
}

impl ApplicationConfig {
    pub fn with_install_tracing_logger(mut self, install_tracing_logger: bool) -> Self {
        self.install_tracing_logger = install_tracing_logger;
        self
    }

    pub fn with_default_lifetime(mut self, default_lifetime: Option<ServiceLifetime>) -> Self {
        self.default_lifetime = default_lifetime;
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<String>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Loads the config from the default file and environment.
    pub fn init_from_environment() -> Result<Self, ErrorPtr> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("plugins"),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map_err(error_ptr)
            .and_then(|config| config.try_into().map_err(error_ptr))
    }
}

#[derive(Deserialize, Default)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    default_lifetime: Option<String>,
    plugins: Option<Vec<String>>,
}
