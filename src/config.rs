use crate::models::{BayesianPrior, PopularityWeights, RelevanceWeights};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    #[validate(nested)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub relevance: RelevanceSettings,
    #[serde(default)]
    #[validate(nested)]
    pub facets: FacetSettings,
    #[serde(default)]
    #[validate(nested)]
    pub results: ResultSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// Unset means candidates come from a fixture file
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RankingSettings {
    /// Bayesian prior mean `C`
    #[serde(default = "default_prior_mean")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub prior_mean: f64,
    /// Bayesian minimum votes `m`
    #[serde(default = "default_min_votes")]
    #[validate(range(min = 0.0))]
    pub min_votes: f64,
    #[serde(default = "default_online_window")]
    #[validate(range(min = 1))]
    pub online_window_minutes: i64,
    #[serde(default)]
    pub popularity: PopularityWeightsConfig,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            prior_mean: default_prior_mean(),
            min_votes: default_min_votes(),
            online_window_minutes: default_online_window(),
            popularity: PopularityWeightsConfig::default(),
        }
    }
}

impl RankingSettings {
    pub fn prior(&self) -> BayesianPrior {
        BayesianPrior {
            min_votes: self.min_votes,
            prior_mean: self.prior_mean,
        }
    }
}

fn default_prior_mean() -> f64 { 3.5 }
fn default_min_votes() -> f64 { 3.0 }
fn default_online_window() -> i64 { 15 }

#[derive(Debug, Clone, Deserialize)]
pub struct PopularityWeightsConfig {
    #[serde(default = "default_views_weight")]
    pub views: f64,
    #[serde(default = "default_bookings_weight")]
    pub bookings: f64,
    #[serde(default = "default_reviews_weight")]
    pub reviews: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
}

impl Default for PopularityWeightsConfig {
    fn default() -> Self {
        Self {
            views: default_views_weight(),
            bookings: default_bookings_weight(),
            reviews: default_reviews_weight(),
            rating: default_rating_weight(),
        }
    }
}

impl From<&PopularityWeightsConfig> for PopularityWeights {
    fn from(config: &PopularityWeightsConfig) -> Self {
        Self {
            views: config.views,
            bookings: config.bookings,
            reviews: config.reviews,
            rating: config.rating,
        }
    }
}

fn default_views_weight() -> f64 { 0.1 }
fn default_bookings_weight() -> f64 { 0.4 }
fn default_reviews_weight() -> f64 { 0.3 }
fn default_rating_weight() -> f64 { 0.2 }

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceSettings {
    #[serde(default = "default_name_weight")]
    pub name: f64,
    #[serde(default = "default_specialty_weight")]
    pub specialty: f64,
    #[serde(default = "default_description_weight")]
    pub description: f64,
    #[serde(default = "default_city_weight")]
    pub city: f64,
    #[serde(default = "default_services_weight")]
    pub services_description: f64,
}

impl Default for RelevanceSettings {
    fn default() -> Self {
        Self {
            name: default_name_weight(),
            specialty: default_specialty_weight(),
            description: default_description_weight(),
            city: default_city_weight(),
            services_description: default_services_weight(),
        }
    }
}

impl From<&RelevanceSettings> for RelevanceWeights {
    fn from(config: &RelevanceSettings) -> Self {
        Self {
            name: config.name,
            specialty: config.specialty,
            description: config.description,
            city: config.city,
            services_description: config.services_description,
        }
    }
}

fn default_name_weight() -> f64 { 4.0 }
fn default_specialty_weight() -> f64 { 3.5 }
fn default_description_weight() -> f64 { 2.5 }
fn default_city_weight() -> f64 { 2.0 }
fn default_services_weight() -> f64 { 2.2 }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FacetSettings {
    #[serde(default = "default_city_limit")]
    #[validate(range(min = 1))]
    pub city_limit: usize,
    #[serde(default = "default_specialty_limit")]
    #[validate(range(min = 1))]
    pub specialty_limit: usize,
}

impl Default for FacetSettings {
    fn default() -> Self {
        Self {
            city_limit: default_city_limit(),
            specialty_limit: default_specialty_limit(),
        }
    }
}

fn default_city_limit() -> usize { 20 }
fn default_specialty_limit() -> usize { 15 }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResultSettings {
    /// Prefix for profile URLs, e.g. `https://example.com`
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100))]
    pub default_per_page: u32,
    #[serde(default = "default_max_per_page")]
    #[validate(range(min = 1, max = 100))]
    pub max_per_page: u32,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

fn default_per_page() -> u32 { 20 }
fn default_max_per_page() -> u32 { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SEARCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));
        Self::finish(builder)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        // e.g., SEARCH__RANKING__PRIOR_MEAN -> ranking.prior_mean
        let mut builder = builder.add_source(
            Environment::with_prefix("SEARCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // DATABASE_URL wins over the file so the usual sqlx variable works
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }
}
