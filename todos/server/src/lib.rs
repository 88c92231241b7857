pub mod config {
    use serde::Deserialize;

    /// Whether the service runs locally or behind the production gateway.
    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum AppEnv {
        #[default]
        Development,
        Production,
    }

    impl AppEnv {
        /// In production CORS is handled by the gateway in front of the service.
        pub fn handles_cors(&self) -> bool {
            matches!(self, AppEnv::Development)
        }
    }

    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum StorageBackend {
        #[default]
        Memory,
        Relational,
        Dynamodb,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default)]
        pub environment: AppEnv,
        /// Comma-separated list of browser origins.
        #[serde(default = "default_allowed_origins")]
        pub allowed_origins: String,
        #[serde(default = "default_true")]
        pub cors_strict_origin: bool,
        #[serde(default)]
        pub storage: StorageBackend,
        pub db_url: Option<String>,
        #[serde(default = "default_dynamodb_table")]
        pub dynamodb_table: String,
        pub aws_region: Option<String>,
        #[serde(default)]
        pub seed_sample_todos: bool,
        #[serde(default)]
        pub trust_proxy: bool,
        #[serde(default = "default_rate_limit_max_requests")]
        pub rate_limit_max_requests: u32,
        #[serde(default = "default_rate_limit_window_secs")]
        pub rate_limit_window_secs: u64,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_source(config::Environment::default())
        }

        fn from_source(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment)
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Returns the configured CORS origins, trimmed, without empty entries.
        pub fn allowed_origins(&self) -> Vec<String> {
            self.allowed_origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                port: default_port(),
                environment: AppEnv::default(),
                allowed_origins: default_allowed_origins(),
                cors_strict_origin: true,
                storage: StorageBackend::default(),
                db_url: None,
                dynamodb_table: default_dynamodb_table(),
                aws_region: None,
                seed_sample_todos: false,
                trust_proxy: false,
                rate_limit_max_requests: default_rate_limit_max_requests(),
                rate_limit_window_secs: default_rate_limit_window_secs(),
            }
        }
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_allowed_origins() -> String {
        "http://localhost:5173".to_string()
    }

    fn default_true() -> bool {
        true
    }

    fn default_dynamodb_table() -> String {
        "todos".to_string()
    }

    fn default_rate_limit_max_requests() -> u32 {
        30
    }

    fn default_rate_limit_window_secs() -> u64 {
        15 * 60
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn from_pairs(pairs: &[(&str, &str)]) -> Config {
            let mut builder = config::Config::builder();
            for (key, value) in pairs {
                builder = builder.set_override(*key, *value).unwrap();
            }
            builder.build().unwrap().try_deserialize().unwrap()
        }

        #[test]
        fn can_fall_back_to_defaults() {
            let config = from_pairs(&[]);

            assert_eq!(config.port, 3000);
            assert_eq!(config.environment, AppEnv::Development);
            assert_eq!(config.storage, StorageBackend::Memory);
            assert_eq!(config.allowed_origins(), ["http://localhost:5173"]);
            assert!(config.cors_strict_origin);
            assert_eq!(config.rate_limit_max_requests, 30);
            assert_eq!(config.rate_limit_window_secs, 900);
        }

        #[test]
        fn can_read_string_values() {
            let config = from_pairs(&[
                ("port", "8080"),
                ("environment", "production"),
                ("storage", "dynamodb"),
                ("trust_proxy", "true"),
                ("allowed_origins", "https://a.example, https://b.example,"),
            ]);

            assert_eq!(config.port, 8080);
            assert_eq!(config.environment, AppEnv::Production);
            assert!(!config.environment.handles_cors());
            assert_eq!(config.storage, StorageBackend::Dynamodb);
            assert!(config.trust_proxy);
            assert_eq!(
                config.allowed_origins(),
                ["https://a.example", "https://b.example"]
            );
        }

        #[test]
        fn can_read_production_mode_from_environment_variable() {
            let variables = [
                ("ENVIRONMENT".to_string(), "production".to_string()),
                ("RATE_LIMIT_MAX_REQUESTS".to_string(), "5".to_string()),
            ];
            let source =
                config::Environment::default().source(Some(variables.into_iter().collect()));

            let config = Config::from_source(source).unwrap();

            assert_eq!(config.environment, AppEnv::Production);
            assert!(!config.environment.handles_cors());
            assert_eq!(config.rate_limit_max_requests, 5);
        }
    }
}
pub mod entities;
pub mod todo;
pub mod web;
