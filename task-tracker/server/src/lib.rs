pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Config {
        #[serde(default = "default_host")]
        pub host: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Per-day base rate of the overdue-fee model.
        #[serde(default = "default_fee_base_rate")]
        pub fee_base_rate: f64,
        /// Insert a few sample tasks at start-up.
        #[serde(default)]
        pub seed_demo_data: bool,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_builder(config::Config::builder().add_source(config::Environment::default()))
        }

        fn from_builder(
            builder: config::ConfigBuilder<config::builder::DefaultState>,
        ) -> anyhow::Result<Self> {
            let config: Config = builder.build()?.try_deserialize()?;
            if !config.fee_base_rate.is_finite() || config.fee_base_rate <= 0.0 {
                anyhow::bail!(
                    "fee_base_rate must be a positive number, got {}",
                    config.fee_base_rate
                );
            }
            Ok(config)
        }
    }

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_fee_base_rate() -> f64 {
        crate::task::fee::DEFAULT_BASE_RATE
    }

}

pub mod clock;
pub mod task;
pub mod web;
