//! Server configuration, layered as: built-in defaults, an optional TOML
//! file, `DIGIT_SERVE_*` environment variables, then command line overrides

use crate::preprocess::Polarity;
use crate::torch::{InputLayout, OutputActivation};
use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;

/// Config file read when `DIGIT_SERVE_CONFIG` is unset. It may be absent.
pub const DEFAULT_CONFIG_FILE: &str = "digit-serve.toml";

/// Prefix of the environment variables that override config keys
pub const ENV_PREFIX: &str = "DIGIT_SERVE";

pub const DEFAULT_LOG: &str = "digit_serve=info,actix_web=info";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// TorchScript file holding the trained classifier
    pub model_path: String,

    pub input_layout: InputLayout,
    pub activation: OutputActivation,

    /// Which way round the digits in incoming images are drawn
    pub polarity: Polarity,

    /// Largest accepted image payload, in bytes
    pub max_upload_bytes: usize,

    /// Number of HTTP worker threads. Defaults to one per core.
    pub workers: Option<usize>,

    /// Tracing filter used when `RUST_LOG` is unset
    pub log: String,
}

/// Values given on the command line, which beat every other source
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub model_path: Option<String>,
}

impl Settings {
    pub fn load(overrides: Overrides) -> Result<Self> {
        let file = env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file, overrides)
    }

    pub fn load_from(file: &str, overrides: Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("model_path", "models/mnist.pt")?
            .set_default("input_layout", "flat")?
            .set_default("activation", "softmax")?
            .set_default("polarity", "light-on-dark")?
            .set_default("max_upload_bytes", 4 * 1024 * 1024_i64)?
            .set_default("log", DEFAULT_LOG)?
            .add_source(File::new(file, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        if let Some(port) = overrides.port {
            builder = builder.set_override("port", port as i64)?;
        }
        if let Some(model_path) = overrides.model_path {
            builder = builder.set_override("model_path", model_path)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from("does-not-exist.toml", Overrides::default()).unwrap();
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.model_path, "models/mnist.pt");
        assert_eq!(settings.input_layout, InputLayout::Flat);
        assert_eq!(settings.activation, OutputActivation::Softmax);
        assert_eq!(settings.polarity, Polarity::LightOnDark);
        assert_eq!(settings.max_upload_bytes, 4 * 1024 * 1024);
        assert_eq!(settings.workers, None);
        assert_eq!(settings.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_file_and_overrides() {
        let path = env::temp_dir().join(format!("digit-serve-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "port = 8080\nmodel_path = \"from-file.pt\"\npolarity = \"dark-on-light\"\ninput_layout = \"image\"\nworkers = 2"
        )
        .unwrap();

        let overrides = Overrides {
            port: None,
            model_path: Some("from-cli.pt".into()),
        };
        let settings = Settings::load_from(path.to_str().unwrap(), overrides).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.model_path, "from-cli.pt");
        assert_eq!(settings.polarity, Polarity::DarkOnLight);
        assert_eq!(settings.input_layout, InputLayout::Image);
        assert_eq!(settings.workers, Some(2));
    }
}
