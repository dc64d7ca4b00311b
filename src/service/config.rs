//! Query service configuration.

use crate::pipeline::DEFAULT_TREATMENTS;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the service takes its summaries from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Result files written by the pipeline.
    Files,
    /// Fixed demonstration values.
    Stub,
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "files" => Ok(DataSource::Files),
            "stub" => Ok(DataSource::Stub),
            other => Err(format!("unknown data source '{}', expected 'files' or 'stub'", other)),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Files => write!(f, "files"),
            DataSource::Stub => write!(f, "stub"),
        }
    }
}

/// Settings fixed at startup and shared by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding `deg_<T>.csv` and the optional enrichment tables.
    pub processed_dir: PathBuf,
    /// Treatments the endpoints accept.
    pub treatments: Vec<String>,
    /// Listen address.
    pub bind: SocketAddr,
    pub source: DataSource,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            processed_dir: PathBuf::from("data/processed"),
            treatments: DEFAULT_TREATMENTS.iter().map(|t| t.to_string()).collect(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            source: DataSource::Files,
        }
    }
}

impl ServiceConfig {
    pub fn is_valid_treatment(&self, treatment: &str) -> bool {
        self.treatments.iter().any(|t| t == treatment)
    }

    /// Message returned for a treatment outside the configured set.
    pub fn invalid_treatment_message(&self) -> String {
        format!("Treatment must be one of [{}]", self.treatments.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind.port(), 8000);
        assert!(config.is_valid_treatment("CsA"));
        assert!(config.is_valid_treatment("VOC"));
        assert!(!config.is_valid_treatment("csa"));
        assert_eq!(
            config.invalid_treatment_message(),
            "Treatment must be one of [CsA, VOC]"
        );
    }

    #[test]
    fn test_data_source_parse() {
        assert_eq!("files".parse::<DataSource>().unwrap(), DataSource::Files);
        assert_eq!("STUB".parse::<DataSource>().unwrap(), DataSource::Stub);
        assert!("db".parse::<DataSource>().is_err());
        assert_eq!(DataSource::Stub.to_string(), "stub");
    }
}
