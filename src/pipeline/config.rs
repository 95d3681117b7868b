use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::quantize::{DEFAULT_MAX_COST, Quantizer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub max_cost: i32,
    pub parallel_components: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MAX_COST,
            parallel_components: false,
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<()> {
        self.quantizer().map(|_| ())
    }

    pub fn quantizer(&self) -> Result<Quantizer> {
        Quantizer::new(self.max_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: MatchingConfig =
            serde_json::from_str(r#"{"parallel_components": true}"#).expect("parse config");
        assert!(config.parallel_components);
        assert_eq!(config.max_cost, DEFAULT_MAX_COST);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_max_cost() {
        let config = MatchingConfig {
            max_cost: 0,
            ..MatchingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MatchError::InvalidArgument(_))
        ));
    }
}
