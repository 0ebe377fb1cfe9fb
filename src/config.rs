use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            // Missing config is not an error — every knob has a default.
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrossingDedup, IdPolicy};

    #[test]
    fn test_defaults_when_file_missing() {
        let config = Config::load("no_such_config.yaml").unwrap();
        assert_eq!(config.tracking.id_policy, IdPolicy::Qualify);
        assert_eq!(config.tracking.qualify_frames, 5);
        assert_eq!(config.tracking.trajectory_capacity, 30);
        assert_eq!(config.tracking.crossing_dedup, CrossingDedup::OncePerSession);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "tracking:\n  id_policy: immediate\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tracking.id_policy, IdPolicy::Immediate);
        assert_eq!(config.tracking.qualify_frames, 5);
        assert_eq!(config.logging.level, "info");
    }
}
