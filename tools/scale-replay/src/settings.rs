//! Filter settings loading
//!
//! Layering, lowest to highest priority:
//! 1. built-in defaults (`ScaleSettings::default()`)
//! 2. settings file (TOML, YAML or JSON, chosen by extension)
//! 3. `SCALE_*` environment variables (`SCALE_ENABLE`, `SCALE_FACTOR`, ...)
//!
//! `SCALE_MATCH` is merged verbatim. Running it through figment's value
//! parser would turn `[abc]` into a sequence and `123` into a number.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use scale_filter::{plugin_info, ConfigCategory, ScaleSettings};
use std::path::Path;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SCALE_";

const MATCH_KEY: &str = "match";

/// Load settings from defaults, an optional file and the environment
pub fn load_settings(path: Option<&Path>) -> Result<ScaleSettings> {
    let mut figment = Figment::from(Serialized::defaults(ScaleSettings::default()));

    if let Some(path) = path {
        figment = merge_file(figment, path)?;
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&[MATCH_KEY]));
    if let Some(pattern) = Env::var(&format!("{ENV_PREFIX}MATCH")) {
        figment = figment.merge(Serialized::default(MATCH_KEY, pattern));
    }

    figment.extract().context("Failed to load filter settings")
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.exists() {
        bail!("Settings file not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .context("Settings file must have an extension")?;

    let figment = match extension {
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        "json" => figment.merge(Json::file(path)),
        _ => bail!("Unsupported settings file format: {}", extension),
    };
    Ok(figment)
}

/// Host-style configuration category carrying `settings` as item values
pub fn to_category(name: &str, settings: &ScaleSettings) -> Result<ConfigCategory> {
    let mut category = ConfigCategory::from_default_config(name, &plugin_info());
    category.set_value("enable", settings.enable.to_string())?;
    category.set_value("factor", settings.factor.to_string())?;
    category.set_value("offset", settings.offset.to_string())?;
    category.set_value(MATCH_KEY, settings.match_pattern.as_str())?;
    Ok(category)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // unwrap is acceptable in tests
mod tests {
    use super::*;
    use figment::Jail;
    use scale_filter::ScaleConfig;

    // Every test runs inside a jail: a private working directory and an
    // environment without stray `SCALE_*` variables.
    fn jailed(f: impl FnOnce(&mut Jail)) {
        Jail::expect_with(|jail| {
            jail.clear_env();
            f(jail);
            Ok(())
        });
    }

    #[test]
    fn test_defaults_without_file() {
        jailed(|_| {
            let settings = load_settings(None).unwrap();
            assert!(!settings.enable);
            assert_eq!(settings.factor, 100.0);
            assert_eq!(settings.offset, 0.0);
            assert!(settings.match_pattern.is_empty());
        });
    }

    #[test]
    fn test_yaml_file() {
        jailed(|jail| {
            jail.create_file(
                "scale.yaml",
                "enable: true\nfactor: 2\noffset: \"-6\"\nmatch: \"test.*\"\n",
            )
            .unwrap();
            let settings = load_settings(Some(Path::new("scale.yaml"))).unwrap();
            assert!(settings.enable);
            assert_eq!(settings.factor, 2.0);
            assert_eq!(settings.offset, -6.0);
            assert_eq!(settings.match_pattern, "test.*");
        });
    }

    #[test]
    fn test_toml_file_keeps_defaults_for_missing_keys() {
        jailed(|jail| {
            jail.create_file("scale.toml", "enable = \"TRUE\"\noffset = 1.5\n")
                .unwrap();
            let settings = load_settings(Some(Path::new("scale.toml"))).unwrap();
            assert!(settings.enable);
            assert_eq!(settings.factor, 100.0);
            assert_eq!(settings.offset, 1.5);
        });
    }

    #[test]
    fn test_unsupported_extension() {
        jailed(|jail| {
            jail.create_file("scale.ini", "factor=2").unwrap();
            assert!(load_settings(Some(Path::new("scale.ini"))).is_err());
        });
    }

    #[test]
    fn test_missing_file() {
        jailed(|_| {
            assert!(load_settings(Some(Path::new("missing.yaml"))).is_err());
        });
    }

    #[test]
    fn test_env_overrides_file() {
        jailed(|jail| {
            jail.create_file("scale.json", r#"{"factor": 2, "offset": 1}"#)
                .unwrap();
            jail.set_env("SCALE_FACTOR", "3");
            jail.set_env("SCALE_ENABLE", "true");

            let settings = load_settings(Some(Path::new("scale.json"))).unwrap();
            assert!(settings.enable);
            assert_eq!(settings.factor, 3.0);
            assert_eq!(settings.offset, 1.0);
        });
    }

    #[test]
    fn test_env_match_is_taken_verbatim() {
        for pattern in ["[abc]", "123", "true", "pump-[0-9]+"] {
            jailed(|jail| {
                jail.set_env("SCALE_MATCH", pattern);
                let settings = load_settings(None).unwrap();
                assert_eq!(settings.match_pattern, pattern);
            });
        }
    }

    #[test]
    fn test_bracketed_env_match_filters_assets() {
        jailed(|jail| {
            jail.set_env("SCALE_MATCH", "[abc]");
            let settings = load_settings(None).unwrap();
            let config = ScaleConfig::try_from(settings).unwrap();
            assert!(config.matches_asset("b"));
            assert!(!config.matches_asset("d"));
        });
    }

    #[test]
    fn test_env_match_overrides_file() {
        jailed(|jail| {
            jail.create_file("scale.yaml", "match: \"pump.*\"\n").unwrap();
            jail.set_env("SCALE_MATCH", "fan");
            let settings = load_settings(Some(Path::new("scale.yaml"))).unwrap();
            assert_eq!(settings.match_pattern, "fan");
        });
    }

    #[test]
    fn test_category_round_trip() {
        let settings = ScaleSettings {
            enable: true,
            factor: 0.5,
            offset: -2.0,
            match_pattern: "pump.*".to_string(),
        };
        let category = to_category("scale", &settings).unwrap();
        assert_eq!(category.to_settings().unwrap(), settings);

        let config = ScaleConfig::from_category(&category).unwrap();
        assert_eq!(config.pattern(), Some("pump.*"));
    }
}
