//! Decoder configuration: framing mode and wire-format version selection.
//!
//! Mirrors the teacher's typed, validated config-struct pattern, narrowed to
//! the one thing the core itself is parameterized by. No file or CLI
//! loading lives here — a caller builds this from whatever configuration
//! layer it has (TOML, environment, hardcoded) and hands it to
//! `Decoder::from_config`.

use serde::Deserialize;

use crate::decoder::{Framing, ItchVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DecoderConfig {
    pub framing: ConfigFraming,
    pub version: ConfigVersion,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            framing: ConfigFraming::LengthPrefixed,
            version: ConfigVersion::Itch50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFraming {
    LengthPrefixed,
    FixedByType,
}

impl From<ConfigFraming> for Framing {
    fn from(c: ConfigFraming) -> Framing {
        match c {
            ConfigFraming::LengthPrefixed => Framing::LengthPrefixed,
            ConfigFraming::FixedByType => Framing::FixedByType,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigVersion {
    Itch41,
    Itch50,
}

impl From<ConfigVersion> for ItchVersion {
    fn from(c: ConfigVersion) -> ItchVersion {
        match c {
            ConfigVersion::Itch41 => ItchVersion::V41,
            ConfigVersion::Itch50 => ItchVersion::V50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_toml() {
        let cfg: DecoderConfig = toml::from_str(
            r#"
            framing = "length_prefixed"
            version = "itch_50"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.framing, ConfigFraming::LengthPrefixed);
        assert_eq!(cfg.version, ConfigVersion::Itch50);
    }

    #[test]
    fn default_is_length_prefixed_v50() {
        let cfg = DecoderConfig::default();
        assert_eq!(cfg.framing, ConfigFraming::LengthPrefixed);
        assert_eq!(cfg.version, ConfigVersion::Itch50);
    }
}
