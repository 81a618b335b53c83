//! CLI enum types for capture resolution presets.

use clap::ValueEnum;

use crate::camera::Resolution;

/// Ideal capture size requested from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionPreset {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl From<ResolutionPreset> for Resolution {
    fn from(p: ResolutionPreset) -> Self {
        match p {
            ResolutionPreset::Low => Resolution::LOW,
            ResolutionPreset::Medium => Resolution::MEDIUM,
            ResolutionPreset::High => Resolution::HIGH,
            ResolutionPreset::Ultra => Resolution::ULTRA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_to_resolution() {
        assert_eq!(Resolution::from(ResolutionPreset::Low), Resolution::new(160, 120));
        assert_eq!(Resolution::from(ResolutionPreset::Medium), Resolution::new(320, 240));
        assert_eq!(Resolution::from(ResolutionPreset::High), Resolution::new(640, 480));
        assert_eq!(Resolution::from(ResolutionPreset::Ultra), Resolution::new(1280, 720));
    }

    #[test]
    fn test_preset_default_is_medium() {
        assert_eq!(ResolutionPreset::default(), ResolutionPreset::Medium);
    }

    #[test]
    fn test_preset_names_match_config_names() {
        for preset in ResolutionPreset::value_variants() {
            let name = preset.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(Resolution::preset(&name), Some(Resolution::from(*preset)));
        }
    }
}
