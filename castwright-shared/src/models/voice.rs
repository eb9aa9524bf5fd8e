/// Voice presets
///
/// Shared by projects (the voice a project is narrated in) and audio files
/// (the voice a rendering actually used). Stored as text and limited by
/// CHECK constraints in both tables.

use serde::{Deserialize, Serialize};

/// Narration voice preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    #[default]
    MaleProfessional,
    FemaleProfessional,
    MaleCasual,
    FemaleCasual,

    /// Voice described entirely by the owner's settings bag
    Custom,
}

impl VoiceType {
    /// Every accepted value, in declaration order
    pub const VALUES: &'static [&'static str] = &[
        "male_professional",
        "female_professional",
        "male_casual",
        "female_casual",
        "custom",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceType::MaleProfessional => "male_professional",
            VoiceType::FemaleProfessional => "female_professional",
            VoiceType::MaleCasual => "male_casual",
            VoiceType::FemaleCasual => "female_casual",
            VoiceType::Custom => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice() {
        assert_eq!(VoiceType::default(), VoiceType::MaleProfessional);
    }

    #[test]
    fn test_values_match_serde_names() {
        let all = [
            VoiceType::MaleProfessional,
            VoiceType::FemaleProfessional,
            VoiceType::MaleCasual,
            VoiceType::FemaleCasual,
            VoiceType::Custom,
        ];

        for (voice, name) in all.iter().zip(VoiceType::VALUES) {
            assert_eq!(voice.as_str(), *name);
            assert_eq!(serde_json::to_value(voice).unwrap(), serde_json::json!(name));
        }
    }
}
