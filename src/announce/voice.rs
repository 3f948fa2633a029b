use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    Male,
}

impl VoiceGender {
    fn as_word(self) -> &'static str {
        match self {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        }
    }
}

impl FromStr for VoiceGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "female" => Ok(VoiceGender::Female),
            "male" => Ok(VoiceGender::Male),
            other => Err(format!("unknown voice gender: {}", other)),
        }
    }
}

/// A voice offered by the speech backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. "en-US"
    pub language: String,
    pub gender: Option<VoiceGender>,
}

impl Voice {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            gender: None,
        }
    }

    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Voice used when the backend offers nothing suitable
    pub fn fallback(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    fn speaks(&self, language: &str) -> bool {
        self.language.eq_ignore_ascii_case(language)
    }

    fn is(&self, gender: VoiceGender) -> bool {
        if let Some(declared) = self.gender {
            return declared == gender;
        }
        // Many platforms only encode gender in the voice name ("... Female").
        // Match whole words so "female" does not count as "male".
        self.name
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case(gender.as_word()))
    }
}

/// Voice selection preferences
#[derive(Debug, Clone)]
pub struct VoicePolicy {
    pub language: String,
    pub gender: Option<VoiceGender>,
    pub fallback_voice: String,
}

impl VoicePolicy {
    /// Language and gender match first, then language only, then the fallback voice
    pub fn select(&self, voices: &[Voice]) -> Voice {
        if let Some(gender) = self.gender {
            if let Some(v) = voices
                .iter()
                .find(|v| v.speaks(&self.language) && v.is(gender))
            {
                return v.clone();
            }
        }

        if let Some(v) = voices.iter().find(|v| v.speaks(&self.language)) {
            return v.clone();
        }

        voices
            .iter()
            .find(|v| v.name == self.fallback_voice)
            .cloned()
            .unwrap_or_else(|| Voice::fallback(self.fallback_voice.clone()))
    }
}

impl Default for VoicePolicy {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            gender: Some(VoiceGender::Female),
            fallback_voice: "default".to_string(),
        }
    }
}
