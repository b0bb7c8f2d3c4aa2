//! Supported target languages.
//!
//! The catalog is fixed at compile time. [`LanguageCode`] can only be built
//! from a catalog entry, so a session can never hold an unsupported code.

use std::fmt;

/// A catalog entry: short code plus a human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    pub code: &'static str,
    pub label: &'static str,
}

/// The 30 supported languages, in menu order.
pub static LANGUAGES: [Language; 30] = [
    Language { code: "en", label: "🇬🇧 English" },
    Language { code: "zh-CN", label: "🇨🇳 Chinese (Simplified)" },
    Language { code: "hi", label: "🇮🇳 Hindi" },
    Language { code: "es", label: "🇪🇸 Spanish" },
    Language { code: "fr", label: "🇫🇷 French" },
    Language { code: "ar", label: "🇸🇦 Arabic" },
    Language { code: "bn", label: "🇧🇩 Bengali" },
    Language { code: "ru", label: "🇷🇺 Russian" },
    Language { code: "pt", label: "🇧🇷 Portuguese" },
    Language { code: "ur", label: "🇵🇰 Urdu" },
    Language { code: "id", label: "🇮🇩 Indonesian" },
    Language { code: "de", label: "🇩🇪 German" },
    Language { code: "ja", label: "🇯🇵 Japanese" },
    Language { code: "sw", label: "🇰🇪 Swahili" },
    Language { code: "mr", label: "🇮🇳 Marathi" },
    Language { code: "te", label: "🇮🇳 Telugu" },
    Language { code: "tr", label: "🇹🇷 Turkish" },
    Language { code: "ko", label: "🇰🇷 Korean" },
    Language { code: "vi", label: "🇻🇳 Vietnamese" },
    Language { code: "ta", label: "🇮🇳 Tamil" },
    Language { code: "ha", label: "🇳🇬 Hausa" },
    Language { code: "th", label: "🇹🇭 Thai" },
    Language { code: "gu", label: "🇮🇳 Gujarati" },
    Language { code: "pl", label: "🇵🇱 Polish" },
    Language { code: "uk", label: "🇺🇦 Ukrainian" },
    Language { code: "fa", label: "🇮🇷 Persian" },
    Language { code: "ml", label: "🇮🇳 Malayalam" },
    Language { code: "kn", label: "🇮🇳 Kannada" },
    Language { code: "or", label: "🇮🇳 Oriya" },
    Language { code: "pa", label: "🇮🇳 Punjabi" },
];

/// A validated language code from [`LANGUAGES`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageCode(&'static Language);

impl LanguageCode {
    /// Fallback language for new sessions.
    pub const DEFAULT: LanguageCode = LanguageCode(&LANGUAGES[0]);

    /// Look up a code in the catalog. Matching is exact.
    pub fn parse(code: &str) -> Option<Self> {
        LANGUAGES
            .iter()
            .find(|lang| lang.code == code)
            .map(LanguageCode)
    }

    pub fn code(&self) -> &'static str {
        self.0.code
    }

    pub fn label(&self) -> &'static str {
        self.0.label
    }

    /// All catalog entries as codes, in menu order.
    pub fn all() -> impl Iterator<Item = LanguageCode> {
        LANGUAGES.iter().map(LanguageCode)
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LanguageCode").field(&self.0.code).finish()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.code)
    }
}
