// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANGUAGE: &str = "sl";

const CATALOGUES: [(&str, &str); 2] = [
    ("sl", include_str!("../../locales/sl.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// User-facing message catalogues, keyed by language then message code.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in CATALOGUES {
            let catalogue: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("locale catalogue '{}' is invalid: {}", lang, e))?;
            messages.insert(lang.to_string(), catalogue);
        }
        tracing::debug!("Loaded {} locale catalogues", messages.len());
        Ok(Self { messages })
    }

    /// Falls back to the default language, then to the code itself.
    pub fn translate(&self, lang: &str, code: &str) -> String {
        self.lookup(lang, code)
            .or_else(|| self.lookup(DEFAULT_LANGUAGE, code))
            .unwrap_or_else(|| code.to_string())
    }

    fn lookup(&self, lang: &str, code: &str) -> Option<String> {
        self.messages.get(lang).and_then(|m| m.get(code)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogues_share_the_same_codes() {
        let store = I18nStore::load().unwrap();
        let sl = &store.messages["sl"];
        let en = &store.messages["en"];
        let mut sl_keys: Vec<_> = sl.keys().collect();
        let mut en_keys: Vec<_> = en.keys().collect();
        sl_keys.sort();
        en_keys.sort();
        assert_eq!(sl_keys, en_keys);
    }

    #[test]
    fn unknown_language_falls_back_to_slovenian() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("de", "draft_saved"), "Osnutek je shranjen.");
        assert_eq!(store.translate("en", "no_such_code"), "no_such_code");
    }
}
