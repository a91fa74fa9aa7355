use std::collections::{HashMap, HashSet};

/// Per-document translation units.
///
/// Keyed by exact text, so two blocks that read the same are translated once
/// and share the result. The cache lives for one document and is dropped
/// with it.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<String, String>,
    misses: usize,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation of `text`, computing it with `translate` on first use only
    pub fn resolve<F>(&mut self, text: &str, translate: F) -> &str
    where
        F: FnOnce(&str) -> String,
    {
        if !self.entries.contains_key(text) {
            self.misses += 1;
            let translated = translate(text);
            self.entries.insert(text.to_string(), translated);
        }
        self.entries.get(text).map(String::as_str).unwrap_or_default()
    }

    pub fn get(&self, text: &str) -> Option<&str> {
        self.entries.get(text).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times a translation actually had to be computed
    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// Distinct texts in order of first appearance
pub fn unique_units<'a, I>(texts: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    texts.into_iter().filter(|t| seen.insert(*t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_translates_each_text_once() {
        let mut cache = TranslationCache::new();
        let mut calls = 0;
        for text in ["Dobrý den", "Sbohem", "Dobrý den"] {
            cache.resolve(text, |t| {
                calls += 1;
                t.to_uppercase()
            });
        }
        assert_eq!(calls, 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("Dobrý den"), Some("DOBRÝ DEN"));
    }

    #[test]
    fn test_units_are_case_sensitive() {
        let units = unique_units(["A", "a", "A", "b", "a"]);
        assert_eq!(units, vec!["A", "a", "b"]);
    }
}
