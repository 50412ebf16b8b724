use regex::{Regex, RegexBuilder};

/// Finds forbidden content in a message, returning the matched excerpt.
pub trait ContentMatcher: Send + Sync {
    fn find(&self, text: &str) -> Option<String>;
}

/// Whole-word, case-insensitive alternation over configured patterns.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Option<Regex>,
}

impl PatternMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<&str> = patterns
            .iter()
            .map(|pattern| pattern.as_ref().trim())
            .filter(|pattern| !pattern.is_empty())
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }

        let regex = RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
            .case_insensitive(true)
            .unicode(true)
            .build()?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn disabled() -> Self {
        Self { regex: None }
    }
}

impl ContentMatcher for PatternMatcher {
    fn find(&self, text: &str) -> Option<String> {
        self.regex
            .as_ref()?
            .find(text)
            .map(|found| found.as_str().to_string())
    }
}
