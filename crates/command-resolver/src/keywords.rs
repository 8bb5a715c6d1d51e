//! Literal keyword fallback

use crate::Command;

/// Default keyword table. Order matters: the first keyword found wins, so
/// stop words lead the table and longer words precede their prefixes
/// (`matikan` before `mati`).
pub const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("berhenti", "MS:0:0"),
    ("stop", "MS:0:0"),
    ("nyala", "L13:1:5"),
    ("hidup", "L13:1:5"),
    ("matikan", "L13:0:0"),
    ("mati", "L13:0:0"),
    ("suhu", "TR"),
    ("kelembaban", "HR"),
    ("maju", "MF:90:1"),
    ("mundur", "MB:90:1"),
    ("kiri", "ML:90:1"),
    ("kanan", "MR:90:1"),
    ("alarm", "S1000:1;S2000:1;S1000:1"),
    ("bel", "S2000:1"),
];

/// Keywords that only match a whole word, not a fragment of a longer one
/// (`bel` must not fire on `belok` or `kebelakang`).
pub const WHOLE_WORD_KEYWORDS: &[&str] = &["bel"];

#[derive(Debug, Clone)]
struct KeywordEntry {
    keyword: String,
    command: Command,
    whole_word: bool,
}

impl KeywordEntry {
    fn matches(&self, text: &str) -> bool {
        if self.whole_word {
            text.split(|c: char| !c.is_alphanumeric())
                .any(|word| word == self.keyword)
        } else {
            text.contains(self.keyword.as_str())
        }
    }
}

/// Ordered substring matcher mapping keywords straight to commands.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    entries: Vec<KeywordEntry>,
}

impl KeywordMatcher {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(kw, cmd)| KeywordEntry {
                    keyword: kw.to_lowercase(),
                    command: Command::new(cmd),
                    whole_word: false,
                })
                .collect(),
        }
    }

    /// Restrict the listed keywords to whole-word matches.
    pub fn with_whole_words<'a, I>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for keyword in keywords {
            let keyword = keyword.to_lowercase();
            for entry in self.entries.iter_mut().filter(|e| e.keyword == keyword) {
                entry.whole_word = true;
            }
        }
        self
    }

    /// First keyword (in table order) contained in the lowercased, trimmed
    /// text, together with its command.
    pub fn find(&self, text: &str) -> Option<(&str, &Command)> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.matches(&text))
            .map(|entry| (entry.keyword.as_str(), &entry.command))
    }

    pub fn match_command(&self, text: &str) -> Option<&Command> {
        self.find(text).map(|(_, cmd)| cmd)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::from_entries(DEFAULT_KEYWORDS.iter().copied())
            .with_whole_words(WHOLE_WORD_KEYWORDS.iter().copied())
    }
}
