//! Decides whether a user message asks for an action, in which case the
//! first model step must call a tool.

use regex::Regex;
use tracing::warn;

/// English action verbs, matched as whole words.
pub const ENGLISH_KEYWORDS: &[&str] = &[
    "commit", "push", "execute", "run", "deploy", "delete", "remove", "create", "write", "save",
    "install",
];

/// Chinese action verbs, matched anywhere (no word boundaries in CJK text).
pub const CHINESE_KEYWORDS: &[&str] = &[
    "提交", "推送", "执行", "运行", "部署", "删除", "创建", "写入", "保存", "安装",
];

pub trait ActionClassifier: Send + Sync {
    fn requires_action(&self, text: &str) -> bool;
}

/// Case-insensitive keyword match.
pub struct KeywordClassifier {
    pattern: Option<Regex>,
}

impl KeywordClassifier {
    /// Classifier with the default keyword lists.
    pub fn new() -> Self {
        Self::with_keywords(ENGLISH_KEYWORDS, CHINESE_KEYWORDS)
    }

    /// `words` match on word boundaries; `fragments` match as substrings.
    pub fn with_keywords(words: &[&str], fragments: &[&str]) -> Self {
        let mut alternatives = Vec::new();
        if !words.is_empty() {
            let joined: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
            alternatives.push(format!(r"\b(?:{})\b", joined.join("|")));
        }
        alternatives.extend(fragments.iter().map(|f| regex::escape(f)));

        if alternatives.is_empty() {
            return Self { pattern: None };
        }

        let pattern = match Regex::new(&format!("(?i){}", alternatives.join("|"))) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "invalid action keyword pattern, classifier disabled");
                None
            }
        };
        Self { pattern }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionClassifier for KeywordClassifier {
    fn requires_action(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(text))
    }
}
