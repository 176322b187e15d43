//! Reply length budgeting.
//!
//! Short messages get short answers: the token ceiling of each request is
//! derived from the word count of the user's input.

use parlor_core::persona::DEFAULT_MAX_TOKENS;

/// Number of whitespace-separated words in the trimmed input.
pub fn word_count(input: &str) -> usize {
    input.split_whitespace().count()
}

/// How long the reply should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLength {
    /// Three words or fewer
    VeryBrief,
    /// Up to eight words
    Short,
    /// Up to twenty words
    Moderate,
    /// Up to forty words
    Medium,
    /// Anything longer
    Long,
}

impl ReplyLength {
    pub fn for_words(words: usize) -> Self {
        match words {
            0..=3 => Self::VeryBrief,
            4..=8 => Self::Short,
            9..=20 => Self::Moderate,
            21..=40 => Self::Medium,
            _ => Self::Long,
        }
    }

    pub fn for_input(input: &str) -> Self {
        Self::for_words(word_count(input))
    }

    /// Token budget for this length, capped by the persona's own ceiling for
    /// long replies.
    pub fn max_tokens(self, persona_ceiling: u32) -> u32 {
        match self {
            Self::VeryBrief => 80,
            Self::Short => 150,
            Self::Moderate => 250,
            Self::Medium => 400,
            Self::Long => DEFAULT_MAX_TOKENS.min(persona_ceiling),
        }
    }
}

/// Token budget for `input` given the persona ceiling.
pub fn token_budget(input: &str, persona_ceiling: u32) -> u32 {
    ReplyLength::for_input(input).max_tokens(persona_ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_budget_table() {
        assert_eq!(token_budget(&words(2), 600), 80);
        assert_eq!(token_budget(&words(5), 600), 150);
        assert_eq!(token_budget(&words(15), 600), 250);
        assert_eq!(token_budget(&words(30), 600), 400);
        assert_eq!(token_budget(&words(60), 600), 600);
    }

    #[test]
    fn test_long_budget_respects_persona_ceiling() {
        assert_eq!(token_budget(&words(60), 500), 500);
        assert_eq!(token_budget(&words(60), 800), 600);
        // Shorter tiers are not capped.
        assert_eq!(token_budget(&words(30), 300), 400);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(ReplyLength::for_words(3), ReplyLength::VeryBrief);
        assert_eq!(ReplyLength::for_words(4), ReplyLength::Short);
        assert_eq!(ReplyLength::for_words(8), ReplyLength::Short);
        assert_eq!(ReplyLength::for_words(9), ReplyLength::Moderate);
        assert_eq!(ReplyLength::for_words(20), ReplyLength::Moderate);
        assert_eq!(ReplyLength::for_words(21), ReplyLength::Medium);
        assert_eq!(ReplyLength::for_words(40), ReplyLength::Medium);
        assert_eq!(ReplyLength::for_words(41), ReplyLength::Long);
    }

    #[test]
    fn test_word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  hey   there \n you "), 3);
        assert_eq!(word_count("   "), 0);
    }
}
