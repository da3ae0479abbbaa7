//! Turns loosely typed vote input into an up/down flag.
//!
//! A short, closed list of values means "down". Anything else, including
//! words that are not recognized at all, counts as an up vote.

/// Words that mean a down vote. Matched case-sensitively.
const DOWN_WORDS: [&str; 8] = ["down", "downvote", "dislike", "disliked", "negative", "no", "bad", "false"];

/// A vote as a caller expresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteExpression {
    Flag(bool),
    Number(i64),
    Word(String),
}

impl VoteExpression {
    /// `true` for an up vote, `false` for a down vote.
    pub fn meaning(&self) -> bool {
        match self {
            VoteExpression::Flag(flag) => *flag,
            VoteExpression::Number(number) => *number != 0,
            VoteExpression::Word(word) => !DOWN_WORDS.contains(&word.as_str()),
        }
    }
}

impl Default for VoteExpression {
    fn default() -> Self {
        VoteExpression::Flag(true)
    }
}

impl From<bool> for VoteExpression {
    fn from(flag: bool) -> Self {
        VoteExpression::Flag(flag)
    }
}

impl From<i64> for VoteExpression {
    fn from(number: i64) -> Self {
        VoteExpression::Number(number)
    }
}

impl From<i32> for VoteExpression {
    fn from(number: i32) -> Self {
        VoteExpression::Number(i64::from(number))
    }
}

impl From<&str> for VoteExpression {
    fn from(word: &str) -> Self {
        VoteExpression::Word(word.to_owned())
    }
}

impl From<String> for VoteExpression {
    fn from(word: String) -> Self {
        VoteExpression::Word(word)
    }
}

pub fn meaning_of(vote: impl Into<VoteExpression>) -> bool {
    vote.into().meaning()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_words_mean_false() {
        for word in DOWN_WORDS {
            assert!(!meaning_of(word), "{word} should be a down vote");
        }
        assert!(!meaning_of(false));
        assert!(!meaning_of(0));
    }

    #[test]
    fn test_everything_else_means_true() {
        assert!(meaning_of(true));
        assert!(meaning_of(1));
        assert!(meaning_of(-1));
        assert!(meaning_of("yes"));
        assert!(meaning_of("good"));
        assert!(meaning_of("xyzzy"));
        assert!(meaning_of(""));
    }

    #[test]
    fn test_words_are_case_sensitive_and_zero_string_is_a_word() {
        assert!(meaning_of("Bad"));
        assert!(meaning_of("DOWN"));
        assert!(meaning_of("0"));
    }

    #[test]
    fn test_default_expression_is_an_up_vote() {
        assert!(VoteExpression::default().meaning());
    }
}
