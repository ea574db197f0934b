//! Bilingual answer matching.

use crate::quiz::{aliases::AliasTable, normalize::normalize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub input_key: String,
    pub answer_key: String,
    pub correct: bool,
}

/// Evaluates guesses against canonical answers.
///
/// Lenient on purpose: a guess is accepted when any of the normalized,
/// alias-translated or reverse-translated forms line up.
#[derive(Debug, Default, Clone)]
pub struct AnswerMatcher {
    aliases: AliasTable,
}

impl AnswerMatcher {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn is_correct(&self, input: &str, answer: &str) -> bool {
        self.evaluate(input, answer).correct
    }

    pub fn evaluate(&self, input: &str, answer: &str) -> MatchReport {
        let input_key = normalize(input);
        let answer_key = normalize(answer);

        let correct = !input_key.is_empty() && self.keys_match(&input_key, &answer_key);

        MatchReport {
            input_key,
            answer_key,
            correct,
        }
    }

    fn keys_match(&self, input: &str, answer: &str) -> bool {
        let input_mapped = self.aliases.translate(input);
        let answer_mapped = self.aliases.translate(answer);
        let input_reversed = self.aliases.reverse(input);

        input == answer
            || input_mapped == answer_mapped
            || input_reversed == answer
            || input_mapped == answer
    }
}
