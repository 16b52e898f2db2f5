use std::fmt;

use image::RgbImage;

use crate::classify::MarkSet;

/// Number of answer slots on the reference sheet.
pub const DEFAULT_ANSWER_SLOTS: usize = 90;

/// Reading of one answer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    /// No marked bubble in the row.
    Blank,
    /// Option letter of the selected column.
    Choice(char),
    /// A mark was found but its column falls outside the option range.
    Unresolved,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => Ok(()),
            Self::Choice(option) => write!(f, "{option}"),
            Self::Unresolved => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecodedSheet {
    /// One character per identity column: `0`-`9`, `K`, or `?`.
    pub identity: String,
    pub answers: Vec<Answer>,
    pub marks: MarkSet,
    /// Input copy with a box over every bubble. `None` when the image could
    /// not be read.
    pub annotated: Option<RgbImage>,
}

impl DecodedSheet {
    /// Neutral result for an unreadable image.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn answer_strings(&self) -> Vec<String> {
        self.answers.iter().map(Answer::to_string).collect()
    }

    /// Answers padded with blanks or truncated to `len` slots.
    pub fn padded_answers(&self, len: usize) -> Vec<Answer> {
        self.answers
            .iter()
            .copied()
            .chain(std::iter::repeat(Answer::Blank))
            .take(len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_render_as_contract_strings() {
        let sheet = DecodedSheet {
            answers: vec![Answer::Choice('C'), Answer::Blank, Answer::Unresolved],
            ..DecodedSheet::empty()
        };
        assert_eq!(sheet.answer_strings(), vec!["C", "", "?"]);
    }

    #[test]
    fn padding_and_truncation() {
        let sheet = DecodedSheet {
            answers: vec![Answer::Choice('A'), Answer::Choice('B')],
            ..DecodedSheet::empty()
        };
        let padded = sheet.padded_answers(DEFAULT_ANSWER_SLOTS);
        assert_eq!(padded.len(), DEFAULT_ANSWER_SLOTS);
        assert_eq!(padded[1], Answer::Choice('B'));
        assert!(padded[2..].iter().all(|it| *it == Answer::Blank));
        assert_eq!(sheet.padded_answers(1), vec![Answer::Choice('A')]);
    }
}
