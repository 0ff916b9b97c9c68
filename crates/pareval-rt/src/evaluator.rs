//! Scoring collaborators.
//!
//! The runner only needs `score(record) -> (value, label)`. [`LexiconEvaluator`]
//! is a small stand-in for a real sentiment model: it reports the negative
//! share of a text's sentiment mass, in `[0, 1]`.

use crate::dataset::Record;

/// Result of scoring one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score<'r> {
    pub value: f32,
    /// Ground-truth label of the scored record.
    pub label: &'r str,
}

/// A pure scoring function, safe to call concurrently on disjoint records.
pub trait Evaluator: Send + Sync {
    fn score<'r>(&self, record: &'r Record) -> Score<'r>;
}

/// Scores every record with the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEvaluator(pub f32);

impl Evaluator for ConstantEvaluator {
    fn score<'r>(&self, record: &'r Record) -> Score<'r> {
        Score {
            value: self.0,
            label: &record.label,
        }
    }
}

/// Adapts a closure over the record into an [`Evaluator`].
#[derive(Debug, Clone, Copy)]
pub struct ScoreFn<F>(pub F);

impl<F> Evaluator for ScoreFn<F>
where
    F: Fn(&Record) -> f32 + Send + Sync,
{
    fn score<'r>(&self, record: &'r Record) -> Score<'r> {
        Score {
            value: (self.0)(record),
            label: &record.label,
        }
    }
}

/// Word valences, sorted by word for binary search.
const LEXICON: &[(&str, f32)] = &[
    ("angry", -2.3),
    ("annoyed", -1.6),
    ("awesome", 3.1),
    ("awful", -2.0),
    ("bad", -2.5),
    ("best", 3.2),
    ("boring", -1.3),
    ("broken", -1.9),
    ("cry", -2.1),
    ("disappointed", -1.9),
    ("excited", 2.2),
    ("fail", -2.5),
    ("fun", 2.3),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("hurt", -2.4),
    ("lonely", -2.0),
    ("love", 3.2),
    ("miss", -1.3),
    ("nice", 1.8),
    ("pain", -2.3),
    ("sad", -2.1),
    ("sick", -1.7),
    ("sorry", -0.3),
    ("stupid", -2.4),
    ("terrible", -2.1),
    ("thanks", 1.9),
    ("tired", -1.9),
    ("ugly", -2.3),
    ("upset", -1.6),
    ("wonderful", 2.7),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wow", 2.8),
];

/// Words that flip the polarity of the following sentiment word.
const NEGATIONS: &[&str] = &["cannot", "didn't", "don't", "isn't", "never", "no", "not", "wasn't"];

/// Damping applied to a negated valence.
const NEGATION_SCALAR: f32 = -0.74;

/// Rule-based negative-sentiment scorer over a built-in lexicon.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconEvaluator;

impl LexiconEvaluator {
    fn valence(word: &str) -> Option<f32> {
        LEXICON
            .binary_search_by(|(w, _)| (*w).cmp(word))
            .ok()
            .map(|i| LEXICON[i].1)
    }

    /// Negative share of the sentiment mass of `text`.
    pub fn negative_score(text: &str) -> f32 {
        let lowered = text.to_lowercase();
        let mut positive = 0.0f32;
        let mut negative = 0.0f32;
        let mut neutral = 0usize;
        let mut negated = false;

        for word in lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
        {
            match Self::valence(word) {
                Some(mut valence) => {
                    if negated {
                        valence *= NEGATION_SCALAR;
                    }
                    if valence > 0.0 {
                        positive += valence + 1.0;
                    } else {
                        negative += valence - 1.0;
                    }
                    negated = false;
                }
                None => {
                    neutral += 1;
                    negated = NEGATIONS.contains(&word);
                }
            }
        }

        let total = positive + negative.abs() + neutral as f32;
        if total == 0.0 {
            0.0
        } else {
            negative.abs() / total
        }
    }
}

impl Evaluator for LexiconEvaluator {
    fn score<'r>(&self, record: &'r Record) -> Score<'r> {
        Score {
            value: Self::negative_score(&record.text),
            label: &record.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicon_is_sorted() {
        assert!(LEXICON.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_negative_text_scores_higher() {
        let sad = LexiconEvaluator::negative_score("What a terrible, awful day. I hate it");
        let happy = LexiconEvaluator::negative_score("What a great day, I love it!");
        assert!(sad > 0.5, "{}", sad);
        assert_eq!(happy, 0.0);
    }

    #[test]
    fn test_scores_in_unit_interval() {
        for text in ["", "...", "bad", "not bad", "sad sad sad", "good and bad and ugly"] {
            let score = LexiconEvaluator::negative_score(text);
            assert!((0.0..=1.0).contains(&score), "{} -> {}", text, score);
        }
    }

    #[test]
    fn test_negation_flips_polarity() {
        assert!(LexiconEvaluator::negative_score("bad") > 0.0);
        assert_eq!(LexiconEvaluator::negative_score("not bad"), 0.0);
        assert!(LexiconEvaluator::negative_score("not good") > 0.0);
    }

    #[test]
    fn test_score_carries_record_label() {
        let record = Record::new("0", "awful");
        let score = LexiconEvaluator.score(&record);
        assert_eq!(score.label, "0");
        assert_eq!(ConstantEvaluator(0.5).score(&record).value, 0.5);
        assert_eq!(ScoreFn(|r: &Record| r.text.len() as f32).score(&record).value, 5.0);
    }
}
