//! Sentiment scoring for submitted text.
//!
//! This module scores short snippets of text with a rule-based, lexicon-driven
//! analyzer in the style of VADER:
//!
//! - **Lexicon valences**: each known word or emoticon carries a signed
//!   intensity in `[-4, 4]`.
//!
//! - **Modifiers**: booster words, negations, a contrastive "but", ALL-CAPS
//!   emphasis, and trailing `!`/`?` adjust those valences.
//!
//! - **Classification**: the normalized `compound` score is bucketed into
//!   positive, neutral, or negative using configurable thresholds.
//!
//! # Example
//!
//! ```
//! use tweetsense::sentiment::{LexiconAnalyzer, Sentiment, SentimentAnalyzer, Thresholds};
//!
//! let analyzer = LexiconAnalyzer::new();
//! let analysis = analyzer.analyze("I love this project!", &Thresholds::default());
//!
//! assert_eq!(analysis.sentiment, Sentiment::Positive);
//! assert!(analysis.scores.compound > 0.5);
//! ```

mod analyzer;
mod lexicon;

use serde::{Deserialize, Serialize};

pub use analyzer::LexiconAnalyzer;
pub use lexicon::Lexicon;

/// Polarity scores for a piece of text.
///
/// `neg`, `neu`, and `pos` are the proportions of the text that fall in each
/// category; `compound` is the normalized overall polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    /// Proportion of negative sentiment, in `[0, 1]`.
    pub neg: f64,
    /// Proportion of neutral sentiment, in `[0, 1]`.
    pub neu: f64,
    /// Proportion of positive sentiment, in `[0, 1]`.
    pub pos: f64,
    /// Normalized overall polarity, in `[-1, 1]`.
    pub compound: f64,
}

/// The label assigned to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Compound score at or above the positive threshold.
    Positive,
    /// Compound score strictly between the thresholds.
    Neutral,
    /// Compound score at or below the negative threshold.
    Negative,
}

impl Sentiment {
    /// Classify a compound score against the given thresholds.
    #[must_use]
    pub fn classify(compound: f64, thresholds: &Thresholds) -> Self {
        if compound >= thresholds.positive {
            Self::Positive
        } else if compound <= thresholds.negative {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// The lowercase name stored in the database and sent over the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(crate::Error::invalid_input(format!(
                "unknown sentiment label: {other}"
            ))),
        }
    }
}

/// Compound-score cut-offs used by [`Sentiment::classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Scores at or above this are positive.
    pub positive: f64,
    /// Scores at or below this are negative.
    pub negative: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            positive: 0.05,
            negative: -0.05,
        }
    }
}

/// The scores and label produced for one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Analysis {
    /// The assigned label.
    pub sentiment: Sentiment,
    /// The raw polarity scores.
    pub scores: PolarityScores,
}

/// A sentiment scorer.
///
/// The server holds one of these behind an `Arc<dyn SentimentAnalyzer>`, so
/// any implementation can be swapped in without touching the routes.
pub trait SentimentAnalyzer: Send + Sync {
    /// Compute polarity scores for the given text.
    fn polarity_scores(&self, text: &str) -> PolarityScores;

    /// Score the text and classify it.
    fn analyze(&self, text: &str, thresholds: &Thresholds) -> Analysis {
        let scores = self.polarity_scores(text);
        Analysis {
            sentiment: Sentiment::classify(scores.compound, thresholds),
            scores,
        }
    }
}
