//! The built-in lexicon analyzer.

use tracing::trace;

use super::lexicon::{Lexicon, CAPS_INCREMENT, NEGATION_SCALAR};
use super::{PolarityScores, SentimentAnalyzer};

/// Normalization constant for the compound score.
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Emphasis added per exclamation mark.
const EXCLAMATION_INCREMENT: f64 = 0.292;

/// Maximum number of exclamation marks that add emphasis.
const MAX_EXCLAMATIONS: usize = 4;

/// Emphasis added per question mark (when there is more than one).
const QUESTION_INCREMENT: f64 = 0.18;

/// Cap on question-mark emphasis.
const MAX_QUESTION_EMPHASIS: f64 = 0.96;

/// How far back modifiers (boosters, negations) reach.
const MODIFIER_WINDOW: usize = 3;

/// Dampening of a booster by distance from the word it modifies.
const BOOSTER_DISTANCE_FACTORS: [f64; MODIFIER_WINDOW] = [1.0, 0.95, 0.9];

/// Rule-based analyzer over a [`Lexicon`].
#[derive(Debug, Clone, Default)]
pub struct LexiconAnalyzer {
    lexicon: Lexicon,
}

impl LexiconAnalyzer {
    /// Create an analyzer over the built-in lexicon.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lexicon(Lexicon::builtin())
    }

    /// Create an analyzer over a custom lexicon.
    #[must_use]
    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// The lexicon this analyzer scores against.
    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Split text into tokens.
    ///
    /// Leading and trailing ASCII punctuation is stripped unless that would
    /// leave two characters or fewer, which keeps emoticons like `:)` intact.
    /// Single-character tokens are dropped unless they are in the lexicon.
    fn tokenize<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split_whitespace()
            .filter_map(|raw| {
                let stripped = raw.trim_matches(|c: char| c.is_ascii_punctuation());
                let token = if stripped.chars().count() <= 2 {
                    raw
                } else {
                    stripped
                };
                let keep = token.chars().count() > 1
                    || self.lexicon.valence(&token.to_lowercase()).is_some();
                keep.then_some(token)
            })
            .collect()
    }

    /// Score the token at `index`, applying caps, booster, and negation rules.
    fn token_valence(
        &self,
        tokens: &[&str],
        lowered: &[String],
        index: usize,
        caps_diff: bool,
    ) -> f64 {
        let token = lowered[index].as_str();

        // Boosters carry no valence of their own.
        if self.lexicon.booster(token).is_some() {
            return 0.0;
        }
        let Some(mut valence) = self.lexicon.valence(token) else {
            return 0.0;
        };

        if caps_diff && is_all_caps(tokens[index]) {
            valence += CAPS_INCREMENT.copysign(valence);
        }

        for distance in 0..MODIFIER_WINDOW {
            let Some(prev) = index.checked_sub(distance + 1) else {
                break;
            };
            let prev_token = lowered[prev].as_str();

            if self.lexicon.valence(prev_token).is_none() {
                if let Some(mut scalar) = self.lexicon.booster(prev_token) {
                    if valence < 0.0 {
                        scalar = -scalar;
                    }
                    if caps_diff && is_all_caps(tokens[prev]) {
                        scalar += CAPS_INCREMENT.copysign(valence);
                    }
                    valence += scalar * BOOSTER_DISTANCE_FACTORS[distance];
                }
            }

            if self.lexicon.is_negation(prev_token) {
                valence *= NEGATION_SCALAR;
            }
        }

        valence
    }
}

impl SentimentAnalyzer for LexiconAnalyzer {
    fn polarity_scores(&self, text: &str) -> PolarityScores {
        let tokens = self.tokenize(text);
        if tokens.is_empty() {
            return PolarityScores::default();
        }

        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let caps_diff = has_caps_differential(&tokens);

        let mut valences: Vec<f64> = (0..tokens.len())
            .map(|i| self.token_valence(&tokens, &lowered, i, caps_diff))
            .collect();

        apply_but_rule(&lowered, &mut valences);

        let emphasis = punctuation_emphasis(text);
        let mut sum: f64 = valences.iter().sum();
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }

        let scores = sift(&valences, emphasis, normalize(sum));
        trace!(tokens = tokens.len(), compound = scores.compound, "Scored text");
        scores
    }
}

/// A token is all caps if it has uppercase letters and no lowercase ones.
fn is_all_caps(token: &str) -> bool {
    token.chars().any(char::is_uppercase) && !token.chars().any(char::is_lowercase)
}

/// True when some, but not all, tokens are ALL CAPS.
fn has_caps_differential(tokens: &[&str]) -> bool {
    let caps = tokens.iter().filter(|t| is_all_caps(t)).count();
    caps > 0 && caps < tokens.len()
}

/// Halve valences before the first "but" and amplify those after it.
fn apply_but_rule(lowered: &[String], valences: &mut [f64]) {
    let Some(pivot) = lowered.iter().position(|t| t == "but") else {
        return;
    };
    for (i, valence) in valences.iter_mut().enumerate() {
        if i < pivot {
            *valence *= 0.5;
        } else if i > pivot {
            *valence *= 1.5;
        }
    }
}

/// Emphasis contributed by exclamation and question marks.
fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();

    #[allow(clippy::cast_precision_loss)]
    let mut emphasis = exclamations as f64 * EXCLAMATION_INCREMENT;
    if questions > 1 {
        #[allow(clippy::cast_precision_loss)]
        let q = (questions as f64 * QUESTION_INCREMENT).min(MAX_QUESTION_EMPHASIS);
        emphasis += q;
    }
    emphasis
}

/// Map an unbounded valence sum into `[-1, 1]`.
fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Split valences into positive, negative, and neutral proportions.
fn sift(valences: &[f64], emphasis: f64, compound: f64) -> PolarityScores {
    let mut pos_sum = 0.0;
    let mut neg_sum = 0.0;
    let mut neu_count = 0.0;

    for &valence in valences {
        if valence > 0.0 {
            pos_sum += valence + 1.0;
        } else if valence < 0.0 {
            neg_sum += valence - 1.0;
        } else {
            neu_count += 1.0;
        }
    }

    if pos_sum > f64::abs(neg_sum) {
        pos_sum += emphasis;
    } else if pos_sum < f64::abs(neg_sum) {
        neg_sum -= emphasis;
    }

    let total = pos_sum + f64::abs(neg_sum) + neu_count;
    if total == 0.0 {
        return PolarityScores::default();
    }

    PolarityScores {
        neg: round_to(f64::abs(neg_sum / total), 3),
        neu: round_to(f64::abs(neu_count / total), 3),
        pos: round_to(f64::abs(pos_sum / total), 3),
        compound: round_to(compound, 4),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
