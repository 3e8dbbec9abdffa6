//! Sentiment lexicon and modifier word lists.
//!
//! Valences follow the VADER convention: mean human ratings on a scale from
//! -4 (extremely negative) to +4 (extremely positive). Lexicon files use the
//! VADER layout, one `token<TAB>valence` entry per line with any further
//! tab-separated columns ignored, so `vader_lexicon.txt` loads unchanged.
//!
//! Lookups fall back to simple base forms, so `loving` finds `love` and
//! `winning` finds `win` when the inflection has no entry of its own.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// The built-in word list, in lexicon file format.
const BUILTIN_LEXICON: &str = include_str!("../../assets/lexicon.tsv");

/// Inflectional suffixes tried when a token has no entry, longest first.
/// Each pairs the suffix with the text that replaces it.
const SUFFIXES: &[(&str, &str)] = &[
    ("iest", "y"),
    ("ier", "y"),
    ("ies", "y"),
    ("ied", "y"),
    ("ing", ""),
    ("est", ""),
    ("ed", ""),
    ("er", ""),
    ("es", ""),
    ("s", ""),
];

/// Shortest stem an inflection may reduce to.
const MIN_STEM_LEN: usize = 3;

/// Scalar added by an intensifying booster word.
pub(super) const BOOST_INCREMENT: f64 = 0.293;

/// Scalar added by a dampening booster word.
pub(super) const BOOST_DECREMENT: f64 = -0.293;

/// Extra intensity for an ALL-CAPS word in mixed-case text.
pub(super) const CAPS_INCREMENT: f64 = 0.733;

/// Multiplier applied to a negated valence.
pub(super) const NEGATION_SCALAR: f64 = -0.74;

/// Words that flip the polarity of what follows.
const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neednt", "neither", "never", "none", "nope",
    "nor", "not", "nothing", "nowhere", "oughtnt", "shant", "shouldnt", "uhuh", "wasnt", "werent",
    "without", "wont", "wouldnt", "rarely", "seldom", "despite",
];

/// Words that intensify what follows.
const BOOSTERS_UP: &[&str] = &[
    "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly", "deeply",
    "enormously", "entirely", "especially", "exceptionally", "extremely", "fabulously", "fully",
    "greatly", "hella", "highly", "hugely", "incredibly", "intensely", "majorly", "more", "most",
    "particularly", "purely", "quite", "really", "remarkably", "so", "substantially",
    "thoroughly", "totally", "tremendously", "uber", "unbelievably", "unusually", "utterly",
    "very",
];

/// Words that dampen what follows.
const BOOSTERS_DOWN: &[&str] = &[
    "almost", "barely", "hardly", "kinda", "kindof", "less", "little", "marginally",
    "occasionally", "partly", "scarcely", "slightly", "somewhat", "sorta", "sortof",
];

/// A word-valence table plus the modifier word sets.
#[derive(Debug, Clone)]
pub struct Lexicon {
    valences: HashMap<String, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl Lexicon {
    /// Build the built-in lexicon.
    #[must_use]
    pub fn builtin() -> Self {
        let valences = BUILTIN_LEXICON
            .lines()
            .filter_map(|line| parse_line(line)?.ok())
            .map(|(word, valence)| (word.to_string(), valence))
            .collect();

        let boosters = BOOSTERS_UP
            .iter()
            .map(|w| (*w, BOOST_INCREMENT))
            .chain(BOOSTERS_DOWN.iter().map(|w| (*w, BOOST_DECREMENT)))
            .collect();

        Self { valences, boosters }
    }

    /// Build the built-in lexicon with extra or replacement entries.
    ///
    /// Override keys are lowercased before insertion.
    #[must_use]
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        let mut lexicon = Self::builtin();
        lexicon.merge(overrides);
        lexicon
    }

    /// Add or replace entries. Keys are lowercased before insertion.
    pub fn merge<'a>(&mut self, entries: impl IntoIterator<Item = (&'a String, &'a f64)>) {
        for (word, valence) in entries {
            self.valences.insert(word.to_lowercase(), *valence);
        }
    }

    /// Merge the entries of a lexicon file over this lexicon.
    ///
    /// Returns the number of entries read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a line is malformed, or a
    /// valence lies outside `[-4, 4]`.
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let lexicon_error = |message: String| Error::LexiconLoad {
            path: path.to_path_buf(),
            message,
        };

        let source = std::fs::read_to_string(path).map_err(|e| lexicon_error(e.to_string()))?;

        let mut count = 0;
        for (number, line) in source.lines().enumerate() {
            let Some(entry) = parse_line(line) else {
                continue;
            };
            let (word, valence) =
                entry.map_err(|message| lexicon_error(format!("line {}: {message}", number + 1)))?;
            self.valences.insert(word.to_lowercase(), valence);
            count += 1;
        }
        Ok(count)
    }

    /// Look up the valence of a lowercase token.
    ///
    /// Tokens without an entry of their own are looked up by base form.
    #[must_use]
    pub fn valence(&self, token: &str) -> Option<f64> {
        self.valences
            .get(token)
            .copied()
            .or_else(|| base_forms(token).find_map(|base| self.valences.get(&base).copied()))
    }

    /// Look up the booster scalar of a lowercase token.
    #[must_use]
    pub fn booster(&self, token: &str) -> Option<f64> {
        self.boosters.get(token).copied()
    }

    /// Check if a lowercase token negates what follows.
    ///
    /// Any contraction ending in `n't` counts as a negation.
    #[must_use]
    pub fn is_negation(&self, token: &str) -> bool {
        NEGATIONS.contains(&token) || token.ends_with("n't")
    }

    /// Number of valence entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.valences.len()
    }

    /// Check if the valence table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parse one lexicon line. Blank lines yield `None`.
fn parse_line(line: &str) -> Option<std::result::Result<(&str, f64), String>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let mut fields = line.split('\t');
    let word = fields.next().unwrap_or_default().trim();
    let Some(raw) = fields.next() else {
        return Some(Err(format!("missing valence for '{word}'")));
    };
    if word.is_empty() {
        return Some(Err("empty token".to_string()));
    }

    let parsed = match raw.trim().parse::<f64>() {
        Ok(valence) if (-4.0..=4.0).contains(&valence) => Ok((word, valence)),
        Ok(valence) => Err(format!("valence {valence} for '{word}' outside [-4, 4]")),
        Err(e) => Err(format!("invalid valence '{raw}' for '{word}': {e}")),
    };
    Some(parsed)
}

/// Candidate base forms of an inflected token, most likely first.
fn base_forms(token: &str) -> impl Iterator<Item = String> + '_ {
    SUFFIXES
        .iter()
        .filter(move |(suffix, _)| !(*suffix == "s" && token.ends_with("ss")))
        .filter_map(move |(suffix, replacement)| {
            let stem = token.strip_suffix(suffix)?;
            (stem.chars().count() >= MIN_STEM_LEN).then_some((stem, *replacement))
        })
        .flat_map(|(stem, replacement)| {
            let mut forms = vec![format!("{stem}{replacement}")];
            if replacement.is_empty() {
                forms.push(format!("{stem}e"));
                if let Some(undoubled) = undouble(stem) {
                    forms.push(undoubled.to_string());
                }
            }
            forms
        })
}

/// Drop a doubled final consonant (`winn` -> `win`).
fn undouble(stem: &str) -> Option<&str> {
    let mut rev = stem.chars().rev();
    let last = rev.next()?;
    let before = rev.next()?;
    (last == before && last.is_ascii_alphabetic() && !"aeiou".contains(last))
        .then(|| &stem[..stem.len() - last.len_utf8()])
}
