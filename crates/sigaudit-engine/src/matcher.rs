//! Approximate name matching for inexact target names.
//!
//! Scores fall in three bands:
//!
//! | score  | meaning                                    |
//! |--------|--------------------------------------------|
//! | 100    | case-insensitive equality                  |
//! | 60..90 | one name contains the other                |
//! | 0..60  | token overlap or Jaro-Winkler similarity   |

use strsim::jaro_winkler;

/// Scores below this are never offered as a match.
pub const MIN_MATCH_SCORE: u8 = 30;

/// At or above this, the single best candidate wins outright.
pub const HIGH_CONFIDENCE_SCORE: u8 = 85;

pub const MAX_FUZZY_CANDIDATES: usize = 3;

const EXACT_SCORE: u8 = 100;
const CONTAINMENT_FLOOR: u8 = 60;
const CONTAINMENT_SPAN: f64 = 29.0;
const FUZZY_CEILING: u8 = CONTAINMENT_FLOOR - 1;
const SLO_KEYWORD_BONUS: u8 = 10;
const SLO_KEYWORDS: &[&str] = &["latency", "availability", "error", "fault"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Service,
    Operation,
    Slo,
}

/// Similarity of a user supplied `candidate` to an observed `actual` name.
pub fn similarity(candidate: &str, actual: &str, kind: NameKind) -> u8 {
    let a = candidate.trim().to_lowercase();
    let b = actual.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return EXACT_SCORE;
    }
    if a.contains(&b) || b.contains(&a) {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
        return CONTAINMENT_FLOOR + (ratio * CONTAINMENT_SPAN).round() as u8;
    }

    let mut score = token_score(&a, &b).max(edit_score(&a, &b));
    if kind == NameKind::Slo && shares_keyword(&a, &b) {
        score = score.saturating_add(SLO_KEYWORD_BONUS);
    }
    score.min(FUZZY_CEILING)
}

fn tokens(name: &str) -> Vec<&str> {
    let mut out: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn token_score(a: &str, b: &str) -> u8 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() || tb.is_empty() {
        return 0;
    }
    let shared = ta.iter().filter(|t| tb.contains(t)).count();
    let union = ta.len() + tb.len() - shared;
    (shared as f64 / union as f64 * FUZZY_CEILING as f64).round() as u8
}

// Jaro-Winkler sits around 0.5 for unrelated strings, so only the upper half
// of its range contributes.
fn edit_score(a: &str, b: &str) -> u8 {
    let jw = jaro_winkler(a, b);
    let scaled = ((jw - 0.5) / 0.5).clamp(0.0, 1.0);
    (scaled * FUZZY_CEILING as f64).round() as u8
}

fn shares_keyword(a: &str, b: &str) -> bool {
    SLO_KEYWORDS.iter().any(|k| a.contains(k) && b.contains(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch<'a, T> {
    pub candidate: &'a T,
    pub score: u8,
}

/// Rank `candidates` against `inexact`.
///
/// Keeps scores at or above [`MIN_MATCH_SCORE`], best first (ties keep input
/// order). A best score at or above [`HIGH_CONFIDENCE_SCORE`] returns that
/// candidate alone; otherwise up to [`MAX_FUZZY_CANDIDATES`] are returned.
pub fn best_matches<'a, T>(
    inexact: &str,
    candidates: &'a [T],
    name_of: impl Fn(&T) -> &str,
    kind: NameKind,
) -> Vec<FuzzyMatch<'a, T>> {
    let mut scored: Vec<FuzzyMatch<'a, T>> = candidates
        .iter()
        .map(|candidate| FuzzyMatch {
            candidate,
            score: similarity(inexact, name_of(candidate), kind),
        })
        .filter(|m| m.score >= MIN_MATCH_SCORE)
        .collect();
    scored.sort_by(|x, y| y.score.cmp(&x.score));

    let limit = match scored.first() {
        Some(best) if best.score >= HIGH_CONFIDENCE_SCORE => 1,
        _ => MAX_FUZZY_CANDIDATES,
    };
    scored.truncate(limit);
    scored
}
