//! Fuzzy item search.
//!
//! Scoring is a partial ratio: the shorter string is slid across the
//! longer one, running off either end, every window is compared with an
//! indel-normalized similarity (`2 * LCS / total_len`), and the best
//! window is the score. A query that appears verbatim inside an item
//! name therefore scores 100 no matter how long the name is.

use crate::record::Record;

/// Minimum score (inclusive) for a row to be returned.
pub const MATCH_THRESHOLD: u8 = 70;

/// A row that scored at or above [`MATCH_THRESHOLD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub record: &'a Record,
    pub score: u8,
}

/// Score every row's `Item` against `query` and return the hits, best
/// first. Equal scores keep sheet order.
///
/// Callers reject blank queries; a blank query here scores 0 everywhere.
pub fn search<'a>(records: &'a [Record], query: &str) -> Vec<Match<'a>> {
    let needle = query.trim().to_lowercase();

    let mut matches: Vec<Match<'a>> = records
        .iter()
        .filter_map(|record| {
            let haystack = record.item().trim().to_lowercase();
            let score = partial_ratio(&needle, &haystack);
            (score >= MATCH_THRESHOLD).then_some(Match { record, score })
        })
        .collect();

    // sort_by is stable: ties stay in sheet order
    matches.sort_by(|a, b| b.score.cmp(&a.score));

    log::debug!(
        "search {:?}: {} of {} rows matched",
        needle,
        matches.len(),
        records.len(),
    );
    matches
}

/// Best window similarity between `a` and `b`, 0..=100.
///
/// The shorter string is compared against every full-width window of the
/// longer one, and against the prefixes and suffixes of the longer one
/// that are narrower than it, so a query overlapping only the start or
/// end of a name still lines up. Equal lengths compare the whole strings.
///
/// Case-sensitive; lowercase both sides first for case-insensitive
/// matching. Either side empty scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let width = shorter.len();
    let len = longer.len();

    if width == len {
        return to_score(ratio(shorter, longer));
    }

    let prefixes = (1..width).map(|k| &longer[..k]);
    let full = (0..=len - width).map(|start| &longer[start..start + width]);
    let suffixes = (1..width).rev().map(|k| &longer[len - k..]);

    let mut best = 0.0f64;
    for window in prefixes.chain(full).chain(suffixes) {
        let r = ratio(shorter, window);
        if r > best {
            best = r;
            if best >= 1.0 {
                break;
            }
        }
    }

    to_score(best)
}

fn to_score(r: f64) -> u8 {
    (r * 100.0).round_ties_even() as u8
}

/// Indel similarity: 1.0 for identical sequences, 0.0 for disjoint ones.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
