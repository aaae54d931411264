//! Compatibility scoring engine.
//!
//! Pure functions over two public profiles: no I/O, no mutable state.
//! Hard filters (gender preference, budget overlap) reject a pair
//! outright; everything else contributes to a weighted similarity in
//! `[0, 1]` plus a short list of human-readable reasons.

#![deny(unsafe_code)]

use std::collections::HashSet;

use messmate_types::{gender_allows, PublicProfile, UserId};
use serde::{Deserialize, Serialize};

/// Fixed term weights. The final score divides by their sum, so the
/// table is the single source of truth for both.
const W_BUDGET: f64 = 3.0;
const W_CLEAN: f64 = 2.0;
const W_NOISE: f64 = 2.0;
const W_SLEEP: f64 = 1.0;
const W_SMOKE: f64 = 2.0;
const W_DRINK: f64 = 1.0;
const W_GUESTS: f64 = 1.0;
const W_STUDY: f64 = 1.0;
const W_LANG: f64 = 1.0;

const WEIGHT_TOTAL: f64 =
    W_BUDGET + W_CLEAN + W_NOISE + W_SLEEP + W_SMOKE + W_DRINK + W_GUESTS + W_STUDY + W_LANG;

/// Reasons shown alongside a score are capped to this many.
const MAX_REASONS: usize = 3;

/// A non-rejected pairing: score in `[0, 1]` plus display reasons.
/// The reasons are explanatory only; the numeric contract lives in
/// [`score_pair`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub value: f64,
    pub reasons: Vec<String>,
}

/// A scored candidate, as produced by [`rank`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedMatch {
    pub uid: UserId,
    pub value: f64,
    pub reasons: Vec<String>,
}

/// Case-insensitive Jaccard similarity of two language sets. Empty
/// union counts as zero overlap, not an error.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<String> = a.iter().map(|s| s.to_lowercase()).collect();
    let b: HashSet<String> = b.iter().map(|s| s.to_lowercase()).collect();
    let inter = a.intersection(&b).count();
    let union = a.union(&b).count().max(1);
    inter as f64 / union as f64
}

/// Linear similarity of two 1–5 ordinals: `1 - |a-b|/4`.
fn ordinal_similarity(a: u8, b: u8) -> f64 {
    1.0 - ((a as f64 - b as f64).abs() / 4.0).min(1.0)
}

/// Width of the budget overlap in minor units; zero or negative means
/// the ranges do not meet.
fn budget_overlap(a: &PublicProfile, b: &PublicProfile) -> i64 {
    let lo = a.budget_min.max(b.budget_min);
    let hi = a.budget_max.min(b.budget_max);
    hi - lo
}

/// Overlap width relative to the wider of the two spans, clamped to
/// `[0, 1]`.
fn budget_similarity(a: &PublicProfile, b: &PublicProfile) -> f64 {
    let overlap = budget_overlap(a, b).max(0);
    let span = (a.budget_max - a.budget_min)
        .max(b.budget_max - b.budget_min)
        .max(1);
    (overlap as f64 / span as f64).min(1.0)
}

/// Score a candidate against the caller. Returns `None` when a hard
/// filter rejects the pair: either side's concrete gender preference
/// is violated, or the budget ranges have no strictly positive overlap.
pub fn score_pair(me: &PublicProfile, other: &PublicProfile) -> Option<MatchScore> {
    if !gender_allows(me.roommate_gender_preference, other.gender) {
        return None;
    }
    if !gender_allows(other.roommate_gender_preference, me.gender) {
        return None;
    }
    if budget_overlap(me, other) <= 0 {
        return None;
    }

    let budget = budget_similarity(me, other);
    let languages = jaccard(&me.languages, &other.languages);

    let weighted = W_BUDGET * budget
        + W_CLEAN * ordinal_similarity(me.cleanliness, other.cleanliness)
        + W_NOISE * ordinal_similarity(me.noise_tolerance, other.noise_tolerance)
        + W_SLEEP * if me.sleep_schedule == other.sleep_schedule { 1.0 } else { 0.5 }
        + W_SMOKE * if me.smoker == other.smoker { 1.0 } else { 0.0 }
        + W_DRINK * if me.drinker == other.drinker { 1.0 } else { 0.0 }
        + W_GUESTS * ordinal_similarity(me.guests_tolerance, other.guests_tolerance)
        + W_STUDY * if me.study_habits == other.study_habits { 1.0 } else { 0.5 }
        + W_LANG * languages;

    let mut reasons = Vec::new();
    if budget > 0.7 {
        reasons.push("Strong budget overlap".to_string());
    }
    if me.cleanliness == other.cleanliness {
        reasons.push("Same cleanliness".to_string());
    }
    if me.sleep_schedule == other.sleep_schedule {
        reasons.push("Similar sleep schedule".to_string());
    }
    if me.smoker == other.smoker {
        reasons.push("Smoking preference matched".to_string());
    }
    if languages > 0.0 {
        reasons.push("Common language(s)".to_string());
    }
    reasons.truncate(MAX_REASONS);

    Some(MatchScore {
        value: weighted / WEIGHT_TOTAL,
        reasons,
    })
}

/// Score candidates against the caller and return the top `limit`,
/// sorted descending. The sort is stable: candidates with equal scores
/// keep their input order. `limit` is caller policy (12 for the
/// matches view, 6 for profile suggestions).
pub fn rank<I>(me: &PublicProfile, candidates: I, limit: usize) -> Vec<RankedMatch>
where
    I: IntoIterator<Item = (UserId, PublicProfile)>,
{
    let mut scored: Vec<RankedMatch> = candidates
        .into_iter()
        .filter_map(|(uid, profile)| {
            score_pair(me, &profile).map(|s| RankedMatch {
                uid,
                value: s.value,
                reasons: s.reasons,
            })
        })
        .collect();
    scored.sort_by(|a, b| b.value.total_cmp(&a.value));
    scored.truncate(limit);
    scored
}
