// src/algorithms/severity.rs

//! Weak-supervision labels for incident descriptions that arrive without one.

pub const CRITICAL: &str = "critical";
pub const MAJOR: &str = "major";
pub const MINOR: &str = "minor";

const CRITICAL_TERMS: [&str; 4] = ["hospital", "dizziness", "fire", "chemical"];
const MAJOR_TERMS: [&str; 2] = ["cut", "hit"];

/// Severity label derived from keywords in the description plus the injury
/// and witness fields. Matching is plain substring search on the lower-cased text.
pub fn heuristic_label(description: &str, injured: bool, witness_count: u32) -> &'static str {
    let desc = description.to_lowercase();
    if injured || CRITICAL_TERMS.iter().any(|t| desc.contains(t)) {
        return CRITICAL;
    }
    if witness_count >= 3 || MAJOR_TERMS.iter().any(|t| desc.contains(t)) {
        return MAJOR;
    }
    MINOR
}
