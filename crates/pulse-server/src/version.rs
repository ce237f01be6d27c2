// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Pulse.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Version string comparison
//!
//! Clients report free-form dotted versions, so this comparison is total and
//! never fails: a component that does not start with a digit counts as 0, a
//! missing component counts as 0, and anything past the third component is
//! ignored.

/// Returns true if `candidate` is strictly newer than `current`.
///
/// Both sides accept an optional leading `v`/`V`. Exact ties are "not newer".
pub fn is_newer(current: &str, candidate: &str) -> bool {
    let current = parse_components(current);
    let candidate = parse_components(candidate);

    for (cur, cand) in current.iter().zip(candidate.iter()) {
        if cand > cur {
            return true;
        }
        if cand < cur {
            return false;
        }
    }

    false
}

/// Splits a dotted version string into its first three numeric components,
/// padding missing components with 0.
fn parse_components(s: &str) -> [u64; 3] {
    let s = s.trim_start_matches('v').trim_start_matches('V');
    let mut out = [0_u64; 3];
    for (i, part) in s.split('.').take(3).enumerate() {
        out[i] = leading_number(part);
    }
    out
}

/// Scans leading ASCII digits only; a non-digit terminates the scan, so
/// "3rc1" parses as 3 and "beta" as 0.
fn leading_number(part: &str) -> u64 {
    let mut num = 0_u64;
    for c in part.chars() {
        match c.to_digit(10) {
            Some(d) => num = num.saturating_mul(10).saturating_add(u64::from(d)),
            None => break,
        }
    }
    num
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_newer_basic() {
        // Newer major / minor / patch
        assert!(is_newer("1.0.0", "2.0.0"));
        assert!(is_newer("1.1.0", "1.2.0"));
        assert!(is_newer("1.1.1", "1.1.2"));
        // Older
        assert!(!is_newer("2.0.0", "1.0.0"));
        assert!(!is_newer("1.2.0", "1.1.0"));
        assert!(!is_newer("1.1.2", "1.1.1"));
    }

    #[test]
    fn test_is_newer_tie_is_not_newer() {
        assert!(!is_newer("1.0.0", "1.0.0"));
        assert!(!is_newer("0.2.38", "0.2.38"));
        assert!(!is_newer("v1.0.0", "1.0.0"));
    }

    #[test]
    fn test_v_prefix_on_either_side() {
        assert!(is_newer("v1.0.0", "v1.0.1"));
        assert!(is_newer("1.0.0", "v1.0.1"));
        assert!(is_newer("v1.0.0", "1.0.1"));
        assert!(is_newer("V1.0.0", "1.0.1"));
    }

    #[test]
    fn test_missing_components_pad_with_zero() {
        assert!(is_newer("1.0", "1.0.1"));
        assert!(!is_newer("1.0.1", "1.0"));
        assert!(!is_newer("1", "1.0.0"));
    }

    #[test]
    fn test_fourth_component_ignored() {
        assert!(!is_newer("1.0.0.1", "1.0.0"));
        assert!(!is_newer("1.0.0", "1.0.0.1"));
        assert!(is_newer("1.0.0.9", "1.0.1"));
    }

    #[test]
    fn test_unparseable_degrades_to_zero() {
        assert!(!is_newer("1.0.0", "garbage"));
        assert!(is_newer("garbage", "0.0.1"));
        // Digit scan stops at the first non-digit
        assert!(is_newer("1.0.2", "1.0.3rc1"));
        assert!(!is_newer("1.0.3", "1.0.3rc1"));
    }

    #[test]
    fn test_large_components_do_not_overflow() {
        assert!(is_newer("1.0.0", "99999999999999999999999.0.0"));
    }
}
