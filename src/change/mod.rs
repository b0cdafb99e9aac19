// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Change detection: the policy that decides whether a freshly recomputed
//! value counts as "changed" for the purposes of update minimality and
//! glitch freedom (spec §4.2).

use std::fmt;

/// Whether a node's recompute produced a new observable value this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeResult {
    Changed,
    Unchanged,
}

impl ChangeResult {
    pub fn from_bool(changed: bool) -> Self {
        if changed {
            ChangeResult::Changed
        } else {
            ChangeResult::Unchanged
        }
    }

    pub fn is_changed(self) -> bool {
        matches!(self, ChangeResult::Changed)
    }
}

/// Compares a node's old and new value to decide whether propagation should
/// continue past it. The default implementation is structural `PartialEq`;
/// a domain configured with `EqualityPolicy::User` instead uses a
/// caller-supplied comparator (for types where `PartialEq` is either
/// unavailable or too strict, e.g. floating point with NaN, or a type whose
/// equality should be defined as "same identity" rather than "same bits").
pub trait Equality<T>: Send + Sync {
    fn eq(&self, old: &T, new: &T) -> bool;
}

/// The default comparator: structural equality via `PartialEq`.
pub struct StructuralEquality;

impl<T: PartialEq> Equality<T> for StructuralEquality {
    fn eq(&self, old: &T, new: &T) -> bool {
        old == new
    }
}

/// Wraps a user-supplied closure as an [`Equality`] implementation.
pub struct FnEquality<F>(pub F);

impl<T, F> Equality<T> for FnEquality<F>
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn eq(&self, old: &T, new: &T) -> bool {
        (self.0)(old, new)
    }
}

impl fmt::Debug for StructuralEquality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StructuralEquality")
    }
}

/// Decide whether `new` should be considered a change relative to `old`,
/// using `cmp`. Event streams always report `Changed` when a value is
/// pushed (there is no prior value to compare against, per spec §4.2): use
/// [`ChangeResult::Changed`] directly at the call site rather than this
/// helper for that case.
pub fn detect<T>(cmp: &dyn Equality<T>, old: &T, new: &T) -> ChangeResult {
    ChangeResult::from_bool(!cmp.eq(old, new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_detects_change() {
        let cmp = StructuralEquality;
        assert_eq!(detect(&cmp, &1, &2), ChangeResult::Changed);
        assert_eq!(detect(&cmp, &1, &1), ChangeResult::Unchanged);
    }

    #[test]
    fn fn_equality_allows_custom_tolerance() {
        let cmp = FnEquality(|a: &f64, b: &f64| (a - b).abs() < 0.01);
        assert_eq!(detect(&cmp, &1.0, &1.001), ChangeResult::Unchanged);
        assert_eq!(detect(&cmp, &1.0, &1.1), ChangeResult::Changed);
    }
}
