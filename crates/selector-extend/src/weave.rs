//! Weaving: interleaving the ancestor chains of two or more complex
//! selectors that share a unified subject.
//!
//! A component's trailing combinator, when present, glues it to the
//! component immediately after it: nothing from another chain may be
//! inserted between them (`>`, `+`, and `~` all describe an exact structural
//! relationship, not "somewhere in between"). A component with no trailing
//! combinator (an implicit descendant link) is a free point: the other
//! chain's components may be interleaved there in any order that preserves
//! each chain's own internal ordering.
//!
//! This is implemented by splitting each ancestor chain into maximal glued
//! runs at its descendant-combinator boundaries, then producing every
//! order-preserving interleaving ("riffle shuffle") of the two run lists,
//! with one extra constraint: a run whose last component is still glued to
//! *something* (i.e. it ends in a non-descendant combinator, because it was
//! the final run of its chain, headed for the unified subject) may only be
//! placed last overall — otherwise its combinator would end up connecting
//! to the wrong neighbor. Real-world ancestor chains are short, but
//! pathological input is bounded by [`MAX_WOVEN_RESULTS`] the same way
//! [`crate::trim::trim`] bails out on more than 100 selectors: past the cap
//! we stop branching and return whatever has been found so far rather than
//! exploring every shuffle.

use std::collections::HashSet;

use crate::selector::ComplexComponent;
use crate::span::Span;

/// Upper bound on how many distinct weavings we'll enumerate before giving
/// up on finding more. Keeps pathological inputs (many sibling-combinator
/// runs on both sides) from blowing up combinatorially.
const MAX_WOVEN_RESULTS: usize = 4096;

/// Produces every valid interleaving of the ancestor chains in `paths`,
/// returning `None` only when every candidate interleaving is eliminated by
/// a combinator conflict.
#[must_use]
pub fn weave(
    paths: Vec<Vec<ComplexComponent>>,
    _span: Option<Span>,
    _force_line_break: bool,
) -> Option<Vec<Vec<ComplexComponent>>> {
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut prefixes = vec![first];

    for path in iter {
        if path.is_empty() {
            continue;
        }
        let Some((target, parents)) = path.split_last() else {
            continue;
        };

        if parents.is_empty() {
            for prefix in &mut prefixes {
                prefix.push(target.clone());
            }
            continue;
        }

        let mut next_prefixes = Vec::new();
        for prefix in &prefixes {
            let Some(woven) = weave_parents(prefix, parents) else {
                continue;
            };
            for mut woven_prefix in woven {
                woven_prefix.push(target.clone());
                next_prefixes.push(woven_prefix);
            }
        }
        prefixes = next_prefixes;
    }

    if prefixes.is_empty() {
        None
    } else {
        Some(prefixes)
    }
}

fn weave_parents(a: &[ComplexComponent], b: &[ComplexComponent]) -> Option<Vec<Vec<ComplexComponent>>> {
    if a.is_empty() {
        return Some(vec![b.to_vec()]);
    }
    if b.is_empty() {
        return Some(vec![a.to_vec()]);
    }

    let runs_a = split_into_runs(a);
    let runs_b = split_into_runs(b);

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut acc = Vec::new();
    shuffle_runs(&runs_a, &runs_b, &mut acc, &mut out, &mut seen);

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Splits a chain into maximal runs that must stay contiguous: a run ends
/// right after a component with no trailing combinator (a free/descendant
/// boundary). Only the chain's final run may end in a real combinator
/// (the one connecting it to whatever follows outside `parents` itself).
fn split_into_runs(components: &[ComplexComponent]) -> Vec<Vec<ComplexComponent>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for component in components {
        let glued_to_next = component.combinator.is_some();
        current.push(component.clone());
        if !glued_to_next {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn ends_glued(run: &[ComplexComponent]) -> bool {
    run.last().is_some_and(|c| c.combinator.is_some())
}

fn shuffle_runs(
    a: &[Vec<ComplexComponent>],
    b: &[Vec<ComplexComponent>],
    acc: &mut Vec<ComplexComponent>,
    out: &mut Vec<Vec<ComplexComponent>>,
    seen: &mut HashSet<Vec<ComplexComponent>>,
) {
    if out.len() >= MAX_WOVEN_RESULTS {
        return;
    }
    if a.is_empty() && b.is_empty() {
        if seen.insert(acc.clone()) {
            out.push(acc.clone());
        }
        return;
    }

    if let Some((first, rest)) = a.split_first() {
        let is_last_overall = rest.is_empty() && b.is_empty();
        if !ends_glued(first) || is_last_overall {
            let added = first.len();
            acc.extend_from_slice(first);
            shuffle_runs(rest, b, acc, out, seen);
            acc.truncate(acc.len() - added);
        }
    }
    if let Some((first, rest)) = b.split_first() {
        let is_last_overall = rest.is_empty() && a.is_empty();
        if !ends_glued(first) || is_last_overall {
            let added = first.len();
            acc.extend_from_slice(first);
            shuffle_runs(a, rest, acc, out, seen);
            acc.truncate(acc.len() - added);
        }
    }
}
