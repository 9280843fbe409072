//! The modern-pseudo trim visitor: recursively trims the nested selector
//! lists carried by `:is()`, `:where()`, `:matches()`, `:any()`, `:not()`,
//! `:has()`, and `nth-child(.. of S)`, and collapses a subselector pseudo
//! whose argument has been trimmed down to a single simple selector into
//! that simple selector directly.

use std::rc::Rc;

use crate::selector::{CompoundSelector, SelectorList, SimpleSelector};
use crate::trim::trim;

/// Pseudo names whose argument affects the specificity of the compound
/// they appear in (see [`crate::selector::specificity`]), and therefore
/// need the specificity-guarded trim rather than the unguarded one.
const SPECIFICITY_SENSITIVE: &[&str] = &["is", "matches", "any", "not", "nth-child", "nth-last-child"];

/// Recursively trims every nested selector list reachable from `list`,
/// dropping redundant branches the same way [`trim`] does for a top-level
/// extend result, then collapsing any subselector pseudo left with exactly
/// one single-simple-selector branch into that simple selector.
///
/// `is_original` identifies complex selectors that must never be dropped —
/// including, per this engine's resolution of the `:where()`
/// original-tracking question, derived copies produced while rewriting a
/// `:where(...)` argument.
#[must_use]
pub fn trim_modern_selectors(list: &SelectorList, is_original: &impl Fn(&crate::selector::ComplexSelector) -> bool) -> SelectorList {
    let complexes = list
        .complexes
        .iter()
        .map(|complex| trim_complex(complex, is_original))
        .collect();
    SelectorList { complexes }
}

fn trim_complex(
    complex: &crate::selector::ComplexSelector,
    is_original: &impl Fn(&crate::selector::ComplexSelector) -> bool,
) -> crate::selector::ComplexSelector {
    let mut result = complex.clone();
    for component in &mut result.components {
        component.compound = trim_compound(&component.compound, is_original);
    }
    result
}

fn trim_compound(
    compound: &CompoundSelector,
    is_original: &impl Fn(&crate::selector::ComplexSelector) -> bool,
) -> CompoundSelector {
    let selectors = compound
        .selectors()
        .iter()
        .map(|simple| trim_simple(simple, is_original))
        .collect();
    CompoundSelector::from_non_empty(selectors)
}

fn trim_simple(
    simple: &SimpleSelector,
    is_original: &impl Fn(&crate::selector::ComplexSelector) -> bool,
) -> SimpleSelector {
    let SimpleSelector::Pseudo {
        name,
        normalized_name,
        is_class,
        argument,
        selector: Some(inner),
        span,
    } = simple
    else {
        return simple.clone();
    };

    let ignore_specificity = !SPECIFICITY_SENSITIVE.contains(&normalized_name.as_ref());
    let where_like = normalized_name.as_ref() == "where";

    let recursed: Vec<_> = inner.complexes.iter().map(|c| trim_complex(c, is_original)).collect();
    let trimmed = trim(&recursed, is_original, !ignore_specificity);

    // Per this engine's resolution of the `:where()` open question: a
    // derived copy of an original complex stays non-trimmable even though
    // `trim` above doesn't know that — guard by re-including any original
    // complex `trim` dropped.
    let trimmed = if where_like {
        restore_dropped_originals(&recursed, trimmed, is_original)
    } else {
        trimmed
    };

    let new_list = SelectorList { complexes: trimmed };
    let new_selector = Rc::new(new_list);

    SimpleSelector::Pseudo {
        name: name.clone(),
        normalized_name: normalized_name.clone(),
        is_class: *is_class,
        argument: argument.clone(),
        selector: Some(new_selector),
        span: *span,
    }
}

fn restore_dropped_originals(
    recursed: &[crate::selector::ComplexSelector],
    mut trimmed: Vec<crate::selector::ComplexSelector>,
    is_original: &impl Fn(&crate::selector::ComplexSelector) -> bool,
) -> Vec<crate::selector::ComplexSelector> {
    for complex in recursed {
        if is_original(complex) && !trimmed.contains(complex) {
            trimmed.push(complex.clone());
        }
    }
    trimmed
}

/// If a compound contains exactly one simple selector and that selector is
/// `:is()`/`:matches()`/`:any()` with exactly one branch that is itself a
/// single compound, replaces the whole compound with that inner compound.
/// This is the collapsing rule `spec.md` §4.8 calls out: a single-branch
/// `:is()` standing alone in a compound is indistinguishable from writing
/// the branch directly, so there is no reason to keep the wrapper.
#[must_use]
pub fn flatten_single_branch_compound(compound: &CompoundSelector) -> CompoundSelector {
    if compound.selectors().len() != 1 {
        return compound.clone();
    }
    let SimpleSelector::Pseudo {
        is_class: true,
        normalized_name,
        selector: Some(inner),
        ..
    } = &compound.selectors()[0]
    else {
        return compound.clone();
    };
    if !matches!(normalized_name.as_ref(), "is" | "matches" | "any") {
        return compound.clone();
    }
    if inner.complexes.len() != 1 {
        return compound.clone();
    }
    let only = &inner.complexes[0];
    if only.is_stand_alone() && only.components.len() == 1 {
        only.components[0].compound.clone()
    } else {
        compound.clone()
    }
}
