//! Superselector decision: does every element matched by `b` also match
//! `a`? When so, `a` is said to be a superselector of `b`, and selectors
//! equivalent to (or less specific than) `a` can be trimmed from a set that
//! already contains something as broad as `a`.

use crate::selector::{Combinator, ComplexSelector, CompoundSelector, SimpleSelector};

/// Whether simple selector `a` matches every element `b` matches.
///
/// True when the two are equal, or when `b` is one of the subselector
/// pseudos (`:is()`, `:matches()`, `:where()`, `:any()`,
/// `:nth-child()`/`:nth-last-child()`) and every branch of its argument list
/// ends in a compound containing something `a` is a superselector of.
#[must_use]
pub fn is_superselector_simple(a: &SimpleSelector, b: &SimpleSelector) -> bool {
    if a == b {
        return true;
    }
    let SimpleSelector::Pseudo {
        is_class: true,
        normalized_name,
        selector: Some(inner),
        ..
    } = b
    else {
        return false;
    };
    if !matches!(
        normalized_name.as_ref(),
        "is" | "matches" | "where" | "any" | "nth-child" | "nth-last-child"
    ) {
        return false;
    }
    inner.complexes.iter().all(|complex| {
        complex
            .subject()
            .is_some_and(|subject| subject.selectors().iter().any(|s| is_superselector_simple(a, s)))
    })
}

fn pseudo_element(compound: &CompoundSelector) -> Option<&SimpleSelector> {
    compound.selectors().iter().find(|s| s.is_pseudo_element())
}

/// Whether every branch of `a` has some branch in `b` it is a superselector
/// of: the list-level analogue used by `:is()`/`:where()`/`:has()`
/// argument comparisons.
fn selector_list_is_superselector(a: &crate::selector::SelectorList, b: &crate::selector::SelectorList) -> bool {
    b.complexes
        .iter()
        .all(|cb| a.complexes.iter().any(|ca| complex_is_superselector(ca, cb)))
}

fn complex_is_superselector_of_compound(a: &ComplexSelector, b: &CompoundSelector) -> bool {
    let singleton = ComplexSelector::from_compound(b.clone());
    complex_is_superselector(a, &singleton)
}

/// Whether compound `a` matches every element compound `b` matches.
///
/// Most simple selectors in `a` just need a structurally-equal (or
/// pseudo-subselector-satisfied, see [`is_superselector_simple`]) match
/// somewhere in `b`. A handful of pseudo-classes get specialized reasoning
/// instead, per [Selectors Level 4 § 18](https://www.w3.org/TR/selectors-4/#matches):
/// `:not()` is satisfied when none of its argument's branches are
/// guaranteed to match anything `b` matches; `:is()`/`:where()`/`:any()` are
/// satisfied when any branch is; `:has()`, `:host()`, `:host-context()`,
/// `:current()`, and `:slotted()` compare structurally against an
/// equivalent pseudo already present in `b`, since this crate has no DOM to
/// evaluate their relational semantics against.
#[must_use]
pub fn compound_is_superselector(a: &CompoundSelector, b: &CompoundSelector) -> bool {
    if let Some(b_pseudo_element) = pseudo_element(b) {
        if !a.selectors().iter().any(|s| s == b_pseudo_element) {
            return false;
        }
    }
    a.selectors().iter().all(|simple| simple_satisfied_by_compound(simple, b))
}

fn simple_satisfied_by_compound(simple: &SimpleSelector, b: &CompoundSelector) -> bool {
    let SimpleSelector::Pseudo {
        is_class: true,
        normalized_name,
        argument,
        selector,
        ..
    } = simple
    else {
        return b.selectors().iter().any(|sb| is_superselector_simple(simple, sb));
    };

    match normalized_name.as_ref() {
        "not" => selector.as_ref().is_none_or(|inner| {
            !inner.complexes.iter().any(|c| complex_is_superselector_of_compound(c, b))
        }),
        "is" | "matches" | "any" | "where" => selector
            .as_ref()
            .is_some_and(|inner| inner.complexes.iter().any(|c| complex_is_superselector_of_compound(c, b))),
        "has" => {
            let Some(inner) = selector else { return false };
            b.selectors().iter().any(|sb| match sb {
                SimpleSelector::Pseudo {
                    normalized_name: n,
                    selector: Some(bi),
                    ..
                } if n.as_ref() == "has" => selector_list_is_superselector(inner, bi),
                _ => false,
            })
        }
        "nth-child" | "nth-last-child" => b.selectors().iter().any(|sb| match sb {
            SimpleSelector::Pseudo {
                normalized_name: n2,
                argument: arg2,
                selector: sel2,
                ..
            } if n2 == normalized_name && arg2 == argument => match (selector, sel2) {
                (None, None) => true,
                (Some(i1), Some(i2)) => selector_list_is_superselector(i1, i2),
                _ => false,
            },
            _ => false,
        }),
        "host" | "host-context" | "current" | "slotted" => {
            b.selectors().iter().any(|sb| sb == simple)
        }
        _ => b.selectors().iter().any(|sb| is_superselector_simple(simple, sb)),
    }
}

fn combinator_compatible(need: Combinator, have: Combinator) -> bool {
    match need {
        Combinator::Child => have == Combinator::Child,
        Combinator::NextSibling => have == Combinator::NextSibling,
        Combinator::FollowingSibling => {
            matches!(have, Combinator::FollowingSibling | Combinator::NextSibling)
        }
    }
}

/// Whether complex selector `a` matches every element `b` matches.
///
/// Both must be stand-alone (no leading/trailing combinator dangling off
/// the list being compared — those only make sense as fragments inside a
/// relational pseudo like `:has()`, which is handled at the list level
/// instead). `a`'s subject must align with `b`'s subject: they are both
/// "the actual element" each chain describes, so `a` can't be satisfied by
/// matching only one of `b`'s ancestors. Everything before the subject may
/// walk further back through `b`'s ancestors when connected by an implicit
/// descendant combinator, but a `>`/`+`/`~` link demands exact adjacency —
/// this is also why a trailing `>` in `a` leaves no room for `b` to have
/// extra unmatched ancestors past that point.
#[must_use]
pub fn complex_is_superselector(a: &ComplexSelector, b: &ComplexSelector) -> bool {
    if !a.is_stand_alone() || !b.is_stand_alone() {
        return false;
    }
    if a.components.is_empty() || b.components.is_empty() || a.components.len() > b.components.len() {
        return a.components.is_empty();
    }
    match_suffix(&a.components, &b.components)
}

fn match_suffix(a: &[crate::selector::ComplexComponent], b: &[crate::selector::ComplexComponent]) -> bool {
    let ai = a.len() - 1;
    let bi = b.len() - 1;
    if !compound_is_superselector(&a[ai].compound, &b[bi].compound) {
        return false;
    }
    if ai == 0 {
        return true;
    }
    match a[ai - 1].combinator {
        None => (0..bi).rev().any(|p| match_suffix(&a[..ai], &b[..=p])),
        Some(needed) => {
            bi > 0
                && b[bi - 1].combinator.is_some_and(|have| combinator_compatible(needed, have))
                && match_suffix(&a[..ai], &b[..bi])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{ComplexComponent, CompoundSelector};
    use std::rc::Rc;

    fn class(name: &str) -> SimpleSelector {
        SimpleSelector::Class {
            name: Rc::from(name),
            span: None,
        }
    }

    fn complex(simples: Vec<Vec<SimpleSelector>>, combinators: Vec<Option<Combinator>>) -> ComplexSelector {
        let components = simples
            .into_iter()
            .zip(combinators)
            .map(|(s, c)| ComplexComponent {
                compound: CompoundSelector::from_non_empty(s),
                combinator: c,
            })
            .collect();
        ComplexSelector::new(components)
    }

    #[test]
    fn equal_compounds_are_mutually_superselector() {
        let a = CompoundSelector::from_non_empty(vec![class("a")]);
        assert!(compound_is_superselector(&a, &a));
    }

    #[test]
    fn fewer_constraints_is_superselector_of_more() {
        let broad = CompoundSelector::from_non_empty(vec![class("a")]);
        let narrow = CompoundSelector::from_non_empty(vec![class("a"), class("b")]);
        assert!(compound_is_superselector(&broad, &narrow));
        assert!(!compound_is_superselector(&narrow, &broad));
    }

    #[test]
    fn descendant_allows_extra_ancestors() {
        let a = complex(vec![vec![class("x")], vec![class("y")]], vec![None, None]);
        let b = complex(
            vec![vec![class("w")], vec![class("x")], vec![class("y")]],
            vec![None, None, None],
        );
        assert!(complex_is_superselector(&a, &b));
    }

    #[test]
    fn child_combinator_requires_exact_adjacency() {
        let a = complex(
            vec![vec![class("x")], vec![class("y")]],
            vec![Some(Combinator::Child), None],
        );
        let b_adjacent = complex(
            vec![vec![class("x")], vec![class("y")]],
            vec![Some(Combinator::Child), None],
        );
        let b_with_gap = complex(
            vec![vec![class("x")], vec![class("w")], vec![class("y")]],
            vec![None, Some(Combinator::Child), None],
        );
        assert!(complex_is_superselector(&a, &b_adjacent));
        assert!(!complex_is_superselector(&a, &b_with_gap));
    }

    #[test]
    fn is_pseudo_satisfied_by_any_matching_branch() {
        use crate::selector::SelectorList;
        let inner = SelectorList {
            complexes: vec![ComplexSelector::from_compound(CompoundSelector::from_non_empty(
                vec![class("a")],
            ))],
        };
        let is_pseudo = SimpleSelector::Pseudo {
            name: Rc::from("is"),
            normalized_name: Rc::from("is"),
            is_class: true,
            argument: None,
            selector: Some(Rc::new(inner)),
            span: None,
        };
        let a = CompoundSelector::from_non_empty(vec![is_pseudo]);
        let b = CompoundSelector::from_non_empty(vec![class("a"), class("b")]);
        assert!(compound_is_superselector(&a, &b));
    }
}
