//! Generic trim policy: dropping selectors made redundant by a broader one
//! already present in the same list.

use crate::selector::ComplexSelector;
use crate::superselector::complex_is_superselector;

/// Upper bound past which trimming is skipped entirely. The trim algorithm
/// is quadratic in the list size; real stylesheets never produce extend
/// results anywhere near this large, so past it we assume something
/// degenerate (or adversarial) is going on and return the list unchanged
/// rather than pay for an `O(n^2)` comparison that won't meaningfully
/// shrink the output anyway.
const MAX_TRIMMABLE: usize = 100;

/// Drops every selector in `selectors` that is made redundant by a broader
/// selector elsewhere in the list, i.e. one it is a non-strict subselector
/// of. A selector marked original by `is_original` is never dropped, even
/// if redundant, since doing so would silently delete a rule the stylesheet
/// author wrote by hand.
///
/// When two selectors are mutual superselectors (equivalent), the
/// earlier-occurring one in `selectors` wins ties and the later duplicate is
/// dropped.
///
/// When `specificity_guarded` is set, a selector is only considered
/// redundant if the selector that subsumes it has specificity at least as
/// high — used when trimming a list nested inside a specificity-sensitive
/// pseudo like `:is()`, where dropping a narrower-matching but
/// higher-specificity branch could silently lower the specificity the
/// pseudo as a whole contributes.
#[must_use]
pub fn trim(selectors: &[ComplexSelector], is_original: impl Fn(&ComplexSelector) -> bool, specificity_guarded: bool) -> Vec<ComplexSelector> {
    if selectors.len() > MAX_TRIMMABLE {
        return selectors.to_vec();
    }

    (0..selectors.len())
        .filter(|&i| !is_redundant(i, selectors, &is_original, specificity_guarded))
        .map(|i| selectors[i].clone())
        .collect()
}

fn is_redundant(
    i: usize,
    selectors: &[ComplexSelector],
    is_original: &impl Fn(&ComplexSelector) -> bool,
    specificity_guarded: bool,
) -> bool {
    let candidate = &selectors[i];
    if is_original(candidate) {
        return false;
    }

    for (j, other) in selectors.iter().enumerate() {
        if i == j || !complex_is_superselector(other, candidate) {
            continue;
        }
        if specificity_guarded && other.specificity() < candidate.specificity() {
            continue;
        }
        let mutual = complex_is_superselector(candidate, other);
        if mutual {
            if j < i {
                return true;
            }
            continue;
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{Combinator, ComplexComponent, CompoundSelector, SimpleSelector};
    use std::rc::Rc;

    fn class(name: &str) -> ComplexSelector {
        ComplexSelector::from_compound(CompoundSelector::from_non_empty(vec![SimpleSelector::Class {
            name: Rc::from(name),
            span: None,
        }]))
    }

    #[test]
    fn drops_selector_subsumed_by_a_broader_one() {
        let broad = class("a");
        let mut narrow = ComplexSelector::new(vec![
            ComplexComponent {
                compound: CompoundSelector::from_non_empty(vec![SimpleSelector::Class {
                    name: Rc::from("a"),
                    span: None,
                }]),
                combinator: None,
            },
            ComplexComponent {
                compound: CompoundSelector::from_non_empty(vec![SimpleSelector::Class {
                    name: Rc::from("b"),
                    span: None,
                }]),
                combinator: None,
            },
        ]);
        narrow.components[0].combinator = Some(Combinator::Child);
        let trimmed = trim(&[broad.clone(), narrow], |_| false, false);
        assert_eq!(trimmed, vec![broad]);
    }

    #[test]
    fn never_drops_an_original_selector() {
        let broad = class("a");
        let mut narrow = class("a");
        narrow.components[0].compound = CompoundSelector::from_non_empty(vec![
            SimpleSelector::Class {
                name: Rc::from("a"),
                span: None,
            },
            SimpleSelector::Class {
                name: Rc::from("b"),
                span: None,
            },
        ]);
        let trimmed = trim(&[broad, narrow.clone()], |c| *c == narrow, false);
        assert!(trimmed.contains(&narrow));
    }

    #[test]
    fn skips_trimming_past_the_size_cap() {
        let selectors: Vec<_> = (0..150).map(|i| class(&format!("c{i}"))).collect();
        let trimmed = trim(&selectors, |_| false, false);
        assert_eq!(trimmed.len(), selectors.len());
    }

    #[test]
    fn duplicate_equivalents_keep_the_earlier_one() {
        let a = class("a");
        let b = class("a");
        let trimmed = trim(&[a.clone(), b], |_| false, false);
        assert_eq!(trimmed, vec![a]);
    }
}
