//! Unification: combining compound and complex selectors into the single
//! selector (or selectors) matching the intersection of what the inputs
//! match.

use crate::selector::{
    AttributeSelector, Combinator, ComplexComponent, ComplexSelector, CompoundSelector, Namespace,
    QualifiedName, SimpleSelector,
};
use crate::span::Span;
use crate::weave::weave;

fn is_host_pseudo(simple: &SimpleSelector) -> bool {
    matches!(
        simple,
        SimpleSelector::Pseudo { normalized_name, is_class: true, .. }
            if normalized_name.as_ref() == "host" || normalized_name.as_ref() == "host-context"
    )
}

fn has_non_host_constraint(compound: &CompoundSelector) -> bool {
    compound
        .selectors()
        .iter()
        .any(|s| !matches!(s, SimpleSelector::Universal { .. }) && !is_host_pseudo(s))
}

fn intersect_namespace(a: &Namespace, b: &Namespace) -> Option<Namespace> {
    match (a, b) {
        (x, y) if x == y => Some(x.clone()),
        (Namespace::Default, Namespace::Any) | (Namespace::Any, Namespace::Default) => {
            Some(Namespace::Default)
        }
        (Namespace::Default, other) | (other, Namespace::Default) => Some(other.clone()),
        (Namespace::Any, other) | (other, Namespace::Any) => Some(other.clone()),
        _ => None,
    }
}

/// Unifies the leading universal/type selectors of two compounds, per
/// [Selectors Level 4 § 5.1](https://www.w3.org/TR/selectors-4/#the-universal-selector):
/// namespaces intersect, names must agree unless one side is universal.
/// Returns `None` when the two cannot describe the same element (different
/// concrete names, or incompatible namespaces).
#[must_use]
pub fn unify_universal_and_element(a: &SimpleSelector, b: &SimpleSelector) -> Option<SimpleSelector> {
    match (a, b) {
        (SimpleSelector::Universal { namespace: n1, span }, SimpleSelector::Universal { namespace: n2, .. }) => {
            intersect_namespace(n1, n2).map(|namespace| SimpleSelector::Universal { namespace, span: *span })
        }
        (SimpleSelector::Universal { namespace: n1, .. }, SimpleSelector::Type { name, span })
        | (SimpleSelector::Type { name, span }, SimpleSelector::Universal { namespace: n1, .. }) => {
            intersect_namespace(n1, &name.namespace).map(|namespace| SimpleSelector::Type {
                name: QualifiedName {
                    name: name.name.clone(),
                    namespace,
                },
                span: *span,
            })
        }
        (SimpleSelector::Type { name: n1, span }, SimpleSelector::Type { name: n2, .. }) => {
            if n1.name != n2.name {
                return None;
            }
            intersect_namespace(&n1.namespace, &n2.namespace).map(|namespace| SimpleSelector::Type {
                name: QualifiedName {
                    name: n1.name.clone(),
                    namespace,
                },
                span: *span,
            })
        }
        _ => None,
    }
}

fn leading_element(compound: &CompoundSelector) -> Option<&SimpleSelector> {
    compound
        .selectors()
        .first()
        .filter(|s| matches!(s, SimpleSelector::Universal { .. } | SimpleSelector::Type { .. }))
}

/// Merges a single simple selector into an existing compound, the way a
/// `@extend`ed selector's simples get folded one at a time into the
/// extender's compound. Returns `None` if the merge is impossible (e.g. two
/// different ids, two different pseudo-elements, a placeholder trying to
/// unify outside its own compound).
#[must_use]
pub fn unify_simple_into_compound(
    simple: &SimpleSelector,
    compound: &CompoundSelector,
) -> Option<CompoundSelector> {
    match simple {
        SimpleSelector::Placeholder { .. } => None,
        SimpleSelector::Parent { .. } => None,
        SimpleSelector::Universal { .. } | SimpleSelector::Type { .. } => {
            match leading_element(compound) {
                Some(existing) => {
                    let merged = unify_universal_and_element(simple, existing)?;
                    let mut rest = compound.selectors().to_vec();
                    rest[0] = merged;
                    Some(CompoundSelector::from_non_empty(rest))
                }
                None => {
                    let mut rest = vec![simple.clone()];
                    rest.extend(compound.selectors().iter().cloned());
                    Some(CompoundSelector::from_non_empty(rest))
                }
            }
        }
        SimpleSelector::Id { name, .. } => {
            if compound
                .selectors()
                .iter()
                .any(|s| matches!(s, SimpleSelector::Id { name: other, .. } if other != name))
            {
                return None;
            }
            append_unique(compound, simple)
        }
        SimpleSelector::Pseudo { is_class: false, .. } => {
            if compound
                .selectors()
                .iter()
                .any(|s| s.is_pseudo_element() && s != simple)
            {
                return None;
            }
            append_unique(compound, simple)
        }
        _ if is_host_pseudo(simple) => {
            if has_non_host_constraint(compound) {
                return None;
            }
            append_unique(compound, simple)
        }
        _ => append_unique(compound, simple),
    }
}

fn append_unique(compound: &CompoundSelector, simple: &SimpleSelector) -> Option<CompoundSelector> {
    if is_host_pseudo(simple) && has_non_host_constraint(compound) {
        return None;
    }
    let mut selectors = compound.selectors().to_vec();
    if !selectors.iter().any(|s| s == simple) {
        // Pseudo-elements must sort last within their compound.
        if simple.is_pseudo_element() {
            selectors.push(simple.clone());
        } else if let Some(pos) = selectors.iter().position(SimpleSelector::is_pseudo_element) {
            selectors.insert(pos, simple.clone());
        } else {
            selectors.push(simple.clone());
        }
    }
    Some(CompoundSelector::from_non_empty(selectors))
}

/// Unifies two compound selectors into the compound matching every element
/// both would match, or `None` if no such element could exist.
#[must_use]
pub fn unify_compound(a: &CompoundSelector, b: &CompoundSelector) -> Option<CompoundSelector> {
    if is_host_pseudo_compound(a) != is_host_pseudo_compound(b)
        && (has_non_host_constraint(a) && is_host_pseudo_compound(b)
            || has_non_host_constraint(b) && is_host_pseudo_compound(a))
    {
        return None;
    }

    let mut result = a.clone();
    for simple in b.selectors() {
        result = unify_simple_into_compound(simple, &result)?;
    }
    Some(result)
}

fn is_host_pseudo_compound(compound: &CompoundSelector) -> bool {
    compound.selectors().iter().any(is_host_pseudo)
}

/// Combines two or more complex selectors into every complex selector
/// matching the intersection of their element sets: the subjects unify, and
/// every way of interleaving the two ancestor chains while respecting
/// combinator constraints is produced by [`weave`].
#[must_use]
pub fn unify_complex(list: &[ComplexSelector], span: Option<Span>) -> Option<Vec<ComplexSelector>> {
    if list.is_empty() {
        return None;
    }
    if list.len() == 1 {
        return Some(vec![list[0].clone()]);
    }

    let mut trailing = list[0].subject()?.clone();
    for complex in &list[1..] {
        trailing = unify_compound(&trailing, complex.subject()?)?;
    }

    let paths: Vec<Vec<ComplexComponent>> = list
        .iter()
        .map(|c| c.components[..c.components.len().saturating_sub(1)].to_vec())
        .collect();

    let leading = list.iter().find_map(|c| c.leading_combinator);
    let line_break = list.iter().any(|c| c.line_break);
    let woven = weave(paths, span, line_break)?;

    Some(
        woven
            .into_iter()
            .map(|mut components| {
                components.push(ComplexComponent {
                    compound: trailing.clone(),
                    combinator: None,
                });
                ComplexSelector {
                    leading_combinator: leading,
                    components,
                    line_break,
                    origin_id: None,
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn class(name: &str) -> SimpleSelector {
        SimpleSelector::Class {
            name: Rc::from(name),
            span: None,
        }
    }

    fn id(name: &str) -> SimpleSelector {
        SimpleSelector::Id {
            name: Rc::from(name),
            span: None,
        }
    }

    fn type_sel(name: &str) -> SimpleSelector {
        SimpleSelector::Type {
            name: QualifiedName {
                name: Rc::from(name),
                namespace: Namespace::Default,
            },
            span: None,
        }
    }

    fn compound(simples: Vec<SimpleSelector>) -> CompoundSelector {
        CompoundSelector::from_non_empty(simples)
    }

    #[test]
    fn unify_compound_merges_distinct_simples() {
        let a = compound(vec![class("a")]);
        let b = compound(vec![class("b")]);
        let merged = unify_compound(&a, &b).unwrap();
        assert_eq!(merged.selectors().len(), 2);
    }

    #[test]
    fn unify_compound_dedupes_equal_simples() {
        let a = compound(vec![class("a")]);
        let b = compound(vec![class("a")]);
        let merged = unify_compound(&a, &b).unwrap();
        assert_eq!(merged.selectors().len(), 1);
    }

    #[test]
    fn unify_compound_rejects_conflicting_ids() {
        let a = compound(vec![id("a")]);
        let b = compound(vec![id("b")]);
        assert!(unify_compound(&a, &b).is_none());
    }

    #[test]
    fn unify_compound_merges_type_and_universal() {
        let a = compound(vec![type_sel("div")]);
        let b = compound(vec![SimpleSelector::Universal {
            namespace: Namespace::Default,
            span: None,
        }]);
        let merged = unify_compound(&a, &b).unwrap();
        assert_eq!(merged.selectors().len(), 1);
        assert!(matches!(merged.selectors()[0], SimpleSelector::Type { .. }));
    }

    #[test]
    fn unify_compound_rejects_conflicting_types() {
        let a = compound(vec![type_sel("div")]);
        let b = compound(vec![type_sel("span")]);
        assert!(unify_compound(&a, &b).is_none());
    }
}
