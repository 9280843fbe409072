//! Selector unification, superselector comparison, and `@extend` resolution
//! for a CSS preprocessor.
//!
//! This crate implements the part of a Sass-like preprocessor that resolves
//! `@extend` rules: given a stylesheet's selectors and the `@extend`
//! declarations written against them, it produces the final, trimmed
//! selector lists each rule should be emitted with. It owns no parser and no
//! DOM — selectors come in as the [`selector`] module's typed tree, already
//! parsed, and the relational pseudos (`:has()` and friends) are reasoned
//! about structurally rather than against live elements.
//!
//! The pieces, bottom-up:
//! - [`selector`]: the selector data model and specificity.
//! - [`unify`]: combining compound/complex selectors into their intersection.
//! - [`weave`]: interleaving ancestor chains that share a unified subject.
//! - [`superselector`]: deciding whether one selector matches a superset of
//!   what another matches.
//! - [`trim`]: dropping selectors redundant with a broader one in the same
//!   list.
//! - [`modern`]: applying that trim recursively inside `:is()`/`:where()`/
//!   `:has()`-style pseudos.
//! - [`store`]: the stateful [`Store`] that ties all of the above together
//!   across a whole stylesheet.

pub mod error;
pub mod modern;
pub mod selector;
pub mod span;
pub mod store;
pub mod superselector;
pub mod trim;
pub mod unify;
pub mod weave;

pub use error::{ExtendError, ExtendResult};
pub use selector::{
    AttributeOperator, AttributeSelector, Combinator, ComplexComponent, ComplexSelector,
    CompoundSelector, Namespace, QualifiedName, SelectorList, SimpleSelector, specificity,
};
pub use span::{Span, SpanLabel};
pub use store::{Extension, ExtendMode, MediaContext, MergedExtension, Store};
pub use superselector::{compound_is_superselector, complex_is_superselector, is_superselector_simple};
pub use unify::{unify_compound, unify_complex, unify_simple_into_compound};
