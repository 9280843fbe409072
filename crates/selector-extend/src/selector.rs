//! Selector Model.
//!
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/) shapes, widened
//! the way Sass widens them for `@extend`: a `Placeholder` simple selector
//! for `%foo`, a `Parent` simple selector for `&`, and pseudo selectors that
//! can carry a nested [`SelectorList`] argument (`:is(...)`, `:has(...)`,
//! `:nth-child(.. of ..)`).
//!
//! Equality and hashing are value-based and ignore [`Span`]s, with one
//! deliberate exception: a [`SimpleSelector::Pseudo`]'s nested selector
//! argument is compared by pointer identity, not by structure. Two `:is(...)`
//! pseudos with coincidentally-equal argument lists still came from two
//! different places in the source and are tracked as distinct nodes by the
//! extension store's bookkeeping maps.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::span::Span;

/// The namespace half of a [`QualifiedName`].
///
/// Forms a small lattice used when unifying type/universal selectors:
/// `Default` (no namespace prefix written) and `Any` (`*|foo`) are both
/// unconstrained and yield to whichever side is more specific; `None` (an
/// explicit empty prefix, `|foo`) and `Named` are real constraints that only
/// unify with themselves, `Default`, or `Any`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// No namespace prefix was written.
    Default,
    /// An explicit empty prefix (`|foo`): matches elements with no namespace.
    None,
    /// A wildcard prefix (`*|foo`): matches any namespace.
    Any,
    /// An explicit namespace prefix (`ns|foo`).
    Named(Rc<str>),
}

/// An element name together with its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// The local name, e.g. `"div"`.
    pub name: Rc<str>,
    /// The namespace constraint.
    pub namespace: Namespace,
}

/// Attribute selector comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    /// `[attr=val]`
    Equal,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

/// `[namespace|name op value modifier]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    /// The attribute's qualified name.
    pub qname: QualifiedName,
    /// The comparison, or `None` for a bare `[attr]` existence check.
    pub op: Option<AttributeOperator>,
    /// The value compared against, present iff `op` is.
    pub value: Option<Rc<str>>,
    /// An optional case-sensitivity modifier (`i` or `s`).
    pub modifier: Option<char>,
}

/// A single simple selector.
///
/// `Parent` and `Placeholder` are Sass widenings with no counterpart in
/// plain CSS Selectors: `Parent` stands for `&`, resolved away before a
/// selector reaches the store (any `Parent` the store sees is an error, see
/// [`crate::error::ExtendError::ParentInCompound`]); `Placeholder` stands for
/// `%foo`, a selector that exists purely to be extended and never matches
/// anything on its own.
#[derive(Debug, Clone)]
pub enum SimpleSelector {
    /// `*` or `ns|*`.
    Universal {
        /// The namespace constraint.
        namespace: Namespace,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// A type/tag-name selector.
    Type {
        /// The qualified element name.
        name: QualifiedName,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// `.class`
    Class {
        /// The class name, without the leading dot.
        name: Rc<str>,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// `#id`
    Id {
        /// The id, without the leading hash.
        name: Rc<str>,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// `[attr...]`
    Attribute {
        /// The attribute selector payload.
        attribute: AttributeSelector,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// `%placeholder`
    Placeholder {
        /// The placeholder name, without the leading percent.
        name: Rc<str>,
        /// Whether the name starts with `-` or `_`, hiding it from being
        /// treated as a public extension point by tooling built atop this
        /// engine. The algorithms here treat private and public
        /// placeholders identically.
        is_private: bool,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// `&`, optionally with a trailing suffix (`&-suffix`).
    Parent {
        /// Text directly appended after the `&`, if any.
        suffix: Option<Rc<str>>,
        /// Where this selector was written.
        span: Option<Span>,
    },
    /// A pseudo-class or pseudo-element, optionally carrying a nested
    /// selector-list argument.
    Pseudo {
        /// The name as written, e.g. `"nth-child"`.
        name: Rc<str>,
        /// The name lowercased and with vendor prefixes stripped, used for
        /// the specialized reasoning in [`crate::superselector`].
        normalized_name: Rc<str>,
        /// `true` for a pseudo-*class* (`:foo`), `false` for a
        /// pseudo-*element* (`::foo`).
        is_class: bool,
        /// A raw textual argument, for pseudos like `:nth-child(2n+1)` whose
        /// argument isn't itself a selector list.
        argument: Option<Rc<str>>,
        /// A nested selector-list argument, for pseudos like `:is(...)`,
        /// `:not(...)`, `:has(...)`, or `:nth-child(.. of S)`.
        ///
        /// Compared by pointer identity, not structurally — see the module
        /// doc comment.
        selector: Option<Rc<SelectorList>>,
        /// Where this selector was written.
        span: Option<Span>,
    },
}

impl SimpleSelector {
    fn discriminant(&self) -> u8 {
        match self {
            Self::Universal { .. } => 0,
            Self::Type { .. } => 1,
            Self::Class { .. } => 2,
            Self::Id { .. } => 3,
            Self::Attribute { .. } => 4,
            Self::Placeholder { .. } => 5,
            Self::Parent { .. } => 6,
            Self::Pseudo { .. } => 7,
        }
    }

    /// Whether this is a pseudo-*element* (`::foo`), which may appear at
    /// most once per compound and always sorts last within it.
    #[must_use]
    pub fn is_pseudo_element(&self) -> bool {
        matches!(self, Self::Pseudo { is_class: false, .. })
    }
}

impl PartialEq for SimpleSelector {
    fn eq(&self, other: &Self) -> bool {
        use SimpleSelector::{Attribute, Class, Id, Parent, Placeholder, Pseudo, Type, Universal};
        match (self, other) {
            (Universal { namespace: n1, .. }, Universal { namespace: n2, .. }) => n1 == n2,
            (Type { name: n1, .. }, Type { name: n2, .. }) => n1 == n2,
            (Class { name: n1, .. }, Class { name: n2, .. }) => n1 == n2,
            (Id { name: n1, .. }, Id { name: n2, .. }) => n1 == n2,
            (Attribute { attribute: a1, .. }, Attribute { attribute: a2, .. }) => a1 == a2,
            (
                Placeholder { name: n1, is_private: p1, .. },
                Placeholder { name: n2, is_private: p2, .. },
            ) => n1 == n2 && p1 == p2,
            (Parent { suffix: s1, .. }, Parent { suffix: s2, .. }) => s1 == s2,
            (
                Pseudo {
                    normalized_name: n1,
                    is_class: c1,
                    argument: a1,
                    selector: sel1,
                    ..
                },
                Pseudo {
                    normalized_name: n2,
                    is_class: c2,
                    argument: a2,
                    selector: sel2,
                    ..
                },
            ) => {
                n1 == n2
                    && c1 == c2
                    && a1 == a2
                    && match (sel1, sel2) {
                        (None, None) => true,
                        (Some(l), Some(r)) => Rc::ptr_eq(l, r),
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

impl Eq for SimpleSelector {}

impl Hash for SimpleSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Self::Universal { namespace, .. } => namespace.hash(state),
            Self::Type { name, .. } => name.hash(state),
            Self::Class { name, .. } | Self::Id { name, .. } => name.hash(state),
            Self::Attribute { attribute, .. } => attribute.hash(state),
            Self::Placeholder { name, is_private, .. } => {
                name.hash(state);
                is_private.hash(state);
            }
            Self::Parent { suffix, .. } => suffix.hash(state),
            Self::Pseudo {
                normalized_name,
                is_class,
                argument,
                selector,
                ..
            } => {
                normalized_name.hash(state);
                is_class.hash(state);
                argument.hash(state);
                match selector {
                    None => 0_usize.hash(state),
                    Some(rc) => (Rc::as_ptr(rc) as usize).hash(state),
                }
            }
        }
    }
}

/// CSS combinators, attached to the component that precedes the compound
/// they connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    FollowingSibling,
}

/// An ordered, non-empty sequence of simple selectors with no combinators
/// between them (`div.foo#bar`).
#[derive(Debug, Clone)]
pub struct CompoundSelector {
    selectors: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// Builds a compound selector, returning `None` if it is empty.
    #[must_use]
    pub fn new(selectors: Vec<SimpleSelector>) -> Option<Self> {
        if selectors.is_empty() {
            None
        } else {
            Some(Self { selectors })
        }
    }

    /// Builds a compound selector without checking for emptiness. Only
    /// valid when the caller has already established `selectors` is
    /// non-empty, e.g. as the result of unification of two non-empty
    /// compounds.
    #[must_use]
    pub(crate) fn from_non_empty(selectors: Vec<SimpleSelector>) -> Self {
        debug_assert!(!selectors.is_empty());
        Self { selectors }
    }

    /// The simple selectors that make up this compound, in source order.
    #[must_use]
    pub fn selectors(&self) -> &[SimpleSelector] {
        &self.selectors
    }

    /// The sum of the specificity of every simple selector in this compound.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        self.selectors.iter().map(specificity).sum()
    }
}

impl PartialEq for CompoundSelector {
    fn eq(&self, other: &Self) -> bool {
        self.selectors == other.selectors
    }
}

impl Eq for CompoundSelector {}

impl Hash for CompoundSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.selectors.hash(state);
    }
}

/// One `(compound, trailing combinator)` link in a complex selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexComponent {
    /// The compound selector at this position.
    pub compound: CompoundSelector,
    /// How this compound connects to the next one, or `None` for an
    /// implicit descendant combinator (or no next component at all).
    pub combinator: Option<Combinator>,
}

/// A chain of compound selectors joined by combinators (`div > .a ~ #b`).
///
/// Equality, hashing, and ordering ignore [`Self::line_break`] (pure
/// formatting) and the identity tag assigned by the store to track which
/// complex selectors are "original" source selectors — both are bookkeeping,
/// not semantics.
#[derive(Debug, Clone)]
pub struct ComplexSelector {
    /// A combinator with no preceding compound, e.g. the `>` in a relative
    /// selector passed to `:has(> img)`.
    pub leading_combinator: Option<Combinator>,
    /// The chain of components, in source order. The last component's
    /// compound is the "subject" — the actual element being matched.
    pub components: Vec<ComplexComponent>,
    /// Whether this selector should be rendered on its own line when
    /// serialized. Irrelevant to every algorithm in this crate; carried only
    /// so a round-trip through this engine doesn't lose formatting intent.
    pub line_break: bool,
    /// Set by the extension store when this selector is registered as (or
    /// derived from) a literal selector written in the source, as opposed to
    /// one synthesized purely by unification/weaving. `None` for synthetic
    /// selectors. Never consulted for equality or hashing.
    pub(crate) origin_id: Option<u64>,
}

impl ComplexSelector {
    /// Builds a stand-alone complex selector (no leading or trailing
    /// combinator) from a non-empty list of components.
    #[must_use]
    pub fn new(components: Vec<ComplexComponent>) -> Self {
        Self {
            leading_combinator: None,
            components,
            line_break: false,
            origin_id: None,
        }
    }

    /// A complex selector consisting of a single bare compound, with no
    /// combinators at all. Used to compare a [`CompoundSelector`] against
    /// machinery that expects a [`ComplexSelector`].
    #[must_use]
    pub fn from_compound(compound: CompoundSelector) -> Self {
        Self::new(vec![ComplexComponent {
            compound,
            combinator: None,
        }])
    }

    /// Stand-alone iff there is neither a leading nor a trailing combinator.
    #[must_use]
    pub fn is_stand_alone(&self) -> bool {
        self.leading_combinator.is_none() && self.trailing_combinator().is_none()
    }

    /// Relative iff there is no trailing combinator (a leading one is still
    /// permitted, e.g. `> .a .b` as the argument to `:has()`).
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.trailing_combinator().is_none()
    }

    /// The combinator trailing the last component, if any.
    #[must_use]
    pub fn trailing_combinator(&self) -> Option<Combinator> {
        self.components.last().and_then(|c| c.combinator)
    }

    /// The subject compound: the last component's compound selector, the
    /// actual element the whole chain matches.
    #[must_use]
    pub fn subject(&self) -> Option<&CompoundSelector> {
        self.components.last().map(|c| &c.compound)
    }

    /// The sum of every component's compound specificity.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        self.components.iter().map(|c| c.compound.specificity()).sum()
    }

    /// Whether this complex (or the original it was derived from) is marked
    /// as coming from a literal source selector, per the store's identity
    /// bookkeeping.
    #[must_use]
    pub(crate) fn origin_id(&self) -> Option<u64> {
        self.origin_id
    }
}

impl PartialEq for ComplexSelector {
    fn eq(&self, other: &Self) -> bool {
        self.leading_combinator == other.leading_combinator && self.components == other.components
    }
}

impl Eq for ComplexSelector {}

impl Hash for ComplexSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.leading_combinator.hash(state);
        self.components.hash(state);
    }
}

/// A comma-separated list of complex selectors, matching if any one of them
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorList {
    /// The branches of the list, in source order.
    pub complexes: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Builds a selector list, returning `None` if it has no branches.
    #[must_use]
    pub fn new(complexes: Vec<ComplexSelector>) -> Option<Self> {
        if complexes.is_empty() {
            None
        } else {
            Some(Self { complexes })
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => Ok(()),
            Self::None => write!(f, "|"),
            Self::Any => write!(f, "*|"),
            Self::Named(ns) => write!(f, "{ns}|"),
        }
    }
}

/// Per-selector-level specificity, per
/// [Selectors Level 4 § 17](https://www.w3.org/TR/selectors-4/#specificity-rules),
/// simplified to a single integer: the engine only ever compares
/// specificities for ordering, never inspects the (A, B, C) components
/// individually, so a flat `u32` with well-separated magnitudes per level
/// (id = 1_000_000, class/attribute/pseudo-class = 1_000, type = 1) is
/// equivalent and far simpler to carry around.
#[must_use]
pub fn specificity(simple: &SimpleSelector) -> u32 {
    match simple {
        SimpleSelector::Universal { .. } | SimpleSelector::Parent { .. } => 0,
        SimpleSelector::Type { .. } => 1,
        SimpleSelector::Class { .. }
        | SimpleSelector::Attribute { .. }
        | SimpleSelector::Placeholder { .. } => 1_000,
        SimpleSelector::Id { .. } => 1_000_000,
        SimpleSelector::Pseudo {
            normalized_name,
            is_class,
            selector,
            ..
        } => pseudo_specificity(normalized_name, *is_class, selector.as_deref()),
    }
}

fn pseudo_specificity(normalized_name: &str, is_class: bool, selector: Option<&SelectorList>) -> u32 {
    if !is_class {
        // Pseudo-elements behave like a type selector.
        return 1;
    }
    match normalized_name {
        // Per CSS, :where() always contributes zero specificity regardless
        // of its argument.
        "where" => 0,
        "not" | "is" | "matches" | "any" | "nth-child" | "nth-last-child" => {
            selector.map_or(1_000, |list| {
                list.complexes
                    .iter()
                    .map(ComplexSelector::specificity)
                    .max()
                    .unwrap_or(0)
            })
        }
        _ => 1_000,
    }
}
