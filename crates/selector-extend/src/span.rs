//! Opaque source spans.
//!
//! The tokenizer and parser that would own a real source map are external
//! collaborators of this crate, not part of it. `Span` is deliberately thin:
//! enough for the engine to carry, compare, and attach to errors, not enough
//! to render a diagnostic on its own. Host integrations are expected to widen
//! this (or replace it outright) with whatever span type their parser uses.

/// A byte range into some source text whose identity this crate never
/// inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset, inclusive.
    pub start: u32,
    /// End offset, exclusive.
    pub end: u32,
}

impl Span {
    /// Builds a span from a `start..end` byte range.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A span annotated with a short human-readable label, e.g. `"parent
/// selector"` or `"outer selector"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLabel {
    /// The annotated span.
    pub span: Span,
    /// What the span represents in the error being reported.
    pub label: String,
}

impl SpanLabel {
    /// Builds a new labeled span.
    #[must_use]
    pub fn new(span: Span, label: impl Into<String>) -> Self {
        Self {
            span,
            label: label.into(),
        }
    }
}
