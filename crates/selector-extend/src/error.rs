//! Error kinds raised by the extension engine.
//!
//! Grounded in the shape of `koala_browser::LoadError` (two flat variants,
//! a human message each) but expressed with `thiserror` instead of a
//! hand-rolled `Display` impl, since that dependency is already part of the
//! workspace and this is exactly the kind of small structured error enum it
//! exists for.

use crate::span::{Span, SpanLabel};

/// Everything that can go wrong while resolving `@extend` rules.
///
/// `OptionalUnmet` is deliberately not a variant here: an optional extend
/// whose target never matched anything is expected, ordinary control flow,
/// not a failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtendError {
    /// The target of an `@extend` is not a single compound selector made of
    /// classes, IDs, placeholders, and/or attribute selectors.
    #[error("invalid extend target: {reason}")]
    InvalidExtendTarget {
        /// What made the target invalid.
        reason: String,
        /// Where the target selector was written.
        span: Span,
        /// Additional context spans.
        additional_spans: Vec<SpanLabel>,
    },

    /// An extension attempted to cross from one media-query context into a
    /// complex selector that was registered under a different one.
    #[error("you may not @extend selectors across media queries")]
    CrossMediaExtend {
        /// Where the crossing `@extend` was written.
        span: Span,
        /// Additional context spans.
        additional_spans: Vec<SpanLabel>,
    },

    /// A parent-selector placeholder (`&`) appeared somewhere other than as
    /// the leading simple selector of a compound.
    #[error("the parent selector & may only appear at the start of a compound selector")]
    ParentInCompound {
        /// Where the offending `&` was written.
        span: Span,
        /// Additional context spans.
        additional_spans: Vec<SpanLabel>,
    },

    /// A mandatory (non-optional) `@extend` never matched any selector in
    /// the stylesheet.
    #[error("\"{target}\" failed to @extend anything and is not marked as optional")]
    MandatoryUnmet {
        /// The target that went unmatched, rendered for diagnostics.
        target: String,
        /// Where the unmatched `@extend` was written.
        span: Span,
        /// Additional context spans.
        additional_spans: Vec<SpanLabel>,
    },

    /// An operation was requested that this engine does not support, e.g.
    /// extending a selector list that contains the parent selector.
    #[error("unsupported operation: {reason}")]
    UnsupportedOperation {
        /// What was attempted.
        reason: String,
        /// Where the unsupported construct was written.
        span: Span,
        /// Additional context spans.
        additional_spans: Vec<SpanLabel>,
    },
}

impl ExtendError {
    /// Attaches an additional labeled span to this error and returns it,
    /// matching how extend propagation accumulates context (e.g. "the
    /// selector that declared this extend") as an error bubbles up through
    /// nested selector lists.
    #[must_use]
    pub fn with_additional_span(mut self, span: Span, label: impl Into<String>) -> Self {
        let spans = match &mut self {
            Self::InvalidExtendTarget { additional_spans, .. }
            | Self::CrossMediaExtend { additional_spans, .. }
            | Self::ParentInCompound { additional_spans, .. }
            | Self::MandatoryUnmet { additional_spans, .. }
            | Self::UnsupportedOperation { additional_spans, .. } => additional_spans,
        };
        spans.push(SpanLabel::new(span, label));
        self
    }

    /// The primary span this error is anchored to.
    #[must_use]
    pub const fn primary_span(&self) -> Span {
        match self {
            Self::InvalidExtendTarget { span, .. }
            | Self::CrossMediaExtend { span, .. }
            | Self::ParentInCompound { span, .. }
            | Self::MandatoryUnmet { span, .. }
            | Self::UnsupportedOperation { span, .. } => *span,
        }
    }
}

/// Result alias used throughout the engine.
pub type ExtendResult<T> = Result<T, ExtendError>;
