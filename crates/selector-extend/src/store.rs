//! The extension store: the stateful core that accumulates a stylesheet's
//! selectors and `@extend` rules and resolves them into final selector
//! lists.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use koala_common::warning::warn_once;

use crate::error::{ExtendError, ExtendResult};
use crate::modern::trim_modern_selectors;
use crate::selector::{
    ComplexComponent, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector,
};
use crate::span::Span;
use crate::trim::trim;
use crate::unify::{unify_compound, unify_complex};

/// An opaque tag distinguishing media-query contexts. This crate only ever
/// compares contexts for equality; building and rendering the query itself
/// is the host parser's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaContext(pub Rc<str>);

/// How an extend resolves selectors that already satisfied (part of) the
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendMode {
    /// The ordinary `@extend` behavior: the original selector is kept
    /// alongside every selector produced by an applicable extension.
    Normal,
    /// Like `Normal`, but a candidate combination of extensions is only
    /// used when it accounts for every extendable simple selector in the
    /// compound being extended, not just some of them. Used internally
    /// when propagating an extension through an existing extender.
    AllTargets,
    /// `selector-replace()` semantics: the original selector is dropped
    /// entirely in favor of whatever the extension(s) produce.
    Replace,
}

/// A single `@extend` rule: `extender` should also match whatever matches
/// `target`.
#[derive(Debug, Clone)]
pub struct Extension {
    /// The selector doing the extending.
    pub extender: ComplexSelector,
    /// The compound selector being extended.
    pub target: CompoundSelector,
    /// Where the `@extend` rule was written.
    pub span: Span,
    /// Whether this extend is allowed to match nothing (`@extend .x
    /// !optional`).
    pub is_optional: bool,
    /// The media-query context the extend was declared in, if any.
    pub media_context: Option<MediaContext>,
}

/// The result of merging every `@extend` declaration that shares the same
/// `(extender, target)` pair: an extension declared twice is mandatory if
/// either declaration was, and keeps every span it was declared at for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct MergedExtension {
    /// The representative extension (the first one declared).
    pub extension: Extension,
    /// Spans of every redeclaration beyond the first.
    pub additional_spans: Vec<Span>,
}

impl MergedExtension {
    fn merge_in(&mut self, other: Extension) {
        self.extension.is_optional &= other.is_optional;
        self.additional_spans.push(other.span);
    }
}

fn is_valid_extend_target_simple(simple: &SimpleSelector) -> bool {
    matches!(
        simple,
        SimpleSelector::Class { .. }
            | SimpleSelector::Id { .. }
            | SimpleSelector::Placeholder { .. }
            | SimpleSelector::Attribute { .. }
    )
}

fn contains_parent(compound: &CompoundSelector) -> bool {
    compound.selectors().iter().any(|s| matches!(s, SimpleSelector::Parent { .. }))
}

fn complex_contains_parent(complex: &ComplexSelector) -> bool {
    complex.components.iter().any(|c| contains_parent(&c.compound))
}

fn list_contains_parent(list: &SelectorList) -> bool {
    list.complexes.iter().any(complex_contains_parent)
}

/// An opaque handle to a registered selector list. Stable across mutation
/// of the store (unlike a raw index into a `Vec` the store might reorder),
/// used the way an arena index stands in for pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(usize);

/// An opaque handle to a registered extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ExtensionId(usize);

struct Cell {
    selectors: SelectorList,
    media_context: Option<MediaContext>,
    has_modern_pseudo: bool,
}

/// Bound on how many simultaneously-applicable extensions are combined via
/// a powerset search in [`Store::extend_compound`]. Past this, only
/// single-extension combinations are tried — pathological stylesheets with
/// a dozen extends matching the same compound are vanishingly rare, and the
/// powerset is exponential in this count.
const MAX_CANDIDATES_FOR_POWERSET: usize = 8;

/// The accumulated state needed to resolve `@extend` rules across an entire
/// stylesheet: every selector a rule was written with, every extend
/// declared against it, and enough bookkeeping to apply new extends
/// retroactively to selectors already registered (and vice versa).
pub struct Store {
    cells: Vec<Cell>,
    extensions: Vec<MergedExtension>,
    /// Maps `(target, extender)` to the index into `extensions` merging
    /// every declaration of that exact pair.
    extension_index: HashMap<(CompoundSelector, ComplexSelector), usize>,
    /// Maps a simple selector to every extension whose target compound
    /// contains it, for fast candidate lookup.
    extensions_by_target_simple: HashMap<SimpleSelector, Vec<ExtensionId>>,
    /// Maps a simple selector to every extension whose *extender* compound
    /// (the compound performing the extend) contains it — needed so a
    /// newly declared extension can also be woven into any existing
    /// extender that happens to contain its target, chaining `@extend`s.
    extensions_by_extender_simple: HashMap<SimpleSelector, Vec<ExtensionId>>,
    /// Every simple selector appearing anywhere in any registered cell,
    /// mapped to the cells containing it — used to find which selectors a
    /// newly declared extension must be retroactively applied to.
    selectors_by_simple: HashMap<SimpleSelector, HashSet<CellId>>,
    /// The maximum specificity any complex selector that introduced a given
    /// simple selector was declared with, recorded on first sight.
    source_specificity: HashMap<SimpleSelector, u32>,
    /// Identity tags of complex selectors that came directly from source
    /// text (as opposed to ones synthesized purely by extension), so they
    /// are never dropped by trimming.
    originals: HashSet<u64>,
    next_origin_id: u64,
    modern_pseudo_cells: HashSet<CellId>,
}

impl Store {
    /// Builds an empty, mutable store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            extensions: Vec::new(),
            extension_index: HashMap::new(),
            extensions_by_target_simple: HashMap::new(),
            extensions_by_extender_simple: HashMap::new(),
            selectors_by_simple: HashMap::new(),
            source_specificity: HashMap::new(),
            originals: HashSet::new(),
            next_origin_id: 0,
            modern_pseudo_cells: HashSet::new(),
        }
    }

    /// An empty, permanently-immutable store. Useful as a sentinel default
    /// for code paths that never expect to register any selectors.
    #[must_use]
    pub fn empty() -> Self {
        Self::new()
    }

    fn next_origin(&mut self) -> u64 {
        let id = self.next_origin_id;
        self.next_origin_id += 1;
        id
    }

    fn is_original(&self, complex: &ComplexSelector) -> bool {
        complex.origin_id().is_some_and(|id| self.originals.contains(&id))
    }

    fn tag_as_original(&mut self, complex: &mut ComplexSelector) {
        let id = self.next_origin();
        complex.origin_id = Some(id);
        self.originals.insert(id);
    }

    fn record_source_specificity(&mut self, complex: &ComplexSelector) {
        let specificity = complex.specificity();
        for component in &complex.components {
            for simple in component.compound.selectors() {
                let _ = self
                    .source_specificity
                    .entry(simple.clone())
                    .or_insert(specificity);
            }
        }
    }

    fn index_cell(&mut self, id: CellId, list: &SelectorList) {
        let mut has_modern = false;
        for complex in &list.complexes {
            for component in &complex.components {
                for simple in component.compound.selectors() {
                    self.index_simple(id, simple, &mut has_modern);
                }
            }
        }
        if has_modern {
            let _ = self.modern_pseudo_cells.insert(id);
            self.cells[id.0].has_modern_pseudo = true;
        }
    }

    /// Registers `simple` (and, recursing into selector-pseudos, every
    /// simple selector nested inside its argument list) against `id`.
    fn index_simple(&mut self, id: CellId, simple: &SimpleSelector, has_modern: &mut bool) {
        let _ = self.selectors_by_simple.entry(simple.clone()).or_default().insert(id);
        if let SimpleSelector::Pseudo { selector: Some(inner), .. } = simple {
            *has_modern = true;
            for complex in &inner.complexes {
                for component in &complex.components {
                    for nested in component.compound.selectors() {
                        self.index_simple(id, nested, has_modern);
                    }
                }
            }
        }
    }

    /// Registers a rule's selector list, applying every extension already
    /// known to the store. Returns a handle usable with
    /// [`Store::selector_list`] to read back the (possibly extended)
    /// result, and raises [`ExtendError::ParentInCompound`] if the list
    /// still contains an unresolved `&`.
    pub fn add_selector(
        &mut self,
        mut list: SelectorList,
        media_context: Option<MediaContext>,
    ) -> ExtendResult<CellId> {
        if list_contains_parent(&list) {
            return Err(ExtendError::ParentInCompound {
                span: Span::default(),
                additional_spans: Vec::new(),
            });
        }

        for complex in &mut list.complexes {
            self.tag_as_original(complex);
        }
        for complex in &list.complexes {
            self.record_source_specificity(complex);
        }

        let extensions = self.extension_map();
        let extended = Self::extend_list_with(&list, &extensions, ExtendMode::Normal, None, &|c| {
            c.origin_id().is_some_and(|id| self.originals.contains(&id))
        })?
        .unwrap_or(list);

        let id = CellId(self.cells.len());
        self.cells.push(Cell {
            selectors: extended.clone(),
            media_context,
            has_modern_pseudo: false,
        });
        self.index_cell(id, &extended);
        Ok(id)
    }

    /// Reads back the (possibly extended) selector list registered under
    /// `id`.
    #[must_use]
    pub fn selector_list(&self, id: CellId) -> &SelectorList {
        &self.cells[id.0].selectors
    }

    /// Declares a single `@extend` rule and applies it retroactively to
    /// every selector already registered, and to every existing extender
    /// whose compound contains `target`'s simples (so `@extend` chains
    /// resolve transitively). See [`Store::add_extensions`] for declaring
    /// several at once.
    pub fn add_extension(
        &mut self,
        extender: ComplexSelector,
        target: CompoundSelector,
        span: Span,
        is_optional: bool,
        media_context: Option<MediaContext>,
    ) -> ExtendResult<()> {
        self.add_extensions(vec![(extender, target, span, is_optional, media_context)])
    }

    /// Declares several `@extend` rules as a batch, applying each
    /// retroactively. Batching matters only for efficiency of the
    /// retroactive passes, not for semantics: the result is the same as
    /// calling [`Store::add_extension`] once per entry.
    pub fn add_extensions(
        &mut self,
        declarations: Vec<(ComplexSelector, CompoundSelector, Span, bool, Option<MediaContext>)>,
    ) -> ExtendResult<()> {
        let mut new_ids = Vec::new();
        for (extender, target, span, is_optional, media_context) in declarations {
            if complex_contains_parent(&extender) || contains_parent(&target) {
                return Err(ExtendError::ParentInCompound {
                    span,
                    additional_spans: Vec::new(),
                });
            }
            if let Some(bad) = target.selectors().iter().find(|s| !is_valid_extend_target_simple(s)) {
                return Err(ExtendError::InvalidExtendTarget {
                    reason: format!("{bad:?} cannot be extended"),
                    span,
                    additional_spans: Vec::new(),
                });
            }

            let key = (target.clone(), extender.clone());
            let id = if let Some(&idx) = self.extension_index.get(&key) {
                let existing_context = &self.extensions[idx].extension.media_context;
                if let (Some(a), Some(b)) = (existing_context, &media_context) {
                    if a != b {
                        return Err(ExtendError::CrossMediaExtend {
                            span,
                            additional_spans: Vec::new(),
                        });
                    }
                }
                let ext = Extension {
                    extender: extender.clone(),
                    target: target.clone(),
                    span,
                    is_optional,
                    media_context: media_context.clone(),
                };
                self.extensions[idx].merge_in(ext);
                idx
            } else {
                let idx = self.extensions.len();
                self.extensions.push(MergedExtension {
                    extension: Extension {
                        extender: extender.clone(),
                        target: target.clone(),
                        span,
                        is_optional,
                        media_context: media_context.clone(),
                    },
                    additional_spans: Vec::new(),
                });
                let _ = self.extension_index.insert(key, idx);
                idx
            };

            for simple in target.selectors() {
                let _ = self
                    .extensions_by_target_simple
                    .entry(simple.clone())
                    .or_default()
                    .push(ExtensionId(id));
            }
            for component in &extender.components {
                for simple in component.compound.selectors() {
                    let _ = self
                        .extensions_by_extender_simple
                        .entry(simple.clone())
                        .or_default()
                        .push(ExtensionId(id));
                }
            }
            new_ids.push(ExtensionId(id));
        }

        self.extend_existing_selectors(&new_ids)?;
        self.extend_existing_extensions(&new_ids)?;
        Ok(())
    }

    fn extension_map(&self) -> Vec<MergedExtension> {
        self.extensions.clone()
    }

    fn extend_existing_selectors(&mut self, new_ids: &[ExtensionId]) -> ExtendResult<()> {
        let targets: HashSet<SimpleSelector> = new_ids
            .iter()
            .flat_map(|id| self.extensions[id.0].extension.target.selectors().iter().cloned())
            .collect();
        let mut affected: HashSet<CellId> = HashSet::new();
        for simple in &targets {
            if let Some(cells) = self.selectors_by_simple.get(simple) {
                affected.extend(cells.iter().copied());
            }
        }

        let origin_span = new_ids.first().map(|id| self.extensions[id.0].extension.span);
        let extensions = self.extension_map();
        for id in affected {
            let cell = &self.cells[id.0];
            let is_original = |c: &ComplexSelector| self.is_original(c);
            let extended = Self::extend_list_with(&cell.selectors, &extensions, ExtendMode::Normal, None, &is_original)
                .map_err(|e| Self::enrich_with_origin(e, origin_span))?;
            if let Some(extended) = extended {
                self.cells[id.0].selectors = extended.clone();
                self.index_cell(id, &extended);
            }
        }
        Ok(())
    }

    /// Attaches `origin_span` (the span of the `@extend` declaration that
    /// triggered this retroactive propagation) to a propagated error, so a
    /// diagnostic points at both the failing rewrite and the declaration
    /// that caused it. Skipped when it would just duplicate the error's own
    /// primary span.
    fn enrich_with_origin(error: ExtendError, origin_span: Option<Span>) -> ExtendError {
        match origin_span {
            Some(span) if span != error.primary_span() => {
                error.with_additional_span(span, "the @extend that triggered this re-extension")
            }
            _ => error,
        }
    }

    fn extend_existing_extensions(&mut self, new_ids: &[ExtensionId]) -> ExtendResult<()> {
        let targets: HashSet<SimpleSelector> = new_ids
            .iter()
            .flat_map(|id| self.extensions[id.0].extension.target.selectors().iter().cloned())
            .collect();
        let mut affected: HashSet<usize> = HashSet::new();
        for simple in &targets {
            if let Some(exts) = self.extensions_by_extender_simple.get(simple) {
                affected.extend(exts.iter().map(|e| e.0));
            }
        }
        // Never re-extend an extension against itself.
        for id in new_ids {
            let _ = affected.remove(&id.0);
        }

        let origin_span = new_ids.first().map(|id| self.extensions[id.0].extension.span);
        let extensions = self.extension_map();
        for idx in affected {
            let extender = self.extensions[idx].extension.extender.clone();
            let list = SelectorList { complexes: vec![extender] };
            let extended = Self::extend_list_with(&list, &extensions, ExtendMode::AllTargets, None, &|_| false)
                .map_err(|e| Self::enrich_with_origin(e, origin_span))?;
            if let Some(extended) = extended {
                if let Some(first) = extended.complexes.into_iter().next() {
                    self.extensions[idx].extension.extender = first;
                }
            }
        }
        Ok(())
    }

    /// Runs the one-shot extend algorithm matching the `selector-extend()`
    /// function: rewrites `selector`, replacing any compound matching
    /// `target` with the union of that compound and `extender`.
    /// Independent of anything registered in the store.
    pub fn extend(
        &self,
        selector: &SelectorList,
        target: &SelectorList,
        extender: &SelectorList,
        mode: ExtendMode,
        span: Option<Span>,
    ) -> ExtendResult<Option<SelectorList>> {
        let synthetic = Self::synthetic_extensions(target, extender, span)?;
        Self::extend_list_with(selector, &synthetic, mode, span, &|_| false)
    }

    /// Runs the one-shot extend algorithm in `Replace` mode, matching
    /// `selector-replace()`.
    pub fn replace(
        &self,
        selector: &SelectorList,
        target: &SelectorList,
        extender: &SelectorList,
        span: Option<Span>,
    ) -> ExtendResult<Option<SelectorList>> {
        self.extend(selector, target, extender, ExtendMode::Replace, span)
    }

    fn synthetic_extensions(
        target: &SelectorList,
        extender: &SelectorList,
        span: Option<Span>,
    ) -> ExtendResult<Vec<MergedExtension>> {
        let mut out = Vec::new();
        for target_complex in &target.complexes {
            let Some(target_compound) = target_complex.subject() else { continue };
            if target_complex.components.len() != 1 || !target_complex.is_stand_alone() {
                return Err(ExtendError::InvalidExtendTarget {
                    reason: "selector-extend()'s target must be a single compound selector".to_owned(),
                    span: span.unwrap_or_default(),
                    additional_spans: Vec::new(),
                });
            }
            if let Some(bad) = target_compound
                .selectors()
                .iter()
                .find(|s| !is_valid_extend_target_simple(s))
            {
                return Err(ExtendError::InvalidExtendTarget {
                    reason: format!("{bad:?} cannot be extended"),
                    span: span.unwrap_or_default(),
                    additional_spans: Vec::new(),
                });
            }
            for extender_complex in &extender.complexes {
                out.push(MergedExtension {
                    extension: Extension {
                        extender: extender_complex.clone(),
                        target: target_compound.clone(),
                        span: span.unwrap_or_default(),
                        is_optional: true,
                        media_context: None,
                    },
                    additional_spans: Vec::new(),
                });
            }
        }
        Ok(out)
    }

    /// Returns every registered extension whose target compound equals
    /// `target` exactly.
    #[must_use]
    pub fn extensions_where_target(&self, target: &CompoundSelector) -> Vec<&Extension> {
        self.extensions
            .iter()
            .filter(|m| &m.extension.target == target)
            .map(|m| &m.extension)
            .collect()
    }

    /// Verifies every mandatory (non-optional) extension matched at least
    /// one registered selector. Call once after a stylesheet's selectors
    /// and extends have all been registered.
    pub fn check_unmet(&self) -> ExtendResult<()> {
        for merged in &self.extensions {
            let ext = &merged.extension;
            if ext.is_optional {
                continue;
            }
            let matched = ext
                .target
                .selectors()
                .iter()
                .all(|s| self.selectors_by_simple.get(s).is_some_and(|cells| !cells.is_empty()));
            if !matched {
                return Err(ExtendError::MandatoryUnmet {
                    target: format!("{:?}", ext.target.selectors()),
                    span: ext.span,
                    additional_spans: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// Deep-clones the store. Unlike a plain `Clone` derive would, this
    /// doesn't need special handling: every field here is already owned
    /// data, not a reference into something external.
    #[must_use]
    pub fn clone_store(&self) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .map(|c| Cell {
                    selectors: c.selectors.clone(),
                    media_context: c.media_context.clone(),
                    has_modern_pseudo: c.has_modern_pseudo,
                })
                .collect(),
            extensions: self.extensions.clone(),
            extension_index: self.extension_index.clone(),
            extensions_by_target_simple: self.extensions_by_target_simple.clone(),
            extensions_by_extender_simple: self.extensions_by_extender_simple.clone(),
            selectors_by_simple: self.selectors_by_simple.clone(),
            source_specificity: self.source_specificity.clone(),
            originals: self.originals.clone(),
            next_origin_id: self.next_origin_id,
            modern_pseudo_cells: self.modern_pseudo_cells.clone(),
        }
    }

    /// Runs the modern-pseudo trim visitor over every registered cell that
    /// contains a `:is()`/`:where()`/`:has()`-style pseudo, in place.
    pub fn trim_modern_selectors(&mut self) {
        let is_original = |c: &ComplexSelector| self.is_original(c);
        let ids: Vec<CellId> = self.modern_pseudo_cells.iter().copied().collect();
        for id in ids {
            let trimmed = trim_modern_selectors(&self.cells[id.0].selectors, &is_original);
            self.cells[id.0].selectors = trimmed;
        }
    }

    // ---- core recursive algorithm -------------------------------------

    fn extend_list_with(
        list: &SelectorList,
        extensions: &[MergedExtension],
        mode: ExtendMode,
        span: Option<Span>,
        is_original: &impl Fn(&ComplexSelector) -> bool,
    ) -> ExtendResult<Option<SelectorList>> {
        let mut changed = false;
        let mut result = Vec::new();
        for complex in &list.complexes {
            match Self::extend_complex(complex, extensions, mode, span)? {
                Some(expanded) => {
                    changed = true;
                    result.extend(expanded);
                }
                None => result.push(complex.clone()),
            }
        }
        if !changed {
            if extensions.iter().any(|e| !e.extension.is_optional) {
                warn_once(
                    "extend",
                    "an @extend rule matched nothing in this selector list",
                );
            }
            return Ok(None);
        }
        let trimmed = trim(&result, is_original, false);
        Ok(SelectorList::new(trimmed))
    }

    fn index_extensions(extensions: &[MergedExtension]) -> HashMap<SimpleSelector, Vec<usize>> {
        let mut index: HashMap<SimpleSelector, Vec<usize>> = HashMap::new();
        for (i, merged) in extensions.iter().enumerate() {
            for simple in merged.extension.target.selectors() {
                index.entry(simple.clone()).or_default().push(i);
            }
        }
        index
    }

    fn extend_complex(
        complex: &ComplexSelector,
        extensions: &[MergedExtension],
        mode: ExtendMode,
        span: Option<Span>,
    ) -> ExtendResult<Option<Vec<ComplexSelector>>> {
        let index = Self::index_extensions(extensions);
        let mut any_changed = false;
        let mut options: Vec<Vec<ComplexSelector>> = Vec::with_capacity(complex.components.len());

        for component in &complex.components {
            match Self::extend_compound(&component.compound, extensions, &index, mode, span)? {
                Some(alts) => {
                    any_changed = true;
                    options.push(alts);
                }
                None => {
                    options.push(vec![ComplexSelector::new(vec![ComplexComponent {
                        compound: component.compound.clone(),
                        combinator: None,
                    }])]);
                }
            }
        }

        if !any_changed {
            return Ok(None);
        }

        let mut prefixes: Vec<Vec<ComplexComponent>> = vec![Vec::new()];
        for (i, component) in complex.components.iter().enumerate() {
            let mut next_prefixes = Vec::new();
            for prefix in &prefixes {
                for alt in &options[i] {
                    if alt.components.len() == 1 {
                        let mut extended = prefix.clone();
                        extended.push(ComplexComponent {
                            compound: alt.components[0].compound.clone(),
                            combinator: component.combinator,
                        });
                        next_prefixes.push(extended);
                    } else {
                        let ancestors = alt.components[..alt.components.len() - 1].to_vec();
                        let Some(woven) = crate::weave::weave(vec![prefix.clone(), ancestors], span, false)
                        else {
                            continue;
                        };
                        for mut w in woven {
                            w.push(ComplexComponent {
                                compound: alt.components.last().expect("non-empty alt").compound.clone(),
                                combinator: component.combinator,
                            });
                            next_prefixes.push(w);
                        }
                    }
                }
            }
            prefixes = next_prefixes;
        }

        let results = prefixes
            .into_iter()
            .map(|components| ComplexSelector {
                leading_combinator: complex.leading_combinator,
                components,
                line_break: complex.line_break,
                origin_id: None,
            })
            .collect::<Vec<_>>();

        if results.is_empty() {
            Ok(None)
        } else {
            Ok(Some(results))
        }
    }

    fn extend_compound(
        compound: &CompoundSelector,
        extensions: &[MergedExtension],
        index: &HashMap<SimpleSelector, Vec<usize>>,
        mode: ExtendMode,
        span: Option<Span>,
    ) -> ExtendResult<Option<Vec<ComplexSelector>>> {
        let mut pseudo_changed = false;
        let mut base_selectors: Vec<SimpleSelector> = Vec::with_capacity(compound.selectors().len());
        for simple in compound.selectors() {
            match Self::extend_pseudo(simple, extensions, span)? {
                Some(replacements) => {
                    pseudo_changed = true;
                    base_selectors.extend(replacements);
                }
                None => base_selectors.push(simple.clone()),
            }
        }
        let base_compound = CompoundSelector::from_non_empty(base_selectors);

        let mut candidate_ids: Vec<usize> = Vec::new();
        let mut seen = HashSet::new();
        for simple in base_compound.selectors() {
            let Some(ids) = index.get(simple) else { continue };
            for &i in ids {
                let target = &extensions[i].extension.target;
                if seen.insert(i) && target.selectors().iter().all(|t| base_compound.selectors().contains(t)) {
                    candidate_ids.push(i);
                }
            }
        }
        if candidate_ids.is_empty() {
            return if pseudo_changed {
                Ok(Some(vec![ComplexSelector::from_compound(base_compound)]))
            } else {
                Ok(None)
            };
        }

        let extendable_in_compound: HashSet<&SimpleSelector> = base_compound
            .selectors()
            .iter()
            .filter(|s| is_valid_extend_target_simple(s))
            .collect();

        let mut fragments = Vec::new();
        for subset in Self::candidate_subsets(candidate_ids.len()) {
            let ids: Vec<usize> = subset.iter().map(|&j| candidate_ids[j]).collect();
            let covered: HashSet<&SimpleSelector> = ids
                .iter()
                .flat_map(|&i| extensions[i].extension.target.selectors().iter())
                .collect();

            if mode == ExtendMode::AllTargets && covered != extendable_in_compound {
                continue;
            }

            let remaining: Vec<SimpleSelector> = base_compound
                .selectors()
                .iter()
                .filter(|s| !covered.contains(s))
                .cloned()
                .collect();

            let extender_complexes: Vec<ComplexSelector> =
                ids.iter().map(|&i| extensions[i].extension.extender.clone()).collect();
            let Some(unified) = unify_complex(&extender_complexes, span) else {
                continue;
            };

            for mut candidate in unified {
                if !remaining.is_empty() {
                    let Some(subject) = candidate.subject().cloned() else { continue };
                    match unify_compound(&subject, &CompoundSelector::from_non_empty(remaining.clone())) {
                        Some(new_subject) => {
                            if let Some(last) = candidate.components.last_mut() {
                                last.compound = new_subject;
                            }
                        }
                        None => {
                            if remaining.iter().any(|s| matches!(s, SimpleSelector::Placeholder { .. })) {
                                return Err(ExtendError::UnsupportedOperation {
                                    reason: "a placeholder selector cannot be unified outside its own compound"
                                        .to_owned(),
                                    span: span.unwrap_or_default(),
                                    additional_spans: Vec::new(),
                                });
                            }
                            continue;
                        }
                    }
                }
                fragments.push(candidate);
            }
        }

        if fragments.is_empty() {
            return if pseudo_changed {
                Ok(Some(vec![ComplexSelector::from_compound(base_compound)]))
            } else {
                Ok(None)
            };
        }

        if mode != ExtendMode::Replace {
            fragments.push(ComplexSelector::from_compound(base_compound));
        }

        Ok(Some(fragments))
    }

    /// Recurses into a selector-pseudo's nested argument list, applying
    /// `extensions` within it. Returns `None` when `simple` isn't a
    /// selector-pseudo or nothing inside it changed. Otherwise returns the
    /// replacement simple selector(s) that should take `simple`'s place in
    /// the enclosing compound — ordinarily exactly one rewritten pseudo, but
    /// `:not()` may expand to several (see [`Self::extend_not_pseudo`]).
    fn extend_pseudo(
        simple: &SimpleSelector,
        extensions: &[MergedExtension],
        span: Option<Span>,
    ) -> ExtendResult<Option<Vec<SimpleSelector>>> {
        let SimpleSelector::Pseudo {
            name,
            normalized_name,
            is_class,
            argument,
            selector: Some(inner),
            span: pseudo_span,
        } = simple
        else {
            return Ok(None);
        };

        if normalized_name.as_ref() == "not" {
            return Self::extend_not_pseudo(
                name,
                normalized_name,
                *is_class,
                argument,
                inner,
                *pseudo_span,
                extensions,
                span,
            );
        }

        let Some(extended) = Self::extend_list_with(inner, extensions, ExtendMode::Normal, span, &|_| false)? else {
            return Ok(None);
        };

        Ok(Some(vec![SimpleSelector::Pseudo {
            name: name.clone(),
            normalized_name: normalized_name.clone(),
            is_class: *is_class,
            argument: argument.clone(),
            selector: Some(Rc::new(extended)),
            span: *pseudo_span,
        }]))
    }

    /// `:not()` combines its alternatives via conjunction, not disjunction:
    /// extending `:not(.a)` with `.x` must produce `:not(.a):not(.x)`, never
    /// `:not(.a, .x)` (which would mean "not .a or .x", the wrong semantics).
    /// So when the original argument was a single selector (no comma list),
    /// each alternative produced by extending it becomes its own `:not()`,
    /// all applied to the same compound. A genuine comma list argument
    /// (already a disjunction) stays a single `:not()` with the extended
    /// branches flattened back into one list.
    #[allow(clippy::too_many_arguments)]
    fn extend_not_pseudo(
        name: &Rc<str>,
        normalized_name: &Rc<str>,
        is_class: bool,
        argument: &Option<Rc<str>>,
        inner: &SelectorList,
        pseudo_span: Option<Span>,
        extensions: &[MergedExtension],
        span: Option<Span>,
    ) -> ExtendResult<Option<Vec<SimpleSelector>>> {
        let had_list = inner.complexes.len() > 1;
        let mut any_changed = false;
        let mut groups: Vec<Vec<ComplexSelector>> = Vec::with_capacity(inner.complexes.len());
        for complex in &inner.complexes {
            match Self::extend_complex(complex, extensions, ExtendMode::Normal, span)? {
                Some(alts) => {
                    any_changed = true;
                    groups.push(alts);
                }
                None => groups.push(vec![complex.clone()]),
            }
        }
        if !any_changed {
            return Ok(None);
        }

        let make_pseudo = |complexes: Vec<ComplexSelector>| SimpleSelector::Pseudo {
            name: name.clone(),
            normalized_name: normalized_name.clone(),
            is_class,
            argument: argument.clone(),
            selector: Some(Rc::new(SelectorList { complexes })),
            span: pseudo_span,
        };

        if had_list {
            let flat: Vec<ComplexSelector> = groups.into_iter().flatten().collect();
            Ok(Some(vec![make_pseudo(flat)]))
        } else {
            let alts = groups.into_iter().next().unwrap_or_default();
            Ok(Some(alts.into_iter().map(|c| make_pseudo(vec![c])).collect()))
        }
    }

    fn candidate_subsets(n: usize) -> Vec<Vec<usize>> {
        let bounded = n.min(MAX_CANDIDATES_FOR_POWERSET);
        if bounded < n {
            warn_once(
                "extend",
                "more than 8 simultaneously-applicable @extend rules on one compound; \
                 only single-extension combinations will be tried",
            );
            return (0..n).map(|i| vec![i]).collect();
        }
        let mut subsets = Vec::new();
        for mask in 1..(1_u32 << bounded) {
            let mut subset = Vec::new();
            for i in 0..bounded {
                if mask & (1 << i) != 0 {
                    subset.push(i);
                }
            }
            subsets.push(subset);
        }
        subsets
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
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

    fn compound(simples: Vec<SimpleSelector>) -> CompoundSelector {
        CompoundSelector::from_non_empty(simples)
    }

    fn list(complexes: Vec<ComplexSelector>) -> SelectorList {
        SelectorList { complexes }
    }

    #[test]
    fn extend_adds_matching_extender_alongside_original() {
        let mut store = Store::new();
        let base = store
            .add_selector(
                list(vec![ComplexSelector::from_compound(compound(vec![class("a")]))]),
                None,
            )
            .unwrap();

        store
            .add_extension(
                ComplexSelector::from_compound(compound(vec![class("b")])),
                compound(vec![class("a")]),
                Span::default(),
                false,
                None,
            )
            .unwrap();

        let result = store.selector_list(base);
        assert_eq!(result.complexes.len(), 2);
    }

    #[test]
    fn mandatory_unmet_extend_raises_error() {
        let mut store = Store::new();
        store
            .add_extension(
                ComplexSelector::from_compound(compound(vec![class("b")])),
                compound(vec![class("a")]),
                Span::default(),
                false,
                None,
            )
            .unwrap();
        assert!(store.check_unmet().is_err());
    }

    #[test]
    fn optional_unmet_extend_is_not_an_error() {
        let mut store = Store::new();
        store
            .add_extension(
                ComplexSelector::from_compound(compound(vec![class("b")])),
                compound(vec![class("a")]),
                Span::default(),
                true,
                None,
            )
            .unwrap();
        assert!(store.check_unmet().is_ok());
    }

    #[test]
    fn self_loop_extend_does_not_infinitely_recurse() {
        let mut store = Store::new();
        let base = store
            .add_selector(
                list(vec![ComplexSelector::from_compound(compound(vec![class("a")]))]),
                None,
            )
            .unwrap();
        // `.a { @extend .a; }` — a selector extending its own target.
        store
            .add_extension(
                ComplexSelector::from_compound(compound(vec![class("a")])),
                compound(vec![class("a")]),
                Span::default(),
                true,
                None,
            )
            .unwrap();
        let result = store.selector_list(base);
        assert_eq!(result.complexes.len(), 1);
    }

    #[test]
    fn invalid_extend_target_is_rejected() {
        let mut store = Store::new();
        let err = store
            .add_extension(
                ComplexSelector::from_compound(compound(vec![class("b")])),
                compound(vec![SimpleSelector::Type {
                    name: crate::selector::QualifiedName {
                        name: Rc::from("div"),
                        namespace: crate::selector::Namespace::Default,
                    },
                    span: None,
                }]),
                Span::default(),
                false,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ExtendError::InvalidExtendTarget { .. }));
    }

    #[test]
    fn replace_drops_the_original_compound() {
        let store = Store::new();
        let selector = list(vec![ComplexSelector::from_compound(compound(vec![class("a")]))]);
        let target = list(vec![ComplexSelector::from_compound(compound(vec![class("a")]))]);
        let extender = list(vec![ComplexSelector::from_compound(compound(vec![class("b")]))]);
        let result = store.replace(&selector, &target, &extender, None).unwrap().unwrap();
        assert_eq!(result.complexes.len(), 1);
        assert_eq!(result.complexes[0].subject().unwrap().selectors(), [class("b")]);
    }
}
