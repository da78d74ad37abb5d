/*
 * expand.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template expansion shared by both engines.
//!
//! A [`MergeContext`] holds, for one merge call, every template body with its
//! own JSON already applied plus the site-wide scalar table. The engines
//! differ only in how they fill it: the Normal engine merges raw templates
//! with their JSON, the PreProcess engine replays precomputed mappings.
//! Expansion itself alternates a slot merge pass and a placeholder pass until
//! the text stops changing.

use indexmap::IndexMap;

use crate::resolver::ViewResolver;
use crate::scanner::{
    PlaceholderSpan, fill_slots, next_scalar_placeholder, next_simple_placeholder,
    next_slotted_block, parse_slots,
};

/// Outcome of running expansion to a fixpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fixpoint {
    pub output: String,
    pub passes: usize,
    pub converged: bool,
}

/// Per-call merge state. Nothing here outlives one merge.
pub(crate) struct MergeContext<'a> {
    site: &'a str,
    view: Option<&'a str>,
    resolver: &'a ViewResolver,
    max_depth: usize,
    /// Template bodies after their own JSON merge, by template key.
    bodies: IndexMap<String, String>,
    /// Site-wide JSON scalars by lowercase key; the last write wins.
    scalars: IndexMap<String, String>,
}

impl<'a> MergeContext<'a> {
    pub fn new(
        site: &'a str,
        view: Option<&'a str>,
        resolver: &'a ViewResolver,
        max_depth: usize,
    ) -> Self {
        Self {
            site,
            view,
            resolver,
            max_depth,
            bodies: IndexMap::new(),
            scalars: IndexMap::new(),
        }
    }

    pub fn add_body(&mut self, key: impl Into<String>, body: String) {
        self.bodies.insert(key.into(), body);
    }

    pub fn add_scalar(&mut self, key: &str, value: String) {
        self.scalars.insert(key.to_lowercase(), value);
    }

    pub fn body(&self, key: &str) -> Option<&String> {
        self.bodies.get(key)
    }

    fn resolve(&self, name: &str) -> Option<&String> {
        self.resolver
            .get_template(self.site, name, &self.bodies, self.view, true)
    }

    fn scalar(&self, name: &str) -> Option<&String> {
        self.scalars.get(&name.to_lowercase())
    }

    /// Expand `content` until a whole pass changes nothing, at most
    /// `max_passes` passes.
    pub fn run(&self, content: String, max_passes: usize) -> Fixpoint {
        let mut result = content;
        for pass in 1..=max_passes {
            let merged = self.merge_slotted_templates(&result, 0);
            let merged = self.expand_placeholders(&merged, 0, &mut Vec::new());
            if merged == result {
                return Fixpoint {
                    output: result,
                    passes: pass,
                    converged: true,
                };
            }
            result = merged;
        }
        Fixpoint {
            output: result,
            passes: max_passes,
            converged: false,
        }
    }

    /// Replace every resolvable `{{#Name}}...{{/Name}}` block with the target
    /// body, its slots filled from the block's slot contents.
    ///
    /// An unresolved block stays; scanning resumes inside it so nested blocks
    /// still resolve.
    fn merge_slotted_templates(&self, content: &str, depth: usize) -> String {
        if depth > self.max_depth {
            return content.to_string();
        }

        let mut result = content.to_string();
        let mut pos = 0;
        while let Some(span) = next_slotted_block(&result, pos) {
            let Some(target) = self.resolve(&span.name) else {
                tracing::trace!(name = %span.name, "Slotted template not found");
                pos = span.inner_start;
                continue;
            };

            let values: Vec<(String, String)> = parse_slots(span.inner(&result))
                .into_iter()
                .map(|slot| {
                    let value = self.merge_slotted_templates(&slot.content, depth + 1);
                    let value = self.expand_placeholders(&value, depth + 1, &mut Vec::new());
                    (slot.slot_key, value)
                })
                .collect();

            let replacement = fill_slots(target, &values);
            result.replace_range(span.start..span.end, &replacement);
            pos = span.start + replacement.len();
        }
        result
    }

    /// Replace `{{Name}}` with the recursively expanded body of `Name`, or
    /// with a site scalar; replace `{{$key}}` with a site scalar.
    ///
    /// `active` holds the names currently being expanded; a name that refers
    /// back to one of them is left in place for a later pass.
    fn expand_placeholders(&self, content: &str, depth: usize, active: &mut Vec<String>) -> String {
        let mut result = content.to_string();
        let mut pos = 0;
        while let Some((span, scalar_only)) = self.next_reference(&result, pos) {
            let replacement = if scalar_only {
                self.scalar(&span.name).cloned()
            } else if let Some(body) = self.resolve(&span.name) {
                let name = span.name.to_lowercase();
                if depth >= self.max_depth || active.contains(&name) {
                    tracing::trace!(name = %span.name, depth, "Deferring recursive placeholder");
                    None
                } else {
                    active.push(name);
                    let expanded = self.expand_placeholders(body, depth + 1, active);
                    active.pop();
                    Some(expanded)
                }
            } else {
                self.scalar(&span.name).cloned()
            };

            match replacement {
                Some(text) => {
                    result.replace_range(span.start..span.end, &text);
                    pos = span.start + text.len();
                }
                None => pos = span.end,
            }
        }
        result
    }

    /// The next `{{Name}}` or `{{$key}}`, whichever starts first. The flag
    /// is set for `{{$key}}`.
    fn next_reference(&self, content: &str, from: usize) -> Option<(PlaceholderSpan, bool)> {
        let simple = next_simple_placeholder(content, from);
        let scalar = if self.scalars.is_empty() {
            None
        } else {
            next_scalar_placeholder(content, from)
        };
        match (simple, scalar) {
            (Some(simple), Some(scalar)) if scalar.start < simple.start => Some((scalar, true)),
            (Some(simple), _) => Some((simple, false)),
            (None, scalar) => scalar.map(|span| (span, true)),
        }
    }
}
