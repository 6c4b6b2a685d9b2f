//! Field correspondence between a source and a target struct type.
//!
//! For every exported source field the matcher tries, in order:
//!
//! 1. Exact name equality
//! 2. Equality after trimming the configured prefix/suffix (source, target, both)
//! 3. Case-insensitive equality
//! 4. Singular/plural equivalence
//!
//! The first strategy that finds a target wins. When two source fields land on
//! the same target field, the stronger strategy keeps it and equal strength goes
//! to the earlier source field.

use crate::options::Options;
use crate::plural;
use autoflex_types::{FieldDirectives, FieldLocator, StructType, VisibleField};
use std::fmt;

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Service model → resource model
    Flatten,
    /// Resource model → service model
    Expand,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flatten => f.write_str("flatten"),
            Self::Expand => f.write_str("expand"),
        }
    }
}

/// Why a source field was paired with a target field, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchReason {
    Exact,
    AffixTrimmed,
    CaseInsensitive,
    Plural,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::AffixTrimmed => "prefix/suffix trimmed",
            Self::CaseInsensitive => "case-insensitive",
            Self::Plural => "singular/plural",
        };
        f.write_str(s)
    }
}

/// One side of a field correspondence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub name: String,
    pub locator: FieldLocator,
}

/// A matched (source field, target field) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence {
    pub source: FieldRef,
    pub target: FieldRef,
    pub reason: MatchReason,
    /// Directives of the resource-side field
    pub directives: FieldDirectives,
}

/// The field correspondence for one (source type, target type) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructPlan {
    pub source_type: String,
    pub target_type: String,
    pub correspondences: Vec<Correspondence>,
}

impl StructPlan {
    /// Match the fields of `source` against the fields of `target`.
    pub fn build(
        source: &StructType,
        target: &StructType,
        options: &Options,
        direction: Direction,
    ) -> Self {
        let ignored = options.ignored_field_names();
        let source_fields = source.visible_fields();
        let target_fields: Vec<VisibleField<'_>> = target
            .visible_fields()
            .into_iter()
            .filter(|f| !(direction == Direction::Flatten && f.directives.no_flatten))
            .collect();

        let mut candidates: Vec<(usize, usize, MatchReason)> = Vec::new();
        for (si, field) in source_fields.iter().enumerate() {
            if ignored.iter().any(|name| name == field.name) {
                tracing::debug!(
                    source_type = %source.name,
                    source_field = field.name,
                    "Skipping ignored field"
                );
                continue;
            }
            match find_target(field.name, &target_fields, options) {
                Some((ti, reason)) => candidates.push((si, ti, reason)),
                None => tracing::debug!(
                    source_type = %source.name,
                    target_type = %target.name,
                    source_field = field.name,
                    "No corresponding target field, skipping"
                ),
            }
        }

        // Strongest reason per target; ties go to the earlier source field.
        let mut claims: Vec<Option<(usize, MatchReason)>> = vec![None; target_fields.len()];
        for &(si, ti, reason) in &candidates {
            match claims[ti] {
                Some((_, held)) if held <= reason => {}
                _ => claims[ti] = Some((si, reason)),
            }
        }

        let mut correspondences = Vec::new();
        for &(si, ti, reason) in &candidates {
            let (s, t) = (&source_fields[si], &target_fields[ti]);
            if claims[ti].map(|(winner, _)| winner) != Some(si) {
                tracing::debug!(
                    source_field = s.name,
                    target_field = t.name,
                    "Target field already claimed by a stronger match, skipping"
                );
                continue;
            }
            let directives = match direction {
                Direction::Flatten => t.directives.clone(),
                Direction::Expand => s.directives.clone(),
            };
            correspondences.push(Correspondence {
                source: FieldRef {
                    name: s.name.to_string(),
                    locator: s.locator,
                },
                target: FieldRef {
                    name: t.name.to_string(),
                    locator: t.locator,
                },
                reason,
                directives,
            });
        }

        Self {
            source_type: source.name.clone(),
            target_type: target.name.clone(),
            correspondences,
        }
    }

    /// The correspondence for a source field, if any.
    pub fn for_source(&self, name: &str) -> Option<&Correspondence> {
        self.correspondences.iter().find(|c| c.source.name == name)
    }
}

fn find_target(
    name: &str,
    targets: &[VisibleField<'_>],
    options: &Options,
) -> Option<(usize, MatchReason)> {
    if let Some(i) = targets.iter().position(|t| t.name == name) {
        return Some((i, MatchReason::Exact));
    }
    if options.field_name_prefix.is_some() || options.field_name_suffix.is_some() {
        if let Some(i) = targets.iter().position(|t| affix_equal(name, t.name, options)) {
            return Some((i, MatchReason::AffixTrimmed));
        }
    }
    if let Some(i) = targets.iter().position(|t| t.name.eq_ignore_ascii_case(name)) {
        return Some((i, MatchReason::CaseInsensitive));
    }
    if let Some(i) = targets.iter().position(|t| plural::equivalent(name, t.name)) {
        return Some((i, MatchReason::Plural));
    }
    None
}

/// Equality after trimming the prefix/suffix from the source, the target, or both.
fn affix_equal(source: &str, target: &str, options: &Options) -> bool {
    let prefix = options.field_name_prefix.as_deref().unwrap_or("");
    let suffix = options.field_name_suffix.as_deref().unwrap_or("");
    let trimmed_source = trim_affixes(source, prefix, suffix);
    let trimmed_target = trim_affixes(target, prefix, suffix);

    trimmed_source.is_some_and(|s| s == target)
        || trimmed_target.is_some_and(|t| t == source)
        || matches!((trimmed_source, trimmed_target), (Some(s), Some(t)) if s == t)
}

/// `name` with the prefix and suffix removed, if either was present.
fn trim_affixes<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let mut trimmed = name;
    if !prefix.is_empty() {
        trimmed = trimmed.strip_prefix(prefix).unwrap_or(trimmed);
    }
    if !suffix.is_empty() {
        trimmed = trimmed.strip_suffix(suffix).unwrap_or(trimmed);
    }
    (trimmed.len() < name.len() && !trimmed.is_empty()).then_some(trimmed)
}
