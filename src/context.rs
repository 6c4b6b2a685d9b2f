//! Per-call conversion state.

use crate::diag::{Diagnostic, Diagnostics, Paths, Severity};
use crate::error::FlexError;
use crate::matcher::{Direction, StructPlan};
use crate::options::Options;
use autoflex_types::{StructType, Type};
use std::collections::HashMap;
use std::rc::Rc;

/// State threaded through one flatten or expand call.
///
/// Plans are cached per (source type, target type) for the duration of the
/// call only; nothing is shared between calls. Types are keyed by identity,
/// so two distinct struct types that share a name get separate plans.
pub(crate) struct Context<'a> {
    direction: Direction,
    options: &'a Options,
    diagnostics: Diagnostics,
    plans: HashMap<(*const StructType, *const StructType), Rc<StructPlan>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(direction: Direction, options: &'a Options) -> Self {
        Self {
            direction,
            options,
            diagnostics: Diagnostics::new(),
            plans: HashMap::new(),
        }
    }

    /// The field correspondence between two struct types.
    pub(crate) fn plan(&mut self, source: &StructType, target: &StructType) -> Rc<StructPlan> {
        let key: (*const StructType, *const StructType) = (source, target);
        if let Some(plan) = self.plans.get(&key) {
            return Rc::clone(plan);
        }
        let plan = Rc::new(StructPlan::build(
            source,
            target,
            self.options,
            self.direction,
        ));
        tracing::debug!(
            direction = %self.direction,
            source_type = %source.name,
            target_type = %target.name,
            matched = plan.correspondences.len(),
            "Built field correspondence"
        );
        self.plans.insert(key, Rc::clone(&plan));
        plan
    }

    /// Record an error and keep going.
    pub(crate) fn error(&mut self, at: &Paths, source_ty: &Type, target_ty: &Type, error: FlexError) {
        tracing::error!(
            direction = %self.direction,
            source_path = %at.source,
            target_path = %at.target,
            source_type = %source_ty,
            target_type = %target_ty,
            kind = %error.kind(),
            "{error}"
        );
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: error.to_string(),
            error: Some(error),
            source_path: at.source.clone(),
            target_path: at.target.clone(),
            source_type: source_ty.to_string(),
            target_type: target_ty.to_string(),
        });
    }

    pub(crate) fn warning(
        &mut self,
        at: &Paths,
        source_ty: &Type,
        target_ty: &Type,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::warn!(
            direction = %self.direction,
            source_path = %at.source,
            target_path = %at.target,
            source_type = %source_ty,
            target_type = %target_ty,
            "{message}"
        );
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            error: None,
            source_path: at.source.clone(),
            target_path: at.target.clone(),
            source_type: source_ty.to_string(),
            target_type: target_ty.to_string(),
        });
    }

    pub(crate) fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}
