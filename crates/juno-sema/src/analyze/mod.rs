//! The pre-analysis and analysis passes
//!
//! `analyze` runs both passes over a compilation unit. Pre-analysis (in
//! [`pre`]) declares type skeletons and member headers; analysis (split
//! across [`stmt`] and [`expr`]) consumes method bodies, returning the
//! rewritten tree with every annotation slot filled.

mod expr;
mod pre;
mod stmt;

use crate::context::ScopeChain;
use crate::diagnostics::Diagnostics;
use crate::error::SemanticError;
use juno_ast::{CompilationUnit, Span};
use juno_types::{TypeId, TypeRegistry, TypeSpec};

/// Run semantic analysis over one compilation unit.
///
/// The unit is consumed and returned rewritten: types attached, slots
/// allocated, l-values resolved, loop lowerings decided. Errors go to
/// `diags`; the returned tree is always structurally complete, though its
/// annotations are only trustworthy when `diags` stayed empty.
pub fn analyze(
    unit: CompilationUnit,
    registry: &mut TypeRegistry,
    diags: &mut Diagnostics,
) -> CompilationUnit {
    let mut analyzer = Analyzer {
        registry,
        diags,
        scopes: ScopeChain::new(),
        handled: Vec::new(),
        declared_throws: Vec::new(),
        method_name: String::new(),
    };
    let mut unit = unit;
    analyzer.pre_analyze(&mut unit);
    analyzer.analyze_unit(unit)
}

/// The analysis walker. Owns the scope chain and the throw-coverage
/// stack; borrows the registry and the diagnostics channel.
pub(crate) struct Analyzer<'a> {
    pub(crate) registry: &'a mut TypeRegistry,
    pub(crate) diags: &'a mut Diagnostics,
    pub(crate) scopes: ScopeChain,
    /// Caught-type sets of the enclosing try bodies, innermost last.
    pub(crate) handled: Vec<Vec<TypeId>>,
    /// Declared throws of the method being analyzed.
    pub(crate) declared_throws: Vec<TypeId>,
    /// Name of the method being analyzed, for diagnostics.
    pub(crate) method_name: String,
}

impl Analyzer<'_> {
    pub(crate) fn error(&mut self, span: Span, error: SemanticError) {
        self.diags.report(span, error);
    }

    /// Resolve a type spec, reporting and substituting `any` on failure.
    pub(crate) fn resolve_or_any(&mut self, spec: &TypeSpec, span: Span) -> TypeId {
        match self.registry.resolve(spec) {
            Ok(ty) => ty,
            Err(_) => {
                self.error(
                    span,
                    SemanticError::UnresolvedType {
                        name: spec.to_string(),
                    },
                );
                self.registry.any()
            }
        }
    }

    /// Require `actual` to be assignable to `expected`. The `any`
    /// sentinel satisfies everything, so errors do not cascade.
    pub(crate) fn must_match(&mut self, actual: TypeId, expected: TypeId, span: Span) {
        if !self.registry.is_assignable(actual, expected) {
            let err = SemanticError::TypeMismatch {
                expected: self.registry.name(expected),
                actual: self.registry.name(actual),
            };
            self.error(span, err);
        }
    }

    /// Require two operands of one numeric type; yields the operand type,
    /// or `any` after reporting.
    pub(crate) fn numeric_operands(&mut self, lhs: TypeId, rhs: TypeId, span: Span) -> TypeId {
        let any = self.registry.any();
        if lhs == any {
            return if self.registry.is_numeric(rhs) { rhs } else { any };
        }
        if !self.registry.is_numeric(lhs) {
            let err = SemanticError::TypeMismatch {
                expected: "int or double".to_string(),
                actual: self.registry.name(lhs),
            };
            self.error(span, err);
            return any;
        }
        if rhs != any && rhs != lhs {
            let err = SemanticError::TypeMismatch {
                expected: self.registry.name(lhs),
                actual: self.registry.name(rhs),
            };
            self.error(span, err);
            return any;
        }
        lhs
    }

    /// Is the thrown type covered by an enclosing catch or the method's
    /// declared throws?
    pub(crate) fn throw_is_covered(&self, thrown: TypeId) -> bool {
        self.handled
            .iter()
            .flatten()
            .chain(self.declared_throws.iter())
            .any(|&handler| self.registry.is_assignable(thrown, handler))
    }
}
