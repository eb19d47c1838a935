//! Snippet Module for the H5 transformer
//!
//! Synthesized code is written as small JS/JSX source snippets and parsed
//! into the file's own arena, so generated nodes are ordinary oxc nodes that
//! print exactly like user code. Existing subtrees are spliced in through
//! placeholder identifiers `__slot0`, `__slot1`, ...
//!
//! Spans of parsed snippets are reset to `SPAN` so they never collide with
//! the comment positions of the file being transformed.

use crate::error::{Result, TransformError};
use oxc_allocator::{Allocator, CloneIn, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span, SPAN};

const SLOT_PREFIX: &str = "__slot";

pub struct Snippets<'a> {
    allocator: &'a Allocator,
}

impl<'a> Snippets<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &'a Allocator {
        self.allocator
    }

    fn parse(&self, code: &str) -> Result<Program<'a>> {
        let source: &'a str = self.allocator.alloc_str(code);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(self.allocator, source, source_type).parse();
        if !ret.errors.is_empty() || ret.panicked {
            return Err(TransformError::Synthesis {
                template: code.to_string(),
                messages: ret.errors.iter().map(|e| e.to_string()).collect(),
            });
        }
        let mut program = ret.program;
        SpanEraser.visit_program(&mut program);
        Ok(program)
    }

    /// Parse top-level statements.
    pub fn statements(&self, code: &str) -> Result<ArenaVec<'a, Statement<'a>>> {
        Ok(self.parse(code)?.body)
    }

    pub fn statement(&self, code: &str) -> Result<Statement<'a>> {
        let mut body = self.statements(code)?;
        match body.pop() {
            Some(stmt) if body.is_empty() => Ok(stmt),
            _ => Err(self.shape_error(code, "expected exactly one statement")),
        }
    }

    pub fn expression(&self, code: &str) -> Result<Expression<'a>> {
        match self.statement(code)? {
            Statement::ExpressionStatement(stmt) => Ok(strip_parens(stmt.unbox().expression)),
            _ => Err(self.shape_error(code, "expected an expression")),
        }
    }

    /// Parse class members, e.g. a method or a property definition.
    ///
    /// The wrapper class extends a base so that `super` calls are legal.
    pub fn class_elements(&self, code: &str) -> Result<ArenaVec<'a, ClassElement<'a>>> {
        let wrapped = format!("class __Snippet extends __Base {{\n{code}\n}}");
        match self.statement(&wrapped)? {
            Statement::ClassDeclaration(class) => Ok(class.unbox().body.unbox().body),
            _ => Err(self.shape_error(code, "expected class members")),
        }
    }

    pub fn class_element(&self, code: &str) -> Result<ClassElement<'a>> {
        let mut elements = self.class_elements(code)?;
        match elements.pop() {
            Some(element) if elements.is_empty() => Ok(element),
            _ => Err(self.shape_error(code, "expected exactly one class member")),
        }
    }

    /// Parse an expression and replace `__slotN` identifiers with clones of `slots[N]`.
    pub fn expression_with(&self, code: &str, slots: &[&Expression<'a>]) -> Result<Expression<'a>> {
        let mut expr = self.expression(code)?;
        Splicer::new(self.allocator, slots).visit_expression(&mut expr);
        Ok(expr)
    }

    pub fn statement_with(&self, code: &str, slots: &[&Expression<'a>]) -> Result<Statement<'a>> {
        let mut stmt = self.statement(code)?;
        Splicer::new(self.allocator, slots).visit_statement(&mut stmt);
        Ok(stmt)
    }

    pub fn class_element_with(
        &self,
        code: &str,
        slots: &[&Expression<'a>],
    ) -> Result<ClassElement<'a>> {
        let mut element = self.class_element(code)?;
        Splicer::new(self.allocator, slots).visit_class_element(&mut element);
        Ok(element)
    }

    fn shape_error(&self, code: &str, message: &str) -> TransformError {
        TransformError::Synthesis {
            template: code.to_string(),
            messages: vec![message.to_string()],
        }
    }
}

fn strip_parens(expr: Expression<'_>) -> Expression<'_> {
    match expr {
        Expression::ParenthesizedExpression(paren) => strip_parens(paren.unbox().expression),
        other => other,
    }
}

struct Splicer<'a, 's> {
    allocator: &'a Allocator,
    slots: &'s [&'s Expression<'a>],
}

impl<'a, 's> Splicer<'a, 's> {
    fn new(allocator: &'a Allocator, slots: &'s [&'s Expression<'a>]) -> Self {
        Self { allocator, slots }
    }

    fn slot_for(&self, name: &str) -> Option<&'s Expression<'a>> {
        let index: usize = name.strip_prefix(SLOT_PREFIX)?.parse().ok()?;
        self.slots.get(index).copied()
    }
}

impl<'a> VisitMut<'a> for Splicer<'a, '_> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if let Expression::Identifier(ident) = expr {
            if let Some(replacement) = self.slot_for(ident.name.as_str()) {
                *expr = replacement.clone_in(self.allocator);
                return;
            }
        }
        walk_mut::walk_expression(self, expr);
    }
}

struct SpanEraser;

impl<'a> VisitMut<'a> for SpanEraser {
    fn visit_span(&mut self, span: &mut Span) {
        *span = SPAN;
    }
}

/// Set a string literal's value and drop its raw text so the printer re-quotes it.
pub fn set_string_literal<'a>(allocator: &'a Allocator, lit: &mut StringLiteral<'a>, value: &str) {
    let value: &'a str = allocator.alloc_str(value);
    lit.value = value.into();
    lit.raw = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_codegen::Codegen;

    fn print_statement<'a>(allocator: &'a Allocator, stmt: Statement<'a>) -> String {
        let snippets = Snippets::new(allocator);
        let mut program = snippets.statements("").unwrap();
        program.push(stmt);
        let mut host = snippets.parse("").unwrap();
        host.body = program;
        Codegen::new().build(&host).code
    }

    #[test]
    fn test_expression_with_slots() {
        let allocator = Allocator::default();
        let snippets = Snippets::new(&allocator);
        let store = snippets.expression("appStore").unwrap();
        let wrapped = snippets
            .expression_with("<Provider store={__slot0}>{__slot1}</Provider>", &[&store, &store])
            .unwrap();
        let stmt = snippets.statement_with("render(__slot0)", &[&wrapped]).unwrap();
        let code = print_statement(&allocator, stmt);
        assert!(code.contains("<Provider store={appStore}>{appStore}</Provider>"), "{code}");
    }

    #[test]
    fn test_class_element_allows_super() {
        let allocator = Allocator::default();
        let snippets = Snippets::new(&allocator);
        let element = snippets
            .class_element("componentDidMount() { super.componentDidMount && super.componentDidMount() }")
            .unwrap();
        assert!(matches!(element, ClassElement::MethodDefinition(_)));
    }

    #[test]
    fn test_bad_template_is_synthesis_error() {
        let allocator = Allocator::default();
        let snippets = Snippets::new(&allocator);
        let err = snippets.expression("a +").unwrap_err();
        assert_eq!(err.code(), crate::error::codes::SYNTHESIS);
        assert!(snippets.expression("a; b").is_err());
    }
}
