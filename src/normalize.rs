//! Class Structure Normalizer
//!
//! Upstream compilers may hoist class fields into the constructor as
//! `this.field = value`. Later passes pattern-match on class fields (the
//! literal `config` object, function-valued handlers), so those assignments
//! are moved back to field declarations here.

use crate::component::{constructor_body_mut, for_each_component_class};
use crate::error::Result;
use crate::snippet::Snippets;
use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_span::SPAN;
use oxc_syntax::operator::AssignmentOperator;

pub const CONFIG_FIELD: &str = "config";
pub const ANONYMOUS_CLASS_NAME: &str = "_TaroComponentClass";

/// Normalize every component class: hoist constructor field initializers and
/// name anonymous classes.
pub fn normalize_component_classes<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    taro_name: Option<&str>,
) -> Result<()> {
    let snippets = Snippets::new(allocator);
    let ast = AstBuilder::new(allocator);
    for_each_component_class(program, taro_name, |class| {
        hoist_constructor_fields(&snippets, class)?;
        if class.id.is_none() {
            class.id = Some(ast.binding_identifier(SPAN, ANONYMOUS_CLASS_NAME));
        }
        Ok(())
    })
}

/// `this.<name> = <value>` in a constructor, if it should become a class field.
fn hoistable<'b, 'a>(stmt: &'b Statement<'a>) -> Option<(&'b str, &'b Expression<'a>)> {
    let Statement::ExpressionStatement(expr_stmt) = stmt else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &expr_stmt.expression else {
        return None;
    };
    if assign.operator != AssignmentOperator::Assign {
        return None;
    }
    let AssignmentTarget::StaticMemberExpression(member) = &assign.left else {
        return None;
    };
    if !matches!(member.object, Expression::ThisExpression(_)) {
        return None;
    }
    let name = member.property.name.as_str();
    let hoist = match &assign.right {
        Expression::FunctionExpression(_) | Expression::ArrowFunctionExpression(_) => true,
        Expression::ObjectExpression(_) => name == CONFIG_FIELD,
        _ => false,
    };
    hoist.then_some((name, &assign.right))
}

fn hoist_constructor_fields<'a>(snippets: &Snippets<'a>, class: &mut Class<'a>) -> Result<()> {
    let allocator = snippets.allocator();
    let mut fields = Vec::new();
    let Some(body) = constructor_body_mut(class) else {
        return Ok(());
    };
    let mut hoisted = Vec::new();
    for (index, stmt) in body.iter().enumerate() {
        if let Some((name, value)) = hoistable(stmt) {
            let value = value.clone_in(allocator);
            fields.push(snippets.class_element_with(&format!("{name} = __slot0;"), &[&value])?);
            hoisted.push(index);
        }
    }
    for index in hoisted.into_iter().rev() {
        body.remove(index);
    }
    for field in fields {
        class.body.body.push(field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn normalize(code: &str) -> String {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut program = Parser::new(&allocator, code, source_type).parse().program;
        normalize_component_classes(&allocator, &mut program, Some("Taro")).unwrap();
        Codegen::new().build(&program).code
    }

    #[test]
    fn test_hoists_functions_and_config() {
        let code = normalize(
            "class Index extends Taro.Component {\n\
               constructor(props) {\n\
                 super(props);\n\
                 this.config = { navigationBarTitleText: 'Home' };\n\
                 this.handleTap = () => { this.setState({ a: 1 }) };\n\
                 this.state = { a: 0 };\n\
                 this.options = { deep: true };\n\
               }\n\
             }",
        );
        assert!(code.contains("config = {"), "{code}");
        assert!(code.contains("handleTap = () =>"), "{code}");
        assert!(!code.contains("this.config ="), "{code}");
        assert!(!code.contains("this.handleTap ="), "{code}");
        assert!(code.contains("this.state = { a: 0 }"), "{code}");
        assert!(code.contains("this.options = { deep: true }"), "{code}");
        assert!(code.find("constructor(").unwrap() < code.find("config = {").unwrap());
    }

    #[test]
    fn test_leaves_plain_classes_alone() {
        let code = normalize("class Store { constructor() { this.onChange = function () {}; } }");
        assert!(code.contains("this.onChange = function"), "{code}");
    }

    #[test]
    fn test_names_anonymous_component_class() {
        let code = normalize("export default class extends Component { render() { return null; } }");
        assert!(code.contains("export default class _TaroComponentClass extends Component"), "{code}");
    }
}
