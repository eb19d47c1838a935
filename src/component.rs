//! Component class helpers.
//!
//! A component class is a class whose superclass is `Component` or
//! `PureComponent`, either bare or as a member of the base-runtime default
//! import (`Taro.Component`). Every lifecycle pass operates on these classes
//! only; other classes are left untouched.

use crate::error::Result;
use crate::snippet::Snippets;
use crate::state::LifecycleFlags;
use crate::visitor::property_key_name;
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk_mut, VisitMut};

const BASE_COMPONENTS: [&str; 2] = ["Component", "PureComponent"];

pub fn is_component_class(class: &Class<'_>, taro_name: Option<&str>) -> bool {
    match &class.super_class {
        Some(Expression::Identifier(ident)) => BASE_COMPONENTS.contains(&ident.name.as_str()),
        Some(Expression::StaticMemberExpression(member)) => {
            let Expression::Identifier(object) = &member.object else {
                return false;
            };
            Some(object.name.as_str()) == taro_name
                && BASE_COMPONENTS.contains(&member.property.name.as_str())
        }
        _ => false,
    }
}

pub fn member_name(element: &ClassElement<'_>) -> Option<String> {
    match element {
        ClassElement::MethodDefinition(method) => property_key_name(&method.key),
        ClassElement::PropertyDefinition(prop) => property_key_name(&prop.key),
        _ => None,
    }
}

pub fn observe_members(class: &Class<'_>) -> LifecycleFlags {
    let mut flags = LifecycleFlags::default();
    for element in &class.body.body {
        if let Some(name) = member_name(element) {
            flags.observe(&name);
        }
    }
    flags
}

/// Body statements of the last method named `name`.
///
/// The last definition is the one that takes effect at runtime.
pub fn method_body_mut<'b, 'a>(
    class: &'b mut Class<'a>,
    name: &str,
) -> Option<&'b mut ArenaVec<'a, Statement<'a>>> {
    class
        .body
        .body
        .iter_mut()
        .rev()
        .find_map(|element| match element {
            ClassElement::MethodDefinition(method)
                if property_key_name(&method.key).as_deref() == Some(name) =>
            {
                method.value.body.as_mut().map(|body| &mut body.statements)
            }
            _ => None,
        })
}

pub fn constructor_body_mut<'b, 'a>(
    class: &'b mut Class<'a>,
) -> Option<&'b mut ArenaVec<'a, Statement<'a>>> {
    class.body.body.iter_mut().find_map(|element| match element {
        ClassElement::MethodDefinition(method) if method.kind == MethodDefinitionKind::Constructor => {
            method.value.body.as_mut().map(|body| &mut body.statements)
        }
        _ => None,
    })
}

/// Initializer of the last class field named `name`.
pub fn property_value_mut<'b, 'a>(
    class: &'b mut Class<'a>,
    name: &str,
) -> Option<&'b mut Expression<'a>> {
    class
        .body
        .body
        .iter_mut()
        .rev()
        .find_map(|element| match element {
            ClassElement::PropertyDefinition(prop)
                if !prop.r#static && property_key_name(&prop.key).as_deref() == Some(name) =>
            {
                prop.value.as_mut()
            }
            _ => None,
        })
}

/// Add `name() { super.name && super.name() }` unless a member called `name` exists.
///
/// Returns whether a method was added.
pub fn ensure_delegating_method<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    name: &str,
) -> Result<bool> {
    if class
        .body
        .body
        .iter()
        .any(|element| member_name(element).as_deref() == Some(name))
    {
        return Ok(false);
    }
    let method = snippets.class_element(&format!(
        "{name}() {{ super.{name} && super.{name}() }}"
    ))?;
    class.body.body.push(method);
    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Traversal
// ═══════════════════════════════════════════════════════════════════════════════

/// Run `f` on every component class in the program, declarations and expressions alike.
///
/// The first error stops further callbacks and is returned.
pub fn for_each_component_class<'a, F>(
    program: &mut Program<'a>,
    taro_name: Option<&str>,
    f: F,
) -> Result<()>
where
    F: FnMut(&mut Class<'a>) -> Result<()>,
{
    let mut walker = ComponentClassWalker {
        taro_name,
        f,
        error: None,
    };
    walker.visit_program(program);
    match walker.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct ComponentClassWalker<'n, F> {
    taro_name: Option<&'n str>,
    f: F,
    error: Option<crate::error::TransformError>,
}

impl<'a, F> VisitMut<'a> for ComponentClassWalker<'_, F>
where
    F: FnMut(&mut Class<'a>) -> Result<()>,
{
    fn visit_class(&mut self, class: &mut Class<'a>) {
        if self.error.is_some() {
            return;
        }
        if is_component_class(class, self.taro_name) {
            if let Err(err) = (self.f)(class) {
                self.error = Some(err);
                return;
            }
        }
        walk_mut::walk_class(self, class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn parse<'a>(allocator: &'a Allocator, code: &'a str) -> Program<'a> {
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        Parser::new(allocator, code, source_type).parse().program
    }

    #[test]
    fn test_component_detection() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "class A extends Component {}\nclass B extends T.PureComponent {}\n\
             class C extends Other {}\nclass D extends X.Component {}",
        );
        let classes: Vec<&Class> = program
            .body
            .iter()
            .filter_map(|s| match s {
                Statement::ClassDeclaration(c) => Some(&**c),
                _ => None,
            })
            .collect();
        assert!(is_component_class(classes[0], None));
        assert!(is_component_class(classes[1], Some("T")));
        assert!(!is_component_class(classes[1], None));
        assert!(!is_component_class(classes[2], Some("T")));
        assert!(!is_component_class(classes[3], Some("T")));
    }

    #[test]
    fn test_walker_reaches_expressions_and_exports() {
        let allocator = Allocator::default();
        let mut program = parse(
            &allocator,
            "export default class extends Component { render() {} }\n\
             const Inner = class extends Component { componentDidShow() {} };",
        );
        let mut seen = Vec::new();
        for_each_component_class(&mut program, None, |class| {
            seen.push(observe_members(class));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].has_did_show);
    }

    #[test]
    fn test_ensure_delegating_method_once() {
        let allocator = Allocator::default();
        let snippets = Snippets::new(&allocator);
        let mut program = parse(&allocator, "class A extends Component { componentDidShow() {} }");
        for_each_component_class(&mut program, None, |class| {
            assert!(ensure_delegating_method(&snippets, class, "componentDidMount")?);
            assert!(!ensure_delegating_method(&snippets, class, "componentDidMount")?);
            assert!(!ensure_delegating_method(&snippets, class, "componentDidShow")?);
            Ok(())
        })
        .unwrap();
        let code = Codegen::new().build(&program).code;
        assert_eq!(code.matches("componentDidMount() {").count(), 1, "{code}");
        assert!(code.contains("super.componentDidMount && super.componentDidMount()"), "{code}");
    }
}
