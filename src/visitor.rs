//! Read-only scans over the syntax tree.
//!
//! Each scanner answers one question about a program or subtree and never
//! mutates it. Passes that mutate run their own `VisitMut` implementations.

use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use std::collections::HashSet;

/// Printable name of a markup tag: `View`, `view`, `Foo.Bar`.
pub fn jsx_element_name(name: &JSXElementName<'_>) -> Option<String> {
    match name {
        JSXElementName::Identifier(ident) => Some(ident.name.to_string()),
        JSXElementName::IdentifierReference(ident) => Some(ident.name.to_string()),
        JSXElementName::MemberExpression(member) => {
            let object = match &member.object {
                JSXMemberExpressionObject::IdentifierReference(ident) => ident.name.to_string(),
                _ => return None,
            };
            Some(format!("{}.{}", object, member.property.name))
        }
        _ => None,
    }
}

pub fn jsx_attribute_name<'b>(item: &'b JSXAttributeItem<'_>) -> Option<&'b str> {
    match item {
        JSXAttributeItem::Attribute(attr) => match &attr.name {
            JSXAttributeName::Identifier(ident) => Some(ident.name.as_str()),
            JSXAttributeName::NamespacedName(_) => None,
        },
        JSXAttributeItem::SpreadAttribute(_) => None,
    }
}

/// Static name of a property key, `None` for computed keys.
pub fn property_key_name(key: &PropertyKey<'_>) -> Option<String> {
    key.static_name().map(|name| name.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// References and markup
// ═══════════════════════════════════════════════════════════════════════════════

/// Every identifier read in the program, plus whether any markup appears.
#[derive(Default)]
pub struct ReferenceCollector {
    pub names: HashSet<String>,
    pub uses_markup: bool,
}

impl ReferenceCollector {
    pub fn collect(program: &Program<'_>) -> Self {
        let mut collector = Self::default();
        collector.visit_program(program);
        collector
    }
}

impl<'a> Visit<'a> for ReferenceCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.names.insert(ident.name.to_string());
    }

    fn visit_jsx_element(&mut self, element: &JSXElement<'a>) {
        self.uses_markup = true;
        walk::walk_jsx_element(self, element);
    }

    fn visit_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) {
        self.uses_markup = true;
        walk::walk_jsx_fragment(self, fragment);
    }
}

/// Every name the program declares, in any scope.
#[derive(Default)]
pub struct BindingCollector {
    pub names: HashSet<String>,
}

impl BindingCollector {
    pub fn collect(program: &Program<'_>) -> HashSet<String> {
        let mut collector = Self::default();
        collector.visit_program(program);
        collector.names
    }
}

impl<'a> Visit<'a> for BindingCollector {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Member mentions
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a subtree accesses `<anything>.<property>` or `<anything>['<property>']`.
pub struct MemberMention<'n> {
    property: &'n str,
    found: bool,
}

impl<'n> MemberMention<'n> {
    pub fn in_statements(statements: &[Statement<'_>], property: &'n str) -> bool {
        let mut scan = Self {
            property,
            found: false,
        };
        for stmt in statements {
            scan.visit_statement(stmt);
        }
        scan.found
    }

    pub fn in_expression(expr: &Expression<'_>, property: &'n str) -> bool {
        let mut scan = Self {
            property,
            found: false,
        };
        scan.visit_expression(expr);
        scan.found
    }
}

impl<'a> Visit<'a> for MemberMention<'_> {
    fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
        if member.property.name.as_str() == self.property {
            self.found = true;
        }
        walk::walk_static_member_expression(self, member);
    }

    fn visit_computed_member_expression(&mut self, member: &ComputedMemberExpression<'a>) {
        if let Expression::StringLiteral(lit) = &member.expression {
            if lit.value.starts_with(self.property) {
                self.found = true;
            }
        }
        walk::walk_computed_member_expression(self, member);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store discovery (entry only)
// ═══════════════════════════════════════════════════════════════════════════════

/// Finds `setStore(...)` call sites and the `store={...}` binding of a `<Provider>` element.
pub struct StoreScan<'a> {
    allocator: &'a Allocator,
    provider_name: String,
    pub has_set_store_call: bool,
    pub store: Option<Expression<'a>>,
}

impl<'a> StoreScan<'a> {
    pub fn scan(allocator: &'a Allocator, program: &Program<'a>, provider_name: &str) -> Self {
        let mut scan = Self {
            allocator,
            provider_name: provider_name.to_string(),
            has_set_store_call: false,
            store: None,
        };
        scan.visit_program(program);
        scan
    }
}

impl<'a> Visit<'a> for StoreScan<'a> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(ident) = &call.callee {
            if ident.name.as_str() == crate::state::SET_STORE_NAME {
                self.has_set_store_call = true;
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_jsx_opening_element(&mut self, element: &JSXOpeningElement<'a>) {
        if self.store.is_none()
            && jsx_element_name(&element.name).as_deref() == Some(self.provider_name.as_str())
        {
            for item in &element.attributes {
                let JSXAttributeItem::Attribute(attr) = item else {
                    continue;
                };
                if jsx_attribute_name(item) != Some("store") {
                    continue;
                }
                if let Some(JSXAttributeValue::ExpressionContainer(container)) = &attr.value {
                    if let Some(expr) = container.expression.as_expression() {
                        self.store = Some(expr.clone_in(self.allocator));
                    }
                }
                break;
            }
        }
        walk::walk_jsx_opening_element(self, element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn parse<'a>(allocator: &'a Allocator, code: &'a str) -> Program<'a> {
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        Parser::new(allocator, code, source_type).parse().program
    }

    #[test]
    fn test_reference_collector() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "import Taro from '@tarojs/taro'; import { View } from '@tarojs/components';\n\
             const a = helper(); export default () => <View />;",
        );
        let refs = ReferenceCollector::collect(&program);
        assert!(refs.uses_markup);
        assert!(refs.names.contains("helper"));
        assert!(refs.names.contains("View"));
        assert!(!refs.names.contains("Taro"));
    }

    #[test]
    fn test_binding_collector() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "import { a } from 'm'; function f(b) { const c = 1; let { d } = b; } class E {}",
        );
        let names = BindingCollector::collect(&program);
        for name in ["a", "f", "b", "c", "d", "E"] {
            assert!(names.contains(name), "{name}");
        }
    }

    #[test]
    fn test_member_mention() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "this.componentDidShow(); this['__taroref_v1'] = ref;");
        assert!(MemberMention::in_statements(&program.body, "componentDidShow"));
        assert!(MemberMention::in_statements(&program.body, "__taroref_"));
        assert!(!MemberMention::in_statements(&program.body, "componentDidHide"));
    }

    #[test]
    fn test_store_scan() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "const store = configStore(); setStore(store);\n\
             class App { render() { return <Provider store={store}><Index /></Provider> } }",
        );
        let scan = StoreScan::scan(&allocator, &program, "Provider");
        assert!(scan.has_set_store_call);
        assert!(matches!(scan.store, Some(Expression::Identifier(ref id)) if id.name == "store"));
    }
}
