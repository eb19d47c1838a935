//! Capability table rewrites for non-entry files.
//!
//! Some components and APIs need the owning component instance at runtime:
//! - `Video` / `Canvas` elements get a ref callback storing the element on
//!   `this` under `__taroref_<id>`, after any existing ref callback.
//! - Context APIs such as `createVideoContext(id)` get `this` as the
//!   component argument when the call leaves that slot empty.

use crate::error::{Result, TransformError};
use crate::snippet::Snippets;
use crate::state::ImportBindings;
use crate::visitor::{jsx_attribute_name, jsx_element_name, MemberMention};
use oxc_allocator::CloneIn;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk_mut, VisitMut};
use serde_json::Value;

pub const REF_KEY_PREFIX: &str = "__taroref_";

/// Component name -> attribute holding its imperative id.
pub fn id_attribute_for(component: &str) -> Option<&'static str> {
    match component {
        "Video" => Some("id"),
        "Canvas" => Some("canvasId"),
        _ => None,
    }
}

/// API name -> argument position of the component instance.
pub fn instance_slot_for(api: &str) -> Option<usize> {
    match api {
        "createVideoContext"
        | "createCanvasContext"
        | "canvasGetImageData"
        | "canvasPutImageData"
        | "canvasToTempFilePath" => Some(1),
        _ => None,
    }
}

pub fn apply_capabilities<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &ImportBindings,
) -> Result<()> {
    let mut pass = CapabilityPass {
        snippets,
        bindings,
        error: None,
    };
    pass.visit_program(program);
    match pass.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct CapabilityPass<'s, 'a> {
    snippets: &'s Snippets<'a>,
    bindings: &'s ImportBindings,
    error: Option<TransformError>,
}

impl<'a> CapabilityPass<'_, 'a> {
    fn capture_ref(&self, element: &mut JSXOpeningElement<'a>) -> Result<()> {
        let Some(tag) = jsx_element_name(&element.name) else {
            return Ok(());
        };
        let Some(id_attribute) = self
            .bindings
            .component_for(&tag)
            .and_then(id_attribute_for)
        else {
            return Ok(());
        };
        let Some(id) = element
            .attributes
            .iter()
            .find(|item| jsx_attribute_name(item) == Some(id_attribute))
            .and_then(static_attribute_value)
        else {
            return Ok(());
        };

        let ref_index = element
            .attributes
            .iter()
            .position(|item| jsx_attribute_name(item) == Some("ref"));
        let previous = match ref_index {
            Some(index) => match ref_callback(&element.attributes[index]) {
                RefValue::Callback(expr) => {
                    if MemberMention::in_expression(expr, REF_KEY_PREFIX) {
                        return Ok(());
                    }
                    Some(expr.clone_in(self.snippets.allocator()))
                }
                RefValue::None => None,
                RefValue::Unsupported => return Ok(()),
            },
            None => None,
        };

        let key = Value::from(format!("{REF_KEY_PREFIX}{id}"));
        let attribute = match &previous {
            Some(prev) => self.ref_attribute(
                &format!("<__Ref ref={{ref => {{ __slot0(ref); this[{key}] = ref }}}} />"),
                &[prev],
            )?,
            None => self.ref_attribute(&format!("<__Ref ref={{ref => {{ this[{key}] = ref }}}} />"), &[])?,
        };
        match ref_index {
            Some(index) => element.attributes[index] = attribute,
            None => element.attributes.push(attribute),
        }
        Ok(())
    }

    fn ref_attribute(&self, code: &str, slots: &[&Expression<'a>]) -> Result<JSXAttributeItem<'a>> {
        if let Expression::JSXElement(element) = self.snippets.expression_with(code, slots)? {
            if let Some(attribute) = element.unbox().opening_element.unbox().attributes.pop() {
                return Ok(attribute);
            }
        }
        Err(TransformError::Synthesis {
            template: code.to_string(),
            messages: vec!["expected a ref attribute".to_string()],
        })
    }

    fn augment_call(&self, call: &mut CallExpression<'a>) -> Result<()> {
        let api = match &call.callee {
            Expression::StaticMemberExpression(member) => match &member.object {
                Expression::Identifier(object)
                    if self.bindings.taro_default.as_deref() == Some(object.name.as_str()) =>
                {
                    Some(member.property.name.to_string())
                }
                _ => None,
            },
            Expression::Identifier(ident) => self
                .bindings
                .taro_api_for(ident.name.as_str())
                .map(str::to_string),
            _ => None,
        };
        let Some(slot) = api.as_deref().and_then(instance_slot_for) else {
            return Ok(());
        };
        if call.arguments.len() > slot {
            return Ok(());
        }
        while call.arguments.len() < slot {
            let undefined = self.snippets.expression("undefined")?;
            call.arguments.push(Argument::from(undefined));
        }
        let this = self.snippets.expression("this")?;
        call.arguments.push(Argument::from(this));
        Ok(())
    }
}

impl<'a> VisitMut<'a> for CapabilityPass<'_, 'a> {
    fn visit_jsx_opening_element(&mut self, element: &mut JSXOpeningElement<'a>) {
        if self.error.is_none() {
            if let Err(err) = self.capture_ref(element) {
                self.error = Some(err);
            }
        }
        walk_mut::walk_jsx_opening_element(self, element);
    }

    fn visit_call_expression(&mut self, call: &mut CallExpression<'a>) {
        if self.error.is_none() {
            if let Err(err) = self.augment_call(call) {
                self.error = Some(err);
            }
        }
        walk_mut::walk_call_expression(self, call);
    }
}

enum RefValue<'b, 'a> {
    Callback(&'b Expression<'a>),
    None,
    Unsupported,
}

fn ref_callback<'b, 'a>(item: &'b JSXAttributeItem<'a>) -> RefValue<'b, 'a> {
    let JSXAttributeItem::Attribute(attr) = item else {
        return RefValue::Unsupported;
    };
    match &attr.value {
        Some(JSXAttributeValue::ExpressionContainer(container)) => {
            match container.expression.as_expression() {
                Some(expr) => RefValue::Callback(expr),
                None => RefValue::None,
            }
        }
        None => RefValue::None,
        // String refs have no callback to chain.
        _ => RefValue::Unsupported,
    }
}

/// Literal value of `id="x"` or `id={'x'}`.
fn static_attribute_value(item: &JSXAttributeItem<'_>) -> Option<String> {
    let JSXAttributeItem::Attribute(attr) = item else {
        return None;
    };
    match attr.value.as_ref()? {
        JSXAttributeValue::StringLiteral(lit) => Some(lit.value.to_string()),
        JSXAttributeValue::ExpressionContainer(container) => match &container.expression {
            JSXExpression::StringLiteral(lit) => Some(lit.value.to_string()),
            _ => None,
        },
        _ => None,
    }
}
