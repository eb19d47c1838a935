//! Config Extractor
//!
//! Harvests the literal `config = { ... }` class field:
//! - `pages` arrays, anywhere inside `config`, feed the [`PageRegistry`];
//!   pages under a `subPackages` key are prefixed with their sibling `root`.
//! - `tabBar` gets its icons turned into `require(...)` calls, its page paths
//!   made absolute, and the router settings appended.
//! - All other top-level fields become the file's [`PageOptions`].
//!
//! Anything not shaped as expected is skipped without error.

use crate::component::property_value_mut;
use crate::config::{add_leading_slash, TransformConfig};
use crate::descriptor::{PageOptions, TabBarDescriptor, TabBarItem, TabBarPosition};
use crate::error::Result;
use crate::normalize::CONFIG_FIELD;
use crate::registry::PageRegistry;
use crate::snippet::{set_string_literal, Snippets};
use crate::visitor::property_key_name;
use lazy_static::lazy_static;
use oxc_allocator::CloneIn;
use oxc_ast::ast::*;
use regex::Regex;
use serde_json::{Map, Number, Value};

lazy_static! {
    static ref SUB_PACKAGES_KEY: Regex = Regex::new(r"(?i)subpackages").unwrap();
    static ref REPEATED_SLASHES: Regex = Regex::new(r"/{2,}").unwrap();
}

/// What one `config` field yielded.
pub struct ConfigExtraction<'a> {
    /// Last `tabBar` object seen, after rewriting.
    pub tab_bar: Option<(TabBarDescriptor, Expression<'a>)>,
    pub options: PageOptions,
}

/// Harvest the class's `config` field. `None` when there is no object-literal `config`.
pub fn extract_config<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    config: &TransformConfig,
    registry: &mut PageRegistry,
) -> Result<Option<ConfigExtraction<'a>>> {
    let Some(Expression::ObjectExpression(object)) = property_value_mut(class, CONFIG_FIELD) else {
        return Ok(None);
    };
    let mut harvest = Harvest {
        snippets,
        config,
        registry,
        tab_bar: None,
    };
    harvest.walk_object(object, false)?;
    let tab_bar = harvest.tab_bar;
    let options = page_options(object);
    Ok(Some(ConfigExtraction { tab_bar, options }))
}

struct Harvest<'s, 'a> {
    snippets: &'s Snippets<'a>,
    config: &'s TransformConfig,
    registry: &'s mut PageRegistry,
    tab_bar: Option<(TabBarDescriptor, Expression<'a>)>,
}

impl<'a> Harvest<'_, 'a> {
    fn walk_object(&mut self, object: &mut ObjectExpression<'a>, under_sub_packages: bool) -> Result<()> {
        let root = if under_sub_packages {
            string_property(object, "root").unwrap_or_default()
        } else {
            String::new()
        };
        for property in object.properties.iter_mut() {
            let ObjectPropertyKind::ObjectProperty(prop) = property else {
                continue;
            };
            let Some(key) = property_key_name(&prop.key) else {
                continue;
            };
            match key.as_str() {
                "pages" => {
                    if let Expression::ArrayExpression(pages) = &mut prop.value {
                        self.register_pages(pages, &root);
                    }
                }
                "tabBar" => {
                    if let Expression::ObjectExpression(tab_bar) = &mut prop.value {
                        let descriptor = self.rewrite_tab_bar(tab_bar)?;
                        let allocator = self.snippets.allocator();
                        self.tab_bar = Some((descriptor, prop.value.clone_in(allocator)));
                    }
                }
                _ => {
                    let nested = under_sub_packages || SUB_PACKAGES_KEY.is_match(&key);
                    self.walk_value(&mut prop.value, nested)?;
                }
            }
        }
        Ok(())
    }

    fn walk_value(&mut self, value: &mut Expression<'a>, under_sub_packages: bool) -> Result<()> {
        match value {
            Expression::ObjectExpression(object) => self.walk_object(object, under_sub_packages),
            Expression::ArrayExpression(array) => {
                for element in array.elements.iter_mut() {
                    if let ArrayExpressionElement::ObjectExpression(object) = element {
                        self.walk_object(object, under_sub_packages)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn register_pages(&mut self, pages: &mut ArrayExpression<'a>, root: &str) {
        let allocator = self.snippets.allocator();
        for element in pages.elements.iter_mut() {
            let ArrayExpressionElement::StringLiteral(lit) = element else {
                continue;
            };
            let page = lit.value.to_string();
            let full = REPEATED_SLASHES.replace_all(&format!("{root}/{page}"), "/").to_string();
            self.registry.register(&full);
            set_string_literal(allocator, lit, &add_leading_slash(&page));
        }
    }

    fn rewrite_tab_bar(&mut self, tab_bar: &mut ObjectExpression<'a>) -> Result<TabBarDescriptor> {
        let mut descriptor = TabBarDescriptor::default();
        for property in tab_bar.properties.iter_mut() {
            let ObjectPropertyKind::ObjectProperty(prop) = property else {
                continue;
            };
            match (property_key_name(&prop.key).as_deref(), &mut prop.value) {
                (Some("position"), value) => {
                    let position = match value {
                        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
                        _ => None,
                    };
                    descriptor.position = TabBarPosition::from_config(position);
                }
                (Some("list"), Expression::ArrayExpression(list)) => {
                    for element in list.elements.iter_mut() {
                        if let ArrayExpressionElement::ObjectExpression(item) = element {
                            descriptor.list.push(self.rewrite_tab_item(item)?);
                        }
                    }
                }
                _ => {}
            }
        }

        let router = format!(
            "({{ mode: {}, basename: {}, customRoutes: {} }})",
            Value::from(self.config.router.mode.as_str()),
            Value::from(self.config.basename()),
            self.config.custom_routes_json(),
        );
        if let Expression::ObjectExpression(extra) = self.snippets.expression(&router)? {
            for property in extra.unbox().properties {
                let key = match &property {
                    ObjectPropertyKind::ObjectProperty(prop) => property_key_name(&prop.key),
                    ObjectPropertyKind::SpreadProperty(_) => None,
                };
                if key.is_some_and(|key| string_key_present(tab_bar, &key)) {
                    continue;
                }
                tab_bar.properties.push(property);
            }
        }
        Ok(descriptor)
    }

    fn rewrite_tab_item(&mut self, item: &mut ObjectExpression<'a>) -> Result<TabBarItem> {
        let allocator = self.snippets.allocator();
        let mut summary = TabBarItem::default();
        for property in item.properties.iter_mut() {
            let ObjectPropertyKind::ObjectProperty(prop) = property else {
                continue;
            };
            let key = property_key_name(&prop.key);
            let Expression::StringLiteral(lit) = &mut prop.value else {
                continue;
            };
            match key.as_deref() {
                Some(key @ ("iconPath" | "selectedIconPath")) => {
                    let path = lit.value.to_string();
                    let module = Value::from(format!("./{path}"));
                    prop.value = self.snippets.expression(&format!("require({module})"))?;
                    if key == "iconPath" {
                        summary.icon_path = Some(path);
                    } else {
                        summary.selected_icon_path = Some(path);
                    }
                }
                Some("pagePath") => {
                    let page = add_leading_slash(&lit.value);
                    set_string_literal(allocator, lit, &page);
                    summary.page_path = Some(page);
                }
                _ => {}
            }
        }
        Ok(summary)
    }
}

fn string_key_present(object: &ObjectExpression<'_>, key: &str) -> bool {
    object.properties.iter().any(|property| match property {
        ObjectPropertyKind::ObjectProperty(prop) => property_key_name(&prop.key).as_deref() == Some(key),
        ObjectPropertyKind::SpreadProperty(_) => false,
    })
}

fn string_property(object: &ObjectExpression<'_>, key: &str) -> Option<String> {
    object.properties.iter().find_map(|property| match property {
        ObjectPropertyKind::ObjectProperty(prop) if property_key_name(&prop.key).as_deref() == Some(key) => {
            match &prop.value {
                Expression::StringLiteral(lit) => Some(lit.value.to_string()),
                _ => None,
            }
        }
        _ => None,
    })
}

fn page_options(object: &ObjectExpression<'_>) -> PageOptions {
    let mut fields = Map::new();
    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(prop) = property else {
            continue;
        };
        let Some(key) = property_key_name(&prop.key) else {
            continue;
        };
        if key == "pages" || key == "tabBar" {
            continue;
        }
        if let Some(value) = literal_to_json(&prop.value) {
            fields.insert(key, value);
        }
    }
    PageOptions { fields }
}

/// JSON value of a literal expression; `None` if any part is not a literal.
pub fn literal_to_json(expr: &Expression<'_>) -> Option<Value> {
    match expr {
        Expression::StringLiteral(lit) => Some(Value::from(lit.value.as_str())),
        Expression::BooleanLiteral(lit) => Some(Value::Bool(lit.value)),
        Expression::NullLiteral(_) => Some(Value::Null),
        Expression::NumericLiteral(lit) => number_to_json(lit.value),
        Expression::ParenthesizedExpression(paren) => literal_to_json(&paren.expression),
        Expression::ArrayExpression(array) => array
            .elements
            .iter()
            .map(|element| element.as_expression().and_then(literal_to_json))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Expression::ObjectExpression(object) => {
            let mut map = Map::new();
            for property in &object.properties {
                let ObjectPropertyKind::ObjectProperty(prop) = property else {
                    return None;
                };
                map.insert(property_key_name(&prop.key)?, literal_to_json(&prop.value)?);
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

fn number_to_json(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Some(Value::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::for_each_component_class;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    struct Outcome {
        code: String,
        tab_bar: Option<TabBarDescriptor>,
        options: Option<PageOptions>,
    }

    fn extract(code: &str, config: &TransformConfig, registry: &mut PageRegistry) -> Outcome {
        let allocator = Allocator::default();
        let snippets = Snippets::new(&allocator);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut program = Parser::new(&allocator, code, source_type).parse().program;
        let mut tab_bar = None;
        let mut options = None;
        for_each_component_class(&mut program, None, |class| {
            if let Some(found) = extract_config(&snippets, class, config, registry)? {
                tab_bar = found.tab_bar.map(|(descriptor, _)| descriptor);
                options = Some(found.options);
            }
            Ok(())
        })
        .unwrap();
        Outcome {
            code: Codegen::new().build(&program).code,
            tab_bar,
            options,
        }
    }

    #[test]
    fn test_pages_registered_in_order_and_rewritten() {
        let mut registry = PageRegistry::new();
        let out = extract(
            "class App extends Component { config = { pages: ['pages/index/index', 'pages/detail/index'] } }",
            &TransformConfig::default(),
            &mut registry,
        );
        assert_eq!(registry.pages(), &["pages/index/index", "pages/detail/index"]);
        assert!(out.code.contains("\"/pages/index/index\""), "{}", out.code);
        assert!(out.tab_bar.is_none());
    }

    #[test]
    fn test_sub_packages_use_root() {
        let mut registry = PageRegistry::new();
        extract(
            "class App extends Component { config = {\n\
               pages: ['pages/index/index'],\n\
               subPackages: [{ root: 'packageA/', pages: ['pages/cat', '/pages/dog'] }]\n\
             } }",
            &TransformConfig::default(),
            &mut registry,
        );
        assert_eq!(
            registry.pages(),
            &["pages/index/index", "packageA/pages/cat", "packageA/pages/dog"]
        );
    }

    #[test]
    fn test_tab_bar_rewrite() {
        let mut registry = PageRegistry::new();
        let config = TransformConfig::from_json(
            r#"{ "router": { "mode": "browser", "basename": "/app/", "customRoutes": { "/a": "/b" } } }"#,
        )
        .unwrap();
        let out = extract(
            "class App extends Component { config = {\n\
               pages: ['pages/index/index'],\n\
               tabBar: { position: 'top', list: [{ pagePath: 'pages/index/index', iconPath: 'img/home.png' }] }\n\
             } }",
            &config,
            &mut registry,
        );
        let tab_bar = out.tab_bar.unwrap();
        assert_eq!(tab_bar.position, TabBarPosition::Top);
        assert_eq!(tab_bar.list[0].page_path.as_deref(), Some("/pages/index/index"));
        assert_eq!(tab_bar.list[0].icon_path.as_deref(), Some("img/home.png"));
        let code = out.code.replace('\'', "\"");
        assert!(code.contains("require(\"./img/home.png\")"), "{code}");
        assert!(code.contains("mode: \"browser\""), "{code}");
        assert!(code.contains("basename: \"/app\""), "{code}");
        assert!(code.contains("\"/a\": \"/b\""), "{code}");
    }

    #[test]
    fn test_page_options_and_non_literal_config() {
        let mut registry = PageRegistry::new();
        let out = extract(
            "class P extends Component { config = { onReachBottomDistance: 200, title: 'x', handler: foo() } }",
            &TransformConfig::default(),
            &mut registry,
        );
        let options = out.options.unwrap();
        assert_eq!(options.reach_bottom_distance_js(), "200");
        assert_eq!(options.get("title"), Some(&Value::from("x")));
        assert!(options.get("handler").is_none());

        let skipped = extract(
            "class P extends Component { config = buildConfig() }",
            &TransformConfig::default(),
            &mut registry,
        );
        assert!(skipped.options.is_none());
        assert!(registry.is_empty());
    }
}
