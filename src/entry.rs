//! Entry Assembler
//!
//! Turns the application entry into the SPA root: the app class's `render`
//! becomes the router (wrapped in the tab bar and store provider when
//! configured), lifecycle hooks are bridged to the runtime, and the router
//! bootstrap is inserted after the imports.
//!
//! Route loaders are emitted as `import(__h5_chunk_N__)` and resolved to
//! their chunk-hinted specifiers after printing, see [`resolve_chunk_placeholders`].

use crate::component::{
    constructor_body_mut, ensure_delegating_method, for_each_component_class, method_body_mut,
    observe_members, property_value_mut,
};
use crate::config::{add_leading_slash, TransformConfig};
use crate::config_extract::extract_config;
use crate::descriptor::{RouteDescriptor, TabBarPosition};
use crate::error::{Result, TransformError};
use crate::imports::{
    ensure_named_import, ensure_taro_default, has_import_from, last_import_index, nerv_import,
};
use crate::page::{DID_HIDE, DID_MOUNT, DID_SHOW};
use crate::registry::PageRegistry;
use crate::snippet::Snippets;
use crate::state::*;
use crate::visitor::{jsx_element_name, property_key_name, MemberMention, ReferenceCollector, StoreScan};
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast_visit::VisitMut;
use oxc_syntax::operator::AssignmentOperator;

pub const WILL_MOUNT: &str = "componentWillMount";
pub const WILL_UNMOUNT: &str = "componentWillUnmount";
pub const APP_HANDLE: &str = "_$app";
pub const HISTORY_NAME: &str = "_taroHistory";
pub const TABS_STATE_KEY: &str = "__tabs";
pub const TAB_BAR_COMPONENTS: [&str; 4] = ["View", "Tabbar", "TabbarContainer", "TabbarPanel"];

const CHUNK_PLACEHOLDER_PREFIX: &str = "__h5_chunk_";
/// First-page path printed when no page was registered.
const MISSING_FIRST_PAGE: &str = "/undefined";

pub fn chunk_placeholder(index: usize) -> String {
    format!("{CHUNK_PLACEHOLDER_PREFIX}{index}__")
}

/// Swap each `__h5_chunk_N__` in printed code for route N's loader argument.
pub fn resolve_chunk_placeholders(code: &str, routes: &[RouteDescriptor]) -> String {
    routes
        .iter()
        .enumerate()
        .fold(code.to_string(), |code, (index, route)| {
            code.replace(&chunk_placeholder(index), &route.loader_argument())
        })
}

/// Assemble the entry file in place. Resets `registry` and refills it from the app config.
///
/// Returns the route table the printed loaders refer to.
pub fn assemble_entry<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
    config: &TransformConfig,
    registry: &mut PageRegistry,
) -> Result<Vec<RouteDescriptor>> {
    registry.reset();
    let runtime = ensure_taro_default(snippets, program, bindings)?;

    let provider = bindings
        .provider
        .clone()
        .unwrap_or_else(|| PROVIDER_NAME.to_string());
    let scan = StoreScan::scan(snippets.allocator(), program, &provider);
    let has_set_store_call = scan.has_set_store_call;
    let store = scan.store;
    SetStoreRemover.visit_program(program);

    let render_call = take_render_call(snippets, program, &runtime, bindings.nerv_name())?;

    let mut has_tab_bar = false;
    for_each_component_class(program, Some(runtime.as_str()), |class| {
        let tab_bar = extract_config(snippets, class, config, registry)?.and_then(|e| e.tab_bar);
        has_tab_bar |= tab_bar.is_some();
        synthesize_lifecycle(snippets, class, &runtime, tab_bar.as_ref().map(|(_, tabs)| tabs))?;

        // A transformed entry has no setStore call left; its render root is the provider.
        let store = store
            .as_ref()
            .filter(|_| has_set_store_call || render_returns_element(class, &provider));
        let plan = RenderPlan {
            routes: registry.routes(),
            home_page: registry.first_page().unwrap_or_default().to_string(),
            tab_bar: tab_bar.as_ref().map(|(descriptor, _)| descriptor.position),
            provider: store.map(|_| provider.as_str()),
            runtime: &runtime,
            custom_routes: config.custom_routes_json(),
        };
        replace_render(snippets, class, &plan, store)
    })?;

    insert_bootstrap(snippets, program, bindings, config, registry, &runtime, has_tab_bar)?;
    if let Some(call) = render_call {
        program.body.push(call);
    }
    Ok(registry.routes())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store setup and render call
// ═══════════════════════════════════════════════════════════════════════════════

fn is_set_store_call(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::CallExpression(call)
        if matches!(&call.callee, Expression::Identifier(ident) if ident.name.as_str() == SET_STORE_NAME))
}

/// Drops `setStore(...)` used as a statement, an assignment right-hand side, or a declarator init.
struct SetStoreRemover;

impl<'a> VisitMut<'a> for SetStoreRemover {
    fn visit_statements(&mut self, statements: &mut ArenaVec<'a, Statement<'a>>) {
        let mut index = 0;
        while index < statements.len() {
            let remove = match &mut statements[index] {
                Statement::ExpressionStatement(stmt) => match &stmt.expression {
                    Expression::AssignmentExpression(assign) => is_set_store_call(&assign.right),
                    expr => is_set_store_call(expr),
                },
                Statement::VariableDeclaration(decl) => {
                    decl.declarations
                        .retain(|declarator| !declarator.init.as_ref().is_some_and(is_set_store_call));
                    decl.declarations.is_empty()
                }
                _ => false,
            };
            if remove {
                statements.remove(index);
            } else {
                self.visit_statement(&mut statements[index]);
                index += 1;
            }
        }
    }
}

/// Remove the top-level `<runtime>.render(...)` statement and retarget it at the renderer.
fn take_render_call<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    runtime: &str,
    renderer: &str,
) -> Result<Option<Statement<'a>>> {
    let position = program.body.iter().position(|stmt| {
        let Statement::ExpressionStatement(stmt) = stmt else {
            return false;
        };
        let Expression::CallExpression(call) = &stmt.expression else {
            return false;
        };
        matches!(&call.callee, Expression::StaticMemberExpression(member)
            if member.property.name.as_str() == "render"
                && matches!(&member.object, Expression::Identifier(object) if object.name.as_str() == runtime))
    });
    let Some(index) = position else {
        return Ok(None);
    };
    let mut stmt = program.body.remove(index);
    if let Statement::ExpressionStatement(expr_stmt) = &mut stmt {
        if let Expression::CallExpression(call) = &mut expr_stmt.expression {
            if let Expression::StaticMemberExpression(member) = &mut call.callee {
                member.object = snippets.expression(renderer)?;
            }
        }
    }
    Ok(Some(stmt))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lifecycle synthesis
// ═══════════════════════════════════════════════════════════════════════════════

fn synthesize_lifecycle<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    runtime: &str,
    tabs: Option<&Expression<'a>>,
) -> Result<()> {
    let flags = observe_members(class);

    if !flags.has_constructor {
        class
            .body
            .body
            .push(snippets.class_element("constructor(props, context) { super(props, context); }")?);
    }
    if let Some(body) = constructor_body_mut(class) {
        if !MemberMention::in_statements(body, APP_HANDLE) {
            body.push(snippets.statement(&format!("{runtime}.{APP_HANDLE} = this"))?);
        }
    }

    if flags.has_did_show {
        ensure_delegating_method(snippets, class, DID_MOUNT)?;
        if let Some(body) = method_body_mut(class, DID_MOUNT) {
            if !MemberMention::in_statements(body, DID_SHOW) {
                body.push(snippets.statement(&format!("this.{DID_SHOW}()"))?);
            }
        }
    }

    if flags.has_did_hide {
        ensure_delegating_method(snippets, class, WILL_UNMOUNT)?;
        if let Some(body) = method_body_mut(class, WILL_UNMOUNT) {
            if !MemberMention::in_statements(body, DID_HIDE) {
                body.insert(0, snippets.statement(&format!("this.{DID_HIDE}()"))?);
            }
        }
    }

    if let Some(tabs) = tabs {
        ensure_delegating_method(snippets, class, WILL_MOUNT)?;
        if let Some(body) = method_body_mut(class, WILL_MOUNT) {
            if !MemberMention::in_statements(body, "initTabBarApis") {
                body.push(snippets.statement(&format!("{runtime}.initTabBarApis(this, {runtime})"))?);
            }
        }
        attach_tabs_state(snippets, class, flags.has_state, tabs)?;
    }
    Ok(())
}

/// Add `__tabs` to the initial state object, creating a `state` field when there is none.
fn attach_tabs_state<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    has_state_member: bool,
    tabs: &Expression<'a>,
) -> Result<()> {
    if !has_state_member && constructor_state_mut(class).is_none() {
        class.body.body.insert(0, snippets.class_element("state = {};")?);
    }
    let state = if property_value_mut(class, "state").is_some() {
        property_value_mut(class, "state")
    } else {
        constructor_state_mut(class)
    };
    let Some(Expression::ObjectExpression(state)) = state else {
        return Ok(());
    };
    let present = state.properties.iter().any(|property| match property {
        ObjectPropertyKind::ObjectProperty(prop) => {
            property_key_name(&prop.key).as_deref() == Some(TABS_STATE_KEY)
        }
        ObjectPropertyKind::SpreadProperty(_) => false,
    });
    if present {
        return Ok(());
    }
    let code = format!("({{ {TABS_STATE_KEY}: __slot0 }})");
    if let Expression::ObjectExpression(object) = snippets.expression_with(&code, &[tabs])? {
        if let Some(property) = object.unbox().properties.pop() {
            state.properties.push(property);
            return Ok(());
        }
    }
    Err(TransformError::Synthesis {
        template: code,
        messages: vec!["expected an object property".to_string()],
    })
}

/// Right-hand side of `this.state = {...}` in the constructor.
fn constructor_state_mut<'b, 'a>(class: &'b mut Class<'a>) -> Option<&'b mut Expression<'a>> {
    constructor_body_mut(class)?.iter_mut().rev().find_map(|stmt| {
        let Statement::ExpressionStatement(stmt) = stmt else {
            return None;
        };
        let Expression::AssignmentExpression(assign) = &mut stmt.expression else {
            return None;
        };
        let is_state = assign.operator == AssignmentOperator::Assign
            && matches!(&assign.left, AssignmentTarget::StaticMemberExpression(member)
                if member.property.name.as_str() == "state"
                    && matches!(member.object, Expression::ThisExpression(_)));
        (is_state && matches!(assign.right, Expression::ObjectExpression(_))).then_some(&mut assign.right)
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Render replacement
// ═══════════════════════════════════════════════════════════════════════════════

struct RenderPlan<'p> {
    routes: Vec<RouteDescriptor>,
    home_page: String,
    tab_bar: Option<TabBarPosition>,
    /// Provider tag, when the output is wrapped in the store provider.
    provider: Option<&'p str>,
    runtime: &'p str,
    custom_routes: String,
}

impl RenderPlan<'_> {
    fn routes_js(&self) -> String {
        let items: Vec<String> = self
            .routes
            .iter()
            .enumerate()
            .map(|(index, route)| {
                let path = serde_json::Value::from(route.path.as_str());
                format!(
                    "{{ path: {path}, componentLoader: () => import({}), isIndex: {} }}",
                    chunk_placeholder(index),
                    route.is_index
                )
            })
            .collect();
        format!("[{}]", items.join(", "))
    }

    /// `provider? > tab bar? > Router`; the store expression is `__slot0`.
    fn markup(&self) -> String {
        let mut markup = format!(
            "<Router history={{{HISTORY_NAME}}} routes={{{}}} customRoutes={{{}}} />",
            self.routes_js(),
            self.custom_routes
        );
        if let Some(position) = self.tab_bar {
            let conf = format!("conf={{this.state.{TABS_STATE_KEY}}} homePage=\"{}\"", self.home_page);
            markup = match position {
                TabBarPosition::Top => format!(
                    "<TabbarContainer><Tabbar {conf} tabbarPos={{'top'}} />\
                     <TabbarPanel>{markup}</TabbarPanel></TabbarContainer>"
                ),
                TabBarPosition::Bottom => format!(
                    "<TabbarContainer><TabbarPanel>{markup}</TabbarPanel>\
                     <Tabbar {conf} router={{{}}} /></TabbarContainer>",
                    self.runtime
                ),
            };
        }
        if let Some(provider) = self.provider {
            markup = format!("<{provider} store={{__slot0}}>{markup}</{provider}>");
        }
        markup
    }
}

fn render_returns_element(class: &mut Class<'_>, tag: &str) -> bool {
    let Some(body) = method_body_mut(class, "render") else {
        return false;
    };
    body.iter().any(|stmt| {
        let Statement::ReturnStatement(ret) = stmt else {
            return false;
        };
        let mut argument = ret.argument.as_ref();
        while let Some(Expression::ParenthesizedExpression(paren)) = argument {
            argument = Some(&paren.expression);
        }
        matches!(argument, Some(Expression::JSXElement(element))
            if jsx_element_name(&element.opening_element.name).as_deref() == Some(tag))
    })
}

fn replace_render<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    plan: &RenderPlan<'_>,
    store: Option<&Expression<'a>>,
) -> Result<()> {
    let Some(body) = method_body_mut(class, "render") else {
        return Ok(());
    };
    let code = format!("render() {{ return ({}); }}", plan.markup());
    let slots: Vec<&Expression<'a>> = store.into_iter().collect();
    let ClassElement::MethodDefinition(method) = snippets.class_element_with(&code, &slots)? else {
        return Err(TransformError::Synthesis {
            template: code,
            messages: vec!["expected a render method".to_string()],
        });
    };
    if let Some(function_body) = method.unbox().value.unbox().body {
        *body = function_body.unbox().statements;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Bootstrap
// ═══════════════════════════════════════════════════════════════════════════════

fn declares(program: &Program<'_>, name: &str) -> bool {
    program.body.iter().any(|stmt| match stmt {
        Statement::VariableDeclaration(decl) => decl.declarations.iter().any(|declarator| {
            declarator
                .id
                .get_binding_identifier()
                .is_some_and(|ident| ident.name.as_str() == name)
        }),
        _ => false,
    })
}

fn calls_function(program: &Program<'_>, name: &str) -> bool {
    program.body.iter().any(|stmt| {
        matches!(stmt, Statement::ExpressionStatement(stmt)
            if matches!(&stmt.expression, Expression::CallExpression(call)
                if matches!(&call.callee, Expression::Identifier(ident) if ident.name.as_str() == name)))
    })
}

/// Insert the bootstrap statements after the last import, skipping any already present.
fn insert_bootstrap<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
    config: &TransformConfig,
    registry: &PageRegistry,
    runtime: &str,
    has_tab_bar: bool,
) -> Result<()> {
    let mut extra = Vec::new();

    if bindings.nerv.is_none() && ReferenceCollector::collect(program).uses_markup {
        extra.push(nerv_import(snippets)?);
        bindings.nerv = Some(NERV_NAME.to_string());
    }
    if has_tab_bar {
        if has_import_from(program, COMPONENTS_PACKAGE) {
            for name in TAB_BAR_COMPONENTS {
                ensure_named_import(snippets, program, name, COMPONENTS_PACKAGE)?;
            }
        } else {
            extra.push(snippets.statement(&format!(
                "import {{ {} }} from '{COMPONENTS_PACKAGE}'",
                TAB_BAR_COMPONENTS.join(", ")
            ))?);
        }
    }
    if !has_import_from(program, ROUTER_PACKAGE) {
        extra.push(snippets.statement(&format!(
            "import {{ Router, createHistory, mountApis }} from '{ROUTER_PACKAGE}'"
        ))?);
    }
    if !MemberMention::in_statements(&program.body, "initPxTransform") {
        extra.push(snippets.statement(&format!(
            "{runtime}.initPxTransform({})",
            config.px_transform_json()
        ))?);
    }
    if !declares(program, HISTORY_NAME) {
        let first_page = registry
            .first_page()
            .map(add_leading_slash)
            .unwrap_or_else(|| MISSING_FIRST_PAGE.to_string());
        extra.push(snippets.statement(&format!(
            "const {HISTORY_NAME} = createHistory({{ mode: {}, basename: {}, customRoutes: {}, firstPagePath: {} }});",
            serde_json::Value::from(config.router.mode.as_str()),
            serde_json::Value::from(config.basename()),
            config.custom_routes_json(),
            serde_json::Value::from(first_page),
        ))?);
    }
    if !calls_function(program, "mountApis") {
        extra.push(snippets.statement(&format!("mountApis({HISTORY_NAME});"))?);
    }

    let at = last_import_index(program).map_or(0, |index| index + 1);
    for (offset, stmt) in extra.into_iter().enumerate() {
        program.body.insert(at + offset, stmt);
    }
    Ok(())
}
