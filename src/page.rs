//! Page/Component Augmentor
//!
//! Runs on every script file except the application entry. Page files get
//! anchor lifecycle methods plus scroll, reach-bottom and pull-down-refresh
//! wiring driven by their declared handlers and harvested page options.
//! Every file then goes through ref capture and call-site augmentation.

use crate::capability::apply_capabilities;
use crate::component::{
    ensure_delegating_method, for_each_component_class, method_body_mut, observe_members,
};
use crate::config::TransformConfig;
use crate::config_extract::extract_config;
use crate::descriptor::PageOptions;
use crate::error::Result;
use crate::imports::{ensure_named_import, ensure_taro_default, nerv_import};
use crate::registry::PageRegistry;
use crate::snippet::Snippets;
use crate::state::{ImportBindings, LifecycleFlags, COMPONENTS_PACKAGE, NERV_NAME};
use crate::visitor::{jsx_element_name, BindingCollector, MemberMention, ReferenceCollector};
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

pub const DID_MOUNT: &str = "componentDidMount";
pub const DID_SHOW: &str = "componentDidShow";
pub const DID_HIDE: &str = "componentDidHide";
pub const PULL_DOWN_REFRESH: &str = "PullDownRefresh";

const REACH_BOTTOM_HANDLE: &str = "_offReachBottom";
const PAGE_SCROLL_HANDLE: &str = "_offPageScroll";
const PULL_DOWN_REF: &str = "pullDownRefreshRef";

/// Augment a non-entry module. `is_page` comes from registry membership.
pub fn augment_module<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
    config: &TransformConfig,
    registry: &mut PageRegistry,
    is_page: bool,
) -> Result<()> {
    if is_page {
        augment_page(snippets, program, bindings, config, registry)?;
    }
    apply_capabilities(snippets, program, bindings)?;
    if bindings.nerv.is_none() && ReferenceCollector::collect(program).uses_markup {
        program.body.insert(0, nerv_import(snippets)?);
        bindings.nerv = Some(NERV_NAME.to_string());
    }
    Ok(())
}

fn augment_page<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
    config: &TransformConfig,
    registry: &mut PageRegistry,
) -> Result<()> {
    let taro_name = bindings.taro_default.clone();

    let mut declared = LifecycleFlags::default();
    for_each_component_class(program, taro_name.as_deref(), |class| {
        let flags = observe_members(class);
        declared.has_on_reach_bottom |= flags.has_on_reach_bottom;
        declared.has_on_page_scroll |= flags.has_on_page_scroll;
        declared.has_on_pull_down_refresh |= flags.has_on_pull_down_refresh;
        Ok(())
    })?;

    let runtime = if declared.has_on_reach_bottom || declared.has_on_page_scroll {
        ensure_taro_default(snippets, program, bindings)?
    } else {
        bindings.taro_name().to_string()
    };
    let pull_down_tag = if declared.has_on_pull_down_refresh {
        Some(ensure_pull_down_import(snippets, program, bindings)?)
    } else {
        None
    };

    let mut taken = ReferenceCollector::collect(program).names;
    taken.extend(BindingCollector::collect(program));
    let mut temps = TempNames::new(taken);
    for_each_component_class(program, taro_name.as_deref(), |class| {
        let flags = observe_members(class);
        let options = extract_config(snippets, class, config, registry)?
            .map(|extraction| extraction.options)
            .unwrap_or_default();

        for name in [DID_MOUNT, DID_SHOW, DID_HIDE] {
            ensure_delegating_method(snippets, class, name)?;
        }
        if flags.has_on_reach_bottom {
            inject_reach_bottom(snippets, class, &runtime, &options)?;
        }
        if flags.has_on_page_scroll {
            inject_page_scroll(snippets, class, &runtime)?;
        }
        if flags.has_on_pull_down_refresh {
            if let Some(tag) = pull_down_tag.as_deref() {
                inject_pull_down_refresh(snippets, class, tag, &mut temps)?;
            }
        }
        Ok(())
    })
}

/// Local name of the pull-down wrapper, importing it when needed.
fn ensure_pull_down_import<'a>(
    snippets: &Snippets<'a>,
    program: &mut Program<'a>,
    bindings: &mut ImportBindings,
) -> Result<String> {
    let existing = bindings
        .components
        .iter()
        .find(|(_, component)| component.as_str() == PULL_DOWN_REFRESH)
        .map(|(local, _)| local.clone());
    if let Some(local) = existing {
        return Ok(local);
    }
    ensure_named_import(snippets, program, PULL_DOWN_REFRESH, COMPONENTS_PACKAGE)?;
    bindings
        .components
        .insert(PULL_DOWN_REFRESH.to_string(), PULL_DOWN_REFRESH.to_string());
    Ok(PULL_DOWN_REFRESH.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Show / hide listeners
// ═══════════════════════════════════════════════════════════════════════════════

/// Append `show` to did-show and `hide` to did-hide, unless did-show already mentions `marker`.
fn inject_show_hide<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    marker: &str,
    show: &str,
    hide: &str,
) -> Result<()> {
    let Some(show_body) = method_body_mut(class, DID_SHOW) else {
        return Ok(());
    };
    if MemberMention::in_statements(show_body, marker) {
        return Ok(());
    }
    show_body.push(snippets.statement(show)?);
    if let Some(hide_body) = method_body_mut(class, DID_HIDE) {
        hide_body.push(snippets.statement(hide)?);
    }
    Ok(())
}

fn inject_reach_bottom<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    runtime: &str,
    options: &PageOptions,
) -> Result<()> {
    let distance = options.reach_bottom_distance_js();
    inject_show_hide(
        snippets,
        class,
        REACH_BOTTOM_HANDLE,
        &format!(
            "this.{REACH_BOTTOM_HANDLE} = {runtime}.onReachBottom({{ callback: this.onReachBottom, ctx: this, onReachBottomDistance: {distance} }})"
        ),
        &format!("this.{REACH_BOTTOM_HANDLE} && this.{REACH_BOTTOM_HANDLE}()"),
    )
}

fn inject_page_scroll<'a>(snippets: &Snippets<'a>, class: &mut Class<'a>, runtime: &str) -> Result<()> {
    inject_show_hide(
        snippets,
        class,
        PAGE_SCROLL_HANDLE,
        &format!(
            "this.{PAGE_SCROLL_HANDLE} = {runtime}.onPageScroll({{ callback: this.onPageScroll, ctx: this }})"
        ),
        &format!("this.{PAGE_SCROLL_HANDLE} && this.{PAGE_SCROLL_HANDLE}()"),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pull-down refresh
// ═══════════════════════════════════════════════════════════════════════════════

fn inject_pull_down_refresh<'a>(
    snippets: &Snippets<'a>,
    class: &mut Class<'a>,
    tag: &str,
    temps: &mut TempNames,
) -> Result<()> {
    if let Some(render) = method_body_mut(class, "render") {
        let mut wrapper = ReturnWrapper {
            snippets,
            tag,
            temps,
            error: None,
        };
        wrapper.visit_statements(render);
        if let Some(err) = wrapper.error {
            return Err(err);
        }
    }
    inject_show_hide(
        snippets,
        class,
        PULL_DOWN_REF,
        &format!("this.{PULL_DOWN_REF} && this.{PULL_DOWN_REF}.bindEvent()"),
        &format!("this.{PULL_DOWN_REF} && this.{PULL_DOWN_REF}.unbindEvent()"),
    )
}

/// Fresh `_tempN` names that do not clash with any name the file declares or reads.
struct TempNames {
    taken: HashSet<String>,
    next: usize,
}

impl TempNames {
    fn new(taken: HashSet<String>) -> Self {
        Self { taken, next: 0 }
    }

    fn fresh(&mut self) -> String {
        loop {
            let name = format!("_temp{}", self.next);
            self.next += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Rewrites `return <expr>` in a render body into a hoisted temp plus a wrapped return.
///
/// Nested functions and classes are not entered: their returns belong to them.
struct ReturnWrapper<'s, 'a> {
    snippets: &'s Snippets<'a>,
    tag: &'s str,
    temps: &'s mut TempNames,
    error: Option<crate::error::TransformError>,
}

impl<'a> ReturnWrapper<'_, 'a> {
    /// Wrap the return's argument in place and hand back the hoisting declaration.
    fn wrap(&mut self, stmt: &mut Statement<'a>) -> Result<Option<Statement<'a>>> {
        let Statement::ReturnStatement(ret) = stmt else {
            return Ok(None);
        };
        let Some(argument) = ret.argument.as_ref() else {
            return Ok(None);
        };
        if self.is_wrapped(argument) {
            return Ok(None);
        }
        let temp = self.temps.fresh();
        let hoist = self
            .snippets
            .statement_with(&format!("const {temp} = __slot0;"), &[argument])?;
        let tag = self.tag;
        ret.argument = Some(self.snippets.expression(&format!(
            "<{tag} onRefresh={{this.onPullDownRefresh && this.onPullDownRefresh.bind(this)}} \
             ref={{ref => {{ if (ref) this.{PULL_DOWN_REF} = ref }}}}>{{{temp}}}</{tag}>"
        ))?);
        Ok(Some(hoist))
    }

    fn is_wrapped(&self, expr: &Expression<'a>) -> bool {
        match expr {
            Expression::JSXElement(element) => {
                jsx_element_name(&element.opening_element.name).as_deref() == Some(self.tag)
            }
            Expression::ParenthesizedExpression(paren) => self.is_wrapped(&paren.expression),
            _ => false,
        }
    }

    fn record(&mut self, result: Result<Option<Statement<'a>>>) -> Option<Statement<'a>> {
        match result {
            Ok(hoist) => hoist,
            Err(err) => {
                self.error.get_or_insert(err);
                None
            }
        }
    }
}

impl<'a> VisitMut<'a> for ReturnWrapper<'_, 'a> {
    fn visit_statements(&mut self, statements: &mut ArenaVec<'a, Statement<'a>>) {
        let mut index = 0;
        while index < statements.len() {
            let result = self.wrap(&mut statements[index]);
            match self.record(result) {
                Some(hoist) => {
                    statements.insert(index, hoist);
                    index += 2;
                }
                None => {
                    self.visit_statement(&mut statements[index]);
                    index += 1;
                }
            }
        }
    }

    fn visit_statement(&mut self, stmt: &mut Statement<'a>) {
        // Returns outside a statement list (`if (x) return a`) need a block for the hoist.
        if matches!(stmt, Statement::ReturnStatement(_)) {
            let result = self.wrap(stmt);
            if let Some(hoist) = self.record(result) {
                let result = self.snippets.statement("{}");
                if let Some(Statement::BlockStatement(mut block)) = self.record(result.map(Some)) {
                    let empty = self.snippets.statement(";");
                    if let Some(placeholder) = self.record(empty.map(Some)) {
                        let original = std::mem::replace(stmt, placeholder);
                        block.body.push(hoist);
                        block.body.push(original);
                        *stmt = Statement::BlockStatement(block);
                    }
                }
            }
            return;
        }
        walk_mut::walk_statement(self, stmt);
    }

    fn visit_function(&mut self, _func: &mut Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &mut ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &mut Class<'a>) {}
}
