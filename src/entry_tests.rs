//! End-to-end tests for the entry file transform.

use crate::config::{RouterMode, TransformConfig};
use crate::imports::MemoryProbe;
use crate::registry::PageRegistry;
use crate::transform::{transform_source, FileKind};
use std::path::Path;

const APP_PATH: &str = "/proj/src/app.js";

fn config() -> TransformConfig {
    TransformConfig::default().with_project_root("/proj")
}

fn transform_entry(source: &str, config: &TransformConfig, registry: &mut PageRegistry) -> String {
    let probe = MemoryProbe::new(["/proj/src/store/index.js"]);
    transform_source(source, Path::new(APP_PATH), FileKind::Entry, config, registry, &probe)
        .unwrap()
        .replace('\'', "\"")
}

fn position(code: &str, needle: &str) -> usize {
    code.find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in:\n{code}"))
}

const REDUX_APP: &str = r#"
import Taro, { Component } from '@tarojs/taro'
import { Provider, setStore } from '@tarojs/redux'
import Index from './pages/index/index'
import configStore from './store'
import './app.scss'

const store = configStore()
setStore(store)

class App extends Component {
  config = {
    pages: ['pages/index/index', 'pages/detail/index'],
    window: { navigationBarTitleText: 'Shop' }
  }

  componentDidShow () {}

  componentDidHide () {}

  render () {
    return (
      <Provider store={store}>
        <Index />
      </Provider>
    )
  }
}

Taro.render(<App />, document.getElementById('app'))
"#;

#[test]
fn test_routes_follow_pages_order() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    assert_eq!(registry.pages(), ["pages/index/index", "pages/detail/index"]);
    let index = position(&code, "path: \"/pages/index/index\"");
    let detail = position(&code, "path: \"/pages/detail/index\"");
    assert!(index < detail);
    assert_eq!(code.matches("isIndex: true").count(), 1, "{code}");
    assert_eq!(code.matches("isIndex: false").count(), 1, "{code}");
    assert!(
        code.contains("import(/* webpackChunkName: \"index_index\" */ \"./pages/index/index\")"),
        "{code}"
    );
    assert!(
        code.contains("import(/* webpackChunkName: \"detail_index\" */ \"./pages/detail/index\")"),
        "{code}"
    );
    assert!(!code.contains("__h5_chunk_"), "{code}");
    assert!(!code.contains("Tabbar"), "{code}");
}

#[test]
fn test_imports_are_rewritten_for_h5() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    assert!(code.contains("from \"@tarojs/taro-h5\""), "{code}");
    assert!(code.contains("from \"@tarojs/redux-h5\""), "{code}");
    assert!(code.contains("from \"./store/index\""), "{code}");
    assert!(code.contains("import \"./app.scss\""), "{code}");
    assert!(!code.contains("import Index"), "{code}");
    assert!(code.contains("import Nerv from \"nervjs\""), "{code}");
}

#[test]
fn test_bootstrap_follows_imports_in_order() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    let last_user_import = position(&code, "import \"./app.scss\"");
    let nerv = position(&code, "import Nerv from \"nervjs\"");
    let router = position(&code, "from \"@tarojs/router\"");
    let px = position(&code, "Taro.initPxTransform(");
    let history = position(&code, "const _taroHistory = createHistory(");
    let mount = position(&code, "mountApis(_taroHistory)");
    let store = position(&code, "const store = configStore()");

    assert!(last_user_import < nerv);
    assert!(nerv < router && router < px && px < history && history < mount);
    assert!(mount < store);
    assert!(code.contains("\"designWidth\": 750"), "{code}");
    assert!(code.contains("mode: \"hash\""), "{code}");
    assert!(code.contains("basename: \"/\""), "{code}");
    assert!(code.contains("firstPagePath: \"/pages/index/index\""), "{code}");
}

#[test]
fn test_provider_wraps_router_and_store_setup_is_removed() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    let provider = position(&code, "<Provider store={store}>");
    let router = position(&code, "<Router history={_taroHistory}");
    assert!(provider < router);
    assert!(!code.contains("setStore(store)"), "{code}");
    assert!(!code.contains("<Index"), "{code}");
}

#[test]
fn test_render_call_moves_to_end_as_nerv() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    assert!(!code.contains("Taro.render("), "{code}");
    let render = position(&code, "Nerv.render(<App />, document.getElementById(\"app\"))");
    assert!(render > position(&code, "class App"));
    assert!(code[render..].lines().count() <= 2, "{code}");
}

#[test]
fn test_render_call_uses_imported_renderer_alias() {
    let source = r#"
import Taro, { Component } from '@tarojs/taro'
import N from 'nervjs'
class App extends Component {
  config = { pages: ['pages/index/index'] }
  render () { return null }
}
Taro.render(<App />, document.getElementById('app'))
"#;
    let mut registry = PageRegistry::new();
    let code = transform_entry(source, &config(), &mut registry);

    assert!(code.contains("import N from \"nervjs\""), "{code}");
    assert!(code.contains("N.render(<App />"), "{code}");
    assert!(!code.contains("Nerv"), "{code}");
}

#[test]
fn test_duplicate_lifecycle_method_gets_injection_in_last_definition() {
    let source = r#"
import Taro, { Component } from '@tarojs/taro'
class App extends Component {
  config = { pages: ['pages/index/index'] }
  componentDidHide () {}
  componentWillUnmount () { first() }
  componentWillUnmount () { second() }
  render () { return null }
}
"#;
    let mut registry = PageRegistry::new();
    let code = transform_entry(source, &config(), &mut registry);

    assert_eq!(code.matches("this.componentDidHide()").count(), 1, "{code}");
    let hide = position(&code, "this.componentDidHide()");
    assert!(position(&code, "first()") < hide, "{code}");
    assert!(hide < position(&code, "second()"), "{code}");
    assert_eq!(code.matches("componentWillUnmount() {").count(), 2, "{code}");
}

#[test]
fn test_lifecycle_bridges() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(REDUX_APP, &config(), &mut registry);

    let ctor = position(&code, "constructor(props, context) {");
    let super_call = position(&code, "super(props, context)");
    let app = position(&code, "Taro._$app = this");
    assert!(ctor < super_call && super_call < app);

    // did-mount is synthesized: one guarded delegating call, then the show call.
    let did_mount = position(&code, "componentDidMount() {");
    let guarded = position(&code, "super.componentDidMount && super.componentDidMount()");
    let show = position(&code, "this.componentDidShow()");
    assert!(did_mount < guarded && guarded < show);

    // The hide call leads will-unmount.
    let will_unmount = position(&code, "componentWillUnmount() {");
    let hide = position(&code, "this.componentDidHide()");
    let guarded = position(&code, "super.componentWillUnmount && super.componentWillUnmount()");
    assert!(will_unmount < hide && hide < guarded);
}

#[test]
fn test_existing_constructor_gains_single_app_handle() {
    let source = r#"
import Taro, { Component } from '@tarojs/taro'
class App extends Component {
  constructor (props) {
    super(props)
    this.state = { ready: false }
  }
  config = { pages: ['pages/index/index'] }
  render () { return null }
}
"#;
    let mut registry = PageRegistry::new();
    let once = transform_entry(source, &config(), &mut registry);
    let twice = transform_entry(&once, &config(), &mut registry);

    for code in [&once, &twice] {
        assert_eq!(code.matches("_$app = this").count(), 1, "{code}");
        assert_eq!(code.matches("constructor(").count(), 1, "{code}");
        assert!(position(code, "this.state = { ready: false }") < position(code, "_$app = this"));
    }
}

#[test]
fn test_rerun_does_not_duplicate_synthesis() {
    let mut registry = PageRegistry::new();
    let once = transform_entry(REDUX_APP, &config(), &mut registry);
    let twice = transform_entry(&once, &config(), &mut registry);

    assert_eq!(registry.pages(), ["pages/index/index", "pages/detail/index"]);
    for needle in [
        "componentDidMount() {",
        "componentWillUnmount() {",
        "this.componentDidShow()",
        "this.componentDidHide()",
        "Taro.initPxTransform(",
        "const _taroHistory",
        "mountApis(_taroHistory)",
        "from \"@tarojs/router\"",
        "import Nerv",
        "Nerv.render(",
        "<Provider store={store}>",
        "isIndex: true",
    ] {
        assert_eq!(twice.matches(needle).count(), 1, "`{needle}` in:\n{twice}");
    }
}

const TAB_BAR_APP: &str = r#"
import Taro, { Component } from '@tarojs/taro'

class App extends Component {
  config = {
    pages: ['pages/index/index', 'pages/mine/index'],
    tabBar: {
      position: 'top',
      list: [
        { pagePath: 'pages/index/index', text: 'Home', iconPath: 'img/home.png', selectedIconPath: 'img/home-on.png' },
        { pagePath: 'pages/mine/index', text: 'Mine' }
      ]
    }
  }

  render () { return null }
}
"#;

#[test]
fn test_top_tab_bar_precedes_panel() {
    let mut registry = PageRegistry::new();
    let code = transform_entry(TAB_BAR_APP, &config(), &mut registry);

    let container = position(&code, "<TabbarContainer>");
    let tab_bar = position(&code, "<Tabbar conf={this.state.__tabs}");
    let panel = position(&code, "<TabbarPanel>");
    assert!(container < tab_bar && tab_bar < panel);
    assert!(code.contains("homePage=\"pages/index/index\""), "{code}");
    assert!(code.contains("tabbarPos={\"top\"}"), "{code}");
    assert!(!code.contains("router={Taro}"), "{code}");
}

#[test]
fn test_bottom_tab_bar_follows_panel() {
    let source = TAB_BAR_APP.replace("position: 'top',", "");
    let mut registry = PageRegistry::new();
    let code = transform_entry(&source, &config(), &mut registry);

    let panel = position(&code, "<TabbarPanel>");
    let tab_bar = position(&code, "<Tabbar conf={this.state.__tabs}");
    assert!(panel < tab_bar);
    assert!(code.contains("router={Taro}"), "{code}");
}

#[test]
fn test_duplicate_tab_bar_position_last_wins() {
    let mut registry = PageRegistry::new();
    let bottom = TAB_BAR_APP.replace("position: 'top',", "position: 'top', position: 'bottom',");
    let code = transform_entry(&bottom, &config(), &mut registry);
    assert!(position(&code, "<TabbarPanel>") < position(&code, "<Tabbar conf={this.state.__tabs}"));
    assert!(code.contains("router={Taro}"), "{code}");
    assert!(!code.contains("tabbarPos"), "{code}");

    let top = TAB_BAR_APP.replace("position: 'top',", "position: 'bottom', position: 'top',");
    let code = transform_entry(&top, &config(), &mut registry);
    assert!(position(&code, "<Tabbar conf={this.state.__tabs}") < position(&code, "<TabbarPanel>"));
}

#[test]
fn test_tab_bar_config_and_state() {
    let mut config = config();
    config.router.mode = RouterMode::Browser;
    config.router.basename = Some("shop/".to_string());
    let mut registry = PageRegistry::new();
    let code = transform_entry(TAB_BAR_APP, &config, &mut registry);

    assert!(code.contains("require(\"./img/home.png\")"), "{code}");
    assert!(code.contains("require(\"./img/home-on.png\")"), "{code}");
    assert!(code.contains("pagePath: \"/pages/mine/index\""), "{code}");
    assert!(code.contains("mode: \"browser\""), "{code}");
    assert!(code.contains("basename: \"/shop\""), "{code}");
    assert!(code.contains("__tabs: {"), "{code}");
    assert!(code.contains("Taro.initTabBarApis(this, Taro)"), "{code}");
    assert!(position(&code, "componentWillMount() {") < position(&code, "Taro.initTabBarApis"));

    let components = position(&code, "TabbarPanel } from \"@tarojs/components\"");
    assert!(components < position(&code, "from \"@tarojs/router\""));
}

#[test]
fn test_empty_registry_keeps_undefined_first_page() {
    let source = r#"
import Taro, { Component } from '@tarojs/taro'
class App extends Component {
  render () { return null }
}
"#;
    let mut registry = PageRegistry::new();
    registry.register("pages/stale/index");
    let code = transform_entry(source, &config(), &mut registry);

    assert!(registry.is_empty());
    assert!(code.contains("firstPagePath: \"/undefined\""), "{code}");
    assert!(code.contains("routes={[]}"), "{code}");
}

#[test]
fn test_sub_packages_register_with_root() {
    let source = r#"
import Taro, { Component } from '@tarojs/taro'
class App extends Component {
  config = {
    pages: ['pages/index/index'],
    subPackages: [{ root: 'packageA/', pages: ['pages/cat/index'] }]
  }
  render () { return null }
}
"#;
    let mut registry = PageRegistry::new();
    let code = transform_entry(source, &config(), &mut registry);

    assert_eq!(registry.pages(), ["pages/index/index", "packageA/pages/cat/index"]);
    assert!(code.contains("path: \"/packageA/pages/cat/index\""), "{code}");
    assert!(
        code.contains("webpackChunkName: \"packageA_cat_index\""),
        "{code}"
    );
}
