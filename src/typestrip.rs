//! Type lowering for `.ts`/`.tsx` sources.
//!
//! Only TypeScript syntax is removed. Markup, module syntax and value
//! imports stay as written so the later passes see the same shapes they
//! see in plain script files.

use crate::error::{Result, TransformError};
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxOptions, TransformOptions, Transformer, TypeScriptOptions};
use std::path::Path;

/// Module source type for a file path; markup is allowed everywhere except `.ts`.
pub fn source_type_for(path: &Path) -> SourceType {
    let base = SourceType::default().with_module(true);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => base.with_typescript(true),
        Some("tsx") => base.with_typescript(true).with_jsx(true),
        _ => base.with_jsx(true),
    }
}

pub fn strip_types<'a>(allocator: &'a Allocator, path: &Path, program: &mut Program<'a>) -> Result<()> {
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
    let options = TransformOptions {
        typescript: TypeScriptOptions {
            // Imports only used by markup look unused to the type pass.
            only_remove_type_imports: true,
            ..TypeScriptOptions::default()
        },
        jsx: JsxOptions {
            jsx_plugin: false,
            display_name_plugin: false,
            jsx_self_plugin: false,
            jsx_source_plugin: false,
            ..JsxOptions::default()
        },
        ..TransformOptions::default()
    };
    let ret = Transformer::new(allocator, path, &options).build_with_scoping(scoping, program);
    if !ret.errors.is_empty() {
        return Err(TransformError::TypeStrip {
            file: path.display().to_string(),
            messages: ret.errors.iter().map(|e| e.to_string()).collect(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;

    #[test]
    fn test_source_type_for() {
        assert!(source_type_for(Path::new("a.tsx")).is_typescript());
        assert!(source_type_for(Path::new("a.tsx")).is_jsx());
        assert!(!source_type_for(Path::new("a.ts")).is_jsx());
        assert!(source_type_for(Path::new("a.js")).is_jsx());
    }

    #[test]
    fn test_strip_types_keeps_markup_and_imports() {
        let allocator = Allocator::default();
        let path = Path::new("src/pages/index/index.tsx");
        let code = "import Taro from '@tarojs/taro';\nimport { View } from '@tarojs/components';\n\
                    interface Props { title: string }\n\
                    export default class Index extends Taro.Component<Props> {\n\
                      count: number = 0;\n\
                      render() { const t: string = this.props.title; return <View>{t}</View> }\n\
                    }";
        let mut program = Parser::new(&allocator, code, source_type_for(path)).parse().program;
        strip_types(&allocator, path, &mut program).unwrap();
        let out = Codegen::new().build(&program).code;
        assert!(!out.contains("interface"), "{out}");
        assert!(!out.contains(": string"), "{out}");
        assert!(out.contains("<View>{t}</View>"), "{out}");
        assert!(out.contains("@tarojs/components"), "{out}");
    }
}
