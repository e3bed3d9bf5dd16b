//! End-to-end checks over the JavaScript fixtures in `tests/fixtures/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exportscope::analysis::{parse_unit, ModuleExports};
use exportscope::resolve::{EntryCache, ExportResolver, NodeHost};

fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel)
}

fn unit(rel: &str) -> ModuleExports {
    let source = fs::read_to_string(fixture(rel)).unwrap();
    parse_unit(&source).unwrap()
}

fn entry(rel: &str) -> Vec<String> {
    let mut resolver =
        ExportResolver::with_cache(NodeHost::default(), Arc::new(EntryCache::new())).unwrap();
    resolver.parse_entry_file(&fixture(rel)).unwrap().exports
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_module_exports_member() {
    assert_eq!(unit("module-exports.js").exports, names(&["a"]));
}

#[test]
fn test_exports_members() {
    assert_eq!(unit("exports.js").exports, names(&["a", "b", "c"]));
}

#[test]
fn test_readme_example() {
    assert_eq!(
        unit("readme/main.js").exports,
        names(&["a", "b", "d", "e", "__esModule"])
    );
}

#[test]
fn test_typescript_export_star() {
    let module = unit("transpiler/exportStar.js");
    assert_eq!(module.exports, names(&["__esModule"]));
    assert_eq!(module.reexports, names(&["./foo"]));

    assert_eq!(
        entry("transpiler/exportStar.js"),
        names(&["__esModule", "foo", "bar"])
    );
}

#[test]
fn test_babel_reexport_loop() {
    let module = unit("transpiler/babel.js");
    assert_eq!(module.exports, names(&["__esModule"]));
    assert_eq!(module.reexports, names(&["./foo"]));

    assert_eq!(
        entry("transpiler/babel.js"),
        names(&["__esModule", "foo", "bar"])
    );
}

#[test]
fn test_umd_simple() {
    assert_eq!(unit("umd/simple.js").exports, names(&["umd"]));
}

#[test]
fn test_umd_minified() {
    assert_eq!(unit("umd/min.js").exports, names(&["umd", "min"]));
}

#[test]
fn test_function_wrappers() {
    assert_eq!(
        unit("function/exports-in-param.js").exports,
        names(&["a", "b", "c"])
    );
    assert_eq!(
        unit("function/exports-renamed-param.js").exports,
        names(&["a", "b", "c"])
    );
}

#[test]
fn test_define_property_variants() {
    assert_eq!(
        unit("objectDefineProperty/enumerable.js").exports,
        names(&["a", "b", "c"])
    );
    assert_eq!(
        unit("objectDefineProperty/value.js").exports,
        names(&["a"])
    );
    assert_eq!(
        unit("objectDefineProperty/getter.js").exports,
        names(&["a", "b", "c", "d", "e"])
    );
    assert!(unit("objectDefineProperty/getter-override.js")
        .exports
        .is_empty());
}

#[test]
fn test_export_object_literals() {
    let spread = unit("export-object/spread.js");
    assert_eq!(spread.exports, names(&["a", "b", "c"]));
    assert!(spread.reexports.is_empty());

    assert_eq!(
        unit("export-object/require.js").exports,
        names(&["a", "b", "c", "d"])
    );
}

#[test]
fn test_reexport_override() {
    let module = unit("reexport/override.js");
    assert!(module.exports.is_empty());
    assert_eq!(module.reexports, names(&["./foo"]));

    assert_eq!(entry("reexport/override.js"), names(&["foo"]));
}

#[test]
fn test_reexport_override_object() {
    let module = unit("reexport/override-object.js");
    assert!(module.exports.is_empty());
    assert_eq!(module.reexports, names(&["./foo", "./bar"]));

    assert_eq!(entry("reexport/override-object.js"), names(&["foo", "bar"]));
}
