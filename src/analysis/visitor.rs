//! Single-pass export visitor.
//!
//! Walks a syntax tree in document order and reports every recognized
//! export mutation to an [`ExportSink`]. Nested module factories (plain
//! wrapper calls and UMD factories) are walked once, under a child scope that
//! adds the factory parameter as an alias of the export object. The walk is
//! iterative, so nesting depth is bounded by the heap, not the stack.

use std::collections::HashMap;

use tracing::trace;
use tree_sitter::Node;

use super::idioms::{
    body_statements, call_arguments, callee, extract_require_path, first_statement,
    is_accepted_getter_return, is_export_alias, is_exports_and_module_guard, is_function_literal,
    is_identifier, is_module_exports, is_object_define_property, is_object_keys, is_static_value,
    named_children, node_text, parameter_name, statement_expression, string_value, unparenthesize,
    EXPORTS,
};
use super::sink::ExportSink;

/// Bindings in effect for one export scope.
#[derive(Debug, Clone)]
struct Scope {
    /// Node id of the body this scope covers; `None` for the top level.
    root: Option<usize>,
    /// Identifiers that denote the export object in this scope.
    aliases: Vec<String>,
    /// UMD detection only runs at the entry scope.
    detect_umd: bool,
    /// `var _foo = require('./foo')` bindings: local name -> specifier.
    required_modules: HashMap<String, String>,
}

impl Scope {
    fn top_level() -> Self {
        Self {
            root: None,
            aliases: vec![EXPORTS.to_string()],
            detect_umd: true,
            required_modules: HashMap::new(),
        }
    }

    /// Scope for a factory body whose export object is passed in as the
    /// parameter `alias`. Enclosing aliases and bindings stay visible to the
    /// closure.
    fn nested(&self, root: usize, alias: Option<String>) -> Self {
        let mut aliases = self.aliases.clone();
        aliases.extend(alias);
        Self {
            root: Some(root),
            aliases,
            detect_umd: false,
            required_modules: self.required_modules.clone(),
        }
    }
}

/// Visitor state for one traversal pass over one unit.
pub struct ExportVisitor<'s, 'src, S: ExportSink + ?Sized> {
    sink: &'s mut S,
    source: &'src str,
    scope: Scope,
    /// Scopes suspended while a nested factory body is walked.
    enclosing: Vec<Scope>,
    /// Factory bodies claimed by a call, keyed by node id, with the
    /// parameter that receives the export object.
    factories: HashMap<usize, Option<String>>,
}

impl<'s, 'src, S: ExportSink + ?Sized> ExportVisitor<'s, 'src, S> {
    /// Visitor for the top-level scope of a unit.
    pub fn new(sink: &'s mut S, source: &'src str) -> Self {
        Self {
            sink,
            source,
            scope: Scope::top_level(),
            enclosing: Vec::new(),
            factories: HashMap::new(),
        }
    }

    /// Visit `node` and all of its descendants in document order.
    pub fn visit(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        loop {
            self.enter(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                self.leave(cursor.node());
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    fn enter(&mut self, node: Node<'_>) {
        if let Some(alias) = self.factories.remove(&node.id()) {
            trace!(alias = alias.as_deref().unwrap_or(EXPORTS), "entering nested export scope");
            let nested = self.scope.nested(node.id(), alias);
            self.enclosing.push(std::mem::replace(&mut self.scope, nested));
        }

        match node.kind() {
            "variable_declaration" | "lexical_declaration" => self.visit_declaration(node),
            "assignment_expression" => self.visit_assignment(node),
            "call_expression" => self.visit_call(node),
            _ => {}
        }
    }

    fn leave(&mut self, node: Node<'_>) {
        if self.scope.root == Some(node.id()) {
            if let Some(enclosing) = self.enclosing.pop() {
                self.scope = enclosing;
            }
        }
    }

    /// Walk `body`, a descendant of the current node, with the export object
    /// renamed to `alias`.
    fn descend(&mut self, body: Node<'_>, alias: Option<String>) {
        self.factories.insert(body.id(), alias);
    }

    /// `exports`, a renamed alias of it, or `module.exports`.
    fn is_export_object(&self, node: &Node<'_>) -> bool {
        let node = unparenthesize(*node);
        is_module_exports(&node, self.source)
            || is_export_alias(&node, self.source, &self.scope.aliases)
    }

    // ===== Alias capture =====

    /// `var _foo = require('./foo')`
    fn visit_declaration(&mut self, node: Node<'_>) {
        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            if let Some(path) = extract_require_path(&value, self.source) {
                let local = node_text(&name, self.source).to_string();
                self.scope.required_modules.insert(local, path);
            }
        }
    }

    // ===== Assignments =====

    fn visit_assignment(&mut self, node: Node<'_>) {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left").map(unparenthesize),
            node.child_by_field_name("right").map(unparenthesize),
        ) else {
            return;
        };

        // exports.foo = … | module.exports.foo = … | exports['foo'] = …
        if let Some(name) = self.export_property_name(left) {
            trace!(name = %name, "property assignment export");
            self.sink.add_export(&name);
        }

        // exports = … | module.exports = …
        if self.is_export_object(&left) {
            self.reassign_export_object(right);
        }
    }

    fn export_property_name(&self, left: Node<'_>) -> Option<String> {
        let object = left.child_by_field_name("object")?;
        if !self.is_export_object(&object) {
            return None;
        }
        match left.kind() {
            "member_expression" => {
                let property = left.child_by_field_name("property")?;
                (property.kind() == "property_identifier")
                    .then(|| node_text(&property, self.source).to_string())
            }
            "subscript_expression" => {
                let index = unparenthesize(left.child_by_field_name("index")?);
                string_value(&index, self.source)
            }
            _ => None,
        }
    }

    fn reassign_export_object(&mut self, right: Node<'_>) {
        // module.exports = require('./foo')
        if let Some(path) = extract_require_path(&right, self.source) {
            trace!(specifier = %path, "export object replaced by a required module");
            self.sink.clear_exports();
            self.sink.clear_reexports();
            self.sink.add_reexport(&path);
            return;
        }

        // module.exports = { … }
        if right.kind() != "object" {
            return;
        }
        trace!("export object replaced by an object literal");
        self.sink.clear_exports();
        self.sink.clear_reexports();

        for property in named_children(right) {
            match property.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        property.child_by_field_name("key"),
                        property.child_by_field_name("value").map(unparenthesize),
                    ) else {
                        continue;
                    };
                    if key.kind() == "property_identifier" && is_static_value(&value, self.source)
                    {
                        self.sink.add_export(node_text(&key, self.source));
                    }
                }
                // { a }
                "shorthand_property_identifier" => {
                    self.sink.add_export(node_text(&property, self.source));
                }
                // { ...require('./foo') }
                "spread_element" => {
                    let spread = named_children(property).into_iter().next();
                    if let Some(path) = spread.and_then(|s| extract_require_path(&s, self.source)) {
                        self.sink.add_reexport(&path);
                    }
                }
                _ => {}
            }
        }
    }

    // ===== Calls =====

    fn visit_call(&mut self, node: Node<'_>) {
        let Some(callee) = callee(node) else {
            return;
        };
        let args = call_arguments(node);

        self.visit_export_star_helper(callee, &args);
        self.visit_keys_reexport(callee, &args);

        if is_object_define_property(&callee, self.source) {
            self.visit_define_property(&args);
        }

        if is_function_literal(&callee) {
            if self.scope.detect_umd {
                if let Some((factory, alias)) = self.match_umd(callee, &args) {
                    trace!(alias = %alias, "UMD wrapper detected");
                    if let Some(body) = factory.child_by_field_name("body") {
                        self.descend(body, Some(alias));
                    }
                    return;
                }
            }
            self.visit_factory_wrapper(callee, &args);
        }
    }

    /// `__exportStar(require('./foo'), exports)`, `tslib.__exportStar(…)` and
    /// the older `__export(require('./foo'))`.
    fn visit_export_star_helper(&mut self, callee: Node<'_>, args: &[Node<'_>]) {
        let named = |name: &str| {
            is_identifier(&callee, self.source, name)
                || (callee.kind() == "member_expression"
                    && callee
                        .child_by_field_name("property")
                        .map(|p| node_text(&p, self.source) == name)
                        .unwrap_or(false))
        };

        let path = if named("__exportStar") {
            match args {
                [module, target, ..] if self.is_export_object(target) => {
                    extract_require_path(module, self.source)
                }
                _ => None,
            }
        } else if named("__export") {
            match args {
                [module] => extract_require_path(module, self.source),
                _ => None,
            }
        } else {
            None
        };

        if let Some(path) = path {
            trace!(specifier = %path, "transpiler star re-export");
            self.sink.add_reexport(&path);
        }
    }

    /// Down-level compiled `export * from './foo'`:
    ///
    /// ```js
    /// var _foo = require('./foo');
    /// Object.keys(_foo).forEach(function (key) {
    ///   if (key === 'default' || key === '__esModule') return;
    ///   if (key in exports && exports[key] === _foo[key]) return;
    ///   Object.defineProperty(exports, key, { … });
    /// });
    /// ```
    fn visit_keys_reexport(&mut self, callee: Node<'_>, args: &[Node<'_>]) {
        if callee.kind() != "member_expression" {
            return;
        }
        let is_for_each = callee
            .child_by_field_name("property")
            .map(|p| node_text(&p, self.source) == "forEach")
            .unwrap_or(false);
        if !is_for_each {
            return;
        }

        let Some(keys_call) = callee.child_by_field_name("object").map(unparenthesize) else {
            return;
        };
        if keys_call.kind() != "call_expression" {
            return;
        }
        let is_keys = self::callee(keys_call)
            .map(|c| is_object_keys(&c, self.source))
            .unwrap_or(false);
        if !is_keys {
            return;
        }

        let Some(path) = call_arguments(keys_call)
            .first()
            .filter(|arg| arg.kind() == "identifier")
            .and_then(|arg| self.scope.required_modules.get(node_text(arg, self.source)))
            .cloned()
        else {
            return;
        };

        let iteratee = match args.first() {
            Some(f) if matches!(f.kind(), "function_expression" | "arrow_function") => *f,
            _ => return,
        };
        let Some(statements) = body_statements(iteratee) else {
            return;
        };
        if self.is_reexport_loop_body(&statements) {
            trace!(specifier = %path, "key-copy loop re-export");
            self.sink.add_reexport(&path);
        }
    }

    /// Two guard `if`s followed by an `Object.defineProperty(…)` call.
    fn is_reexport_loop_body(&self, statements: &[Node<'_>]) -> bool {
        let [skip_default, skip_present, define, ..] = statements else {
            return false;
        };
        if skip_default.kind() != "if_statement" || skip_present.kind() != "if_statement" {
            return false;
        }
        statement_expression(*define)
            .filter(|expr| expr.kind() == "call_expression")
            .and_then(self::callee)
            .map(|c| is_object_define_property(&c, self.source))
            .unwrap_or(false)
    }

    /// `Object.defineProperty(exports, 'name', { … })`.
    ///
    /// The descriptor decides on its own: a qualifying descriptor adds the
    /// name, any other descriptor removes it even when an earlier idiom added
    /// it. A `configurable` key disqualifies, whatever its value.
    fn visit_define_property(&mut self, args: &[Node<'_>]) {
        let [target, key, descriptor, ..] = args else {
            return;
        };
        if !self.is_export_object(target) {
            return;
        }
        let Some(name) = string_value(key, self.source) else {
            return;
        };
        if descriptor.kind() != "object" {
            return;
        }

        let fields = self.descriptor_fields(*descriptor);

        let enumerable = fields
            .get("enumerable")
            .map(|value| is_true_literal(value, self.source))
            .unwrap_or(true);
        let has_value = fields.contains_key("value");
        let has_static_getter = fields
            .get("get")
            .map(|getter| getter_returns_static(*getter))
            .unwrap_or(false);
        let configurable = fields.contains_key("configurable");

        if enumerable && (has_value || has_static_getter) && !configurable {
            trace!(name = %name, "defineProperty export");
            self.sink.add_export(&name);
        } else {
            trace!(name = %name, "defineProperty descriptor disqualifies export");
            self.sink.remove_export(&name);
        }
    }

    /// Descriptor keys mapped to their value nodes. A `get() {}` method is
    /// kept as the method node, which carries a body like a function does.
    fn descriptor_fields<'t>(&self, descriptor: Node<'t>) -> HashMap<&'src str, Node<'t>> {
        let mut fields = HashMap::new();
        for property in named_children(descriptor) {
            match property.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        property.child_by_field_name("key"),
                        property.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    if key.kind() == "property_identifier" {
                        fields.insert(node_text(&key, self.source), unparenthesize(value));
                    }
                }
                "method_definition" => {
                    if let Some(key) = property.child_by_field_name("name") {
                        if key.kind() == "property_identifier" {
                            fields.insert(node_text(&key, self.source), property);
                        }
                    }
                }
                _ => {}
            }
        }
        fields
    }

    // ===== Module factories =====

    /// `(function (global, factory) { typeof exports === 'object' && … ? … : … })(this, function (exports) { … })`
    fn match_umd<'t>(&self, callee: Node<'t>, args: &[Node<'t>]) -> Option<(Node<'t>, String)> {
        let expression = statement_expression(first_statement(callee)?)?;
        if expression.kind() != "ternary_expression" {
            return None;
        }
        let condition = expression.child_by_field_name("condition")?;
        if !is_exports_and_module_guard(&condition, self.source) {
            return None;
        }
        let [this, factory, ..] = args else {
            return None;
        };
        if this.kind() != "this" || !is_function_literal(factory) {
            return None;
        }
        let alias = parameter_name(*factory, 0, self.source)?;
        Some((*factory, alias))
    }

    /// `(function (e) { e.a = 1; })(exports)`
    ///
    /// Only the first argument position carrying the export object is
    /// rebound; a factory receiving it twice is analyzed under that one name.
    fn visit_factory_wrapper(&mut self, callee: Node<'_>, args: &[Node<'_>]) {
        let Some(index) = args.iter().position(|arg| self.is_export_object(arg)) else {
            return;
        };
        let alias = parameter_name(callee, index, self.source);
        if let Some(body) = callee.child_by_field_name("body") {
            self.descend(body, alias);
        }
    }
}

/// `true`, or its minified spelling `!0`.
fn is_true_literal(node: &Node<'_>, source: &str) -> bool {
    match node.kind() {
        "true" => true,
        "unary_expression" => node_text(node, source).replace(' ', "") == "!0",
        _ => false,
    }
}

/// A getter whose first return (or concise body) is a member access, string
/// literal or identifier.
fn getter_returns_static(getter: Node<'_>) -> bool {
    if !matches!(
        getter.kind(),
        "function_expression" | "arrow_function" | "method_definition"
    ) {
        return false;
    }
    let Some(body) = getter.child_by_field_name("body") else {
        return false;
    };
    if body.kind() != "statement_block" {
        return is_accepted_getter_return(&body);
    }
    named_children(body)
        .into_iter()
        .find(|stmt| stmt.kind() == "return_statement")
        .and_then(|ret| named_children(ret).into_iter().next())
        .map(|arg| is_accepted_getter_return(&arg))
        .unwrap_or(false)
}
