//! Stateless shape classifiers over single tree-sitter nodes.
//!
//! Each function answers "is this node idiom X" or extracts the one value
//! idiom X carries. None of them look at anything but the node they are
//! given and its descendants, so the visitor can combine them freely.

use tree_sitter::Node;

/// Name of the implicit CommonJS export object.
pub const EXPORTS: &str = "exports";

/// Extract the text content of a node.
pub fn node_text<'a>(node: &Node<'_>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Strip any number of wrapping parentheses: `((x))` -> `x`.
pub fn unparenthesize(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        match named_children(current).into_iter().next() {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// Named children of a node, skipping comments.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Positional arguments of a call expression, parentheses stripped.
pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    call.child_by_field_name("arguments")
        .filter(|args| args.kind() == "arguments")
        .map(|args| named_children(args).into_iter().map(unparenthesize).collect())
        .unwrap_or_default()
}

/// The callee of a call expression, parentheses stripped.
pub fn callee(call: Node<'_>) -> Option<Node<'_>> {
    call.child_by_field_name("function").map(unparenthesize)
}

/// Value of a plain string literal, without its quotes and with escape
/// sequences decoded.
///
/// Template strings are not literals for this purpose: they may carry
/// substitutions whose value is only known at run time.
pub fn string_value(node: &Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let text = node_text(node, source);
    if text.len() < 2 {
        return None;
    }
    text.get(1..text.len() - 1).map(unescape)
}

/// Decode the escape sequences of a string literal body. Malformed escapes
/// are kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().map_or(false, char::is_ascii_digit) => out.push('\0'),
            // line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let digits: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &digits, "\\x");
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let digits: String = chars.by_ref().take_while(|&d| d != '}').collect();
                push_code_point(&mut out, &digits, "\\u{");
            }
            'u' => {
                let digits: String = chars.by_ref().take(4).collect();
                push_code_point(&mut out, &digits, "\\u");
            }
            other => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, digits: &str, prefix: &str) {
    match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
        Some(c) if !digits.is_empty() => out.push(c),
        _ => {
            out.push_str(prefix);
            out.push_str(digits);
        }
    }
}

/// True if `node` is the bare identifier `name`.
pub fn is_identifier(node: &Node<'_>, source: &str, name: &str) -> bool {
    node.kind() == "identifier" && node_text(node, source) == name
}

/// True for `function () {}` literals (not arrows, not declarations).
pub fn is_function_literal(node: &Node<'_>) -> bool {
    node.kind() == "function_expression"
}

/// Name of a function's parameter at `index`, when it is a plain identifier.
pub fn parameter_name(function: Node<'_>, index: usize, source: &str) -> Option<String> {
    let params = function.child_by_field_name("parameters")?;
    let param = named_children(params).into_iter().nth(index)?;
    (param.kind() == "identifier").then(|| node_text(&param, source).to_string())
}

/// Statements of a function body, or `None` for concise arrow bodies.
pub fn body_statements(function: Node<'_>) -> Option<Vec<Node<'_>>> {
    let body = function.child_by_field_name("body")?;
    (body.kind() == "statement_block").then(|| named_children(body))
}

/// First real statement of a function body, skipping the directive prologue.
pub fn first_statement(function: Node<'_>) -> Option<Node<'_>> {
    body_statements(function)?
        .into_iter()
        .find(|stmt| !is_directive(stmt))
}

fn is_directive(stmt: &Node<'_>) -> bool {
    stmt.kind() == "expression_statement"
        && named_children(*stmt)
            .first()
            .map(|expr| expr.kind() == "string")
            .unwrap_or(false)
}

/// The expression wrapped by an expression statement.
pub fn statement_expression(stmt: Node<'_>) -> Option<Node<'_>> {
    if stmt.kind() != "expression_statement" {
        return None;
    }
    named_children(stmt).into_iter().next().map(unparenthesize)
}

fn operator(node: &Node<'_>) -> Option<&'static str> {
    node.child_by_field_name("operator").map(|op| op.kind())
}

/// `typeof <target>`
pub fn is_typeof_test(node: &Node<'_>, source: &str, target: &str) -> bool {
    if node.kind() != "unary_expression" || operator(node) != Some("typeof") {
        return false;
    }
    node.child_by_field_name("argument")
        .map(|arg| is_identifier(&unparenthesize(arg), source, target))
        .unwrap_or(false)
}

#[derive(Debug, Default, Clone, Copy)]
struct GuardTests {
    exports: bool,
    module: bool,
}

/// Classify one side of the UMD guard. Equality operators may test
/// `typeof exports`, inequality operators may test `typeof module`, with the
/// typeof on either side of the comparison.
fn classify_guard_side(node: Node<'_>, source: &str) -> GuardTests {
    let node = unparenthesize(node);
    let mut tests = GuardTests::default();
    if node.kind() != "binary_expression" {
        return tests;
    }
    let (Some(left), Some(right)) = (
        node.child_by_field_name("left").map(unparenthesize),
        node.child_by_field_name("right").map(unparenthesize),
    ) else {
        return tests;
    };
    let either = |target: &str| {
        is_typeof_test(&left, source, target) || is_typeof_test(&right, source, target)
    };
    match operator(&node) {
        Some("==") | Some("===") => tests.exports = either("exports"),
        Some("!=") | Some("!==") => tests.module = either("module"),
        _ => {}
    }
    tests
}

/// `'object' === typeof exports && 'undefined' !== typeof module`, in any
/// operand order and with loose or strict comparisons.
pub fn is_exports_and_module_guard(node: &Node<'_>, source: &str) -> bool {
    let node = unparenthesize(*node);
    if node.kind() != "binary_expression" || !matches!(operator(&node), Some("&&") | Some("||")) {
        return false;
    }
    let (Some(left), Some(right)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return false;
    };
    let left = classify_guard_side(left, source);
    let right = classify_guard_side(right, source);
    (left.exports || right.exports) && (left.module || right.module)
}

/// Two-level member access `<object>.<property>` on plain identifiers.
pub fn member_matches(node: &Node<'_>, source: &str, object: &str, property: &str) -> bool {
    if node.kind() != "member_expression" {
        return false;
    }
    let object_matches = node
        .child_by_field_name("object")
        .map(|obj| is_identifier(&unparenthesize(obj), source, object))
        .unwrap_or(false);
    let property_matches = node
        .child_by_field_name("property")
        .map(|prop| prop.kind() == "property_identifier" && node_text(&prop, source) == property)
        .unwrap_or(false);
    object_matches && property_matches
}

pub fn is_object_define_property(node: &Node<'_>, source: &str) -> bool {
    member_matches(node, source, "Object", "defineProperty")
}

pub fn is_object_keys(node: &Node<'_>, source: &str) -> bool {
    member_matches(node, source, "Object", "keys")
}

pub fn is_module_exports(node: &Node<'_>, source: &str) -> bool {
    member_matches(node, source, "module", EXPORTS)
}

/// True if the node is a bare identifier naming one of the scope's export
/// objects.
pub fn is_export_alias<S: AsRef<str>>(node: &Node<'_>, source: &str, aliases: &[S]) -> bool {
    node.kind() == "identifier" && {
        let name = node_text(node, source);
        aliases.iter().any(|alias| alias.as_ref() == name)
    }
}

/// `require('./foo')` returns `./foo`, anything else returns `None`.
pub fn extract_require_path(node: &Node<'_>, source: &str) -> Option<String> {
    let node = unparenthesize(*node);
    if node.kind() != "call_expression" {
        return None;
    }
    if !is_identifier(&callee(node)?, source, "require") {
        return None;
    }
    match call_arguments(node).as_slice() {
        [arg] => string_value(arg, source),
        _ => None,
    }
}

/// Literal or identifier value a property can carry and still count as a
/// statically known export.
pub fn is_static_value(node: &Node<'_>, source: &str) -> bool {
    matches!(
        node.kind(),
        "identifier" | "undefined" | "string" | "number" | "true" | "false" | "null"
    ) || extract_require_path(node, source).is_some()
}

/// Return shapes a getter may have and still count as an export:
/// member access (dotted or computed), string literal, identifier.
pub fn is_accepted_getter_return(node: &Node<'_>) -> bool {
    matches!(
        unparenthesize(*node).kind(),
        "member_expression" | "subscript_expression" | "string" | "identifier"
    )
}
