// Go extractor

use tree_sitter::Node;

use super::{line_of, node_text, parse_tree, Access, ScopeStack, SymbolExtractor, SyntaxItem};
use crate::error::ExtractError;
use crate::index::{ImportBinding, Receiver};

/// Go extractor using tree-sitter.
///
/// Methods are scoped under their receiver type, so `func (h *Handler) Run()`
/// defines `Handler.Run`. Type declarations are recorded as classes.
#[derive(Debug, Default)]
pub struct GoExtractor;

impl GoExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolExtractor for GoExtractor {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extract(&self, content: &str) -> Result<Vec<SyntaxItem>, ExtractError> {
        let tree = parse_tree(&tree_sitter_go::LANGUAGE.into(), content)?;

        let mut walker = Walker {
            content,
            items: Vec::new(),
            receiver_var: None,
        };
        let mut scope = ScopeStack::new();
        walker.visit(tree.root_node(), &mut scope);

        Ok(walker.items)
    }
}

struct Walker<'a> {
    content: &'a str,
    items: Vec<SyntaxItem>,
    /// Receiver variable of the method being walked (`h` in `func (h *Handler)`)
    receiver_var: Option<String>,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node) -> Option<String> {
        node_text(node, self.content).map(str::to_string)
    }

    fn visit(&mut self, node: Node, scope: &mut ScopeStack) {
        match node.kind() {
            "package_clause" | "comment" => {}
            "import_spec" => self.visit_import_spec(node, scope),
            "function_declaration" => self.visit_function(node, scope),
            "method_declaration" => self.visit_method(node, scope),
            "type_spec" | "type_alias" => {
                if let Some(name) = node.child_by_field_name("name").and_then(|n| self.text(n)) {
                    let bases = node
                        .child_by_field_name("type")
                        .map(|t| self.embedded_types(t))
                        .unwrap_or_default();
                    self.items.push(SyntaxItem::Class {
                        name,
                        scope: scope.snapshot(),
                        line: line_of(node),
                        bases,
                    });
                }
                self.visit_field(node, "type", scope);
            }
            "var_spec" | "const_spec" => {
                self.visit_field(node, "type", scope);
                self.visit_field(node, "value", scope);
                let mut cursor = node.walk();
                let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    self.bind(name, scope);
                }
            }
            "short_var_declaration" | "assignment_statement" => {
                self.visit_field(node, "right", scope);
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind(left, scope);
                }
            }
            "range_clause" => {
                self.visit_field(node, "right", scope);
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind(left, scope);
                }
            }
            "call_expression" => self.visit_call(node, scope),
            "selector_expression" => {
                if let Some((name, receiver, operand)) = self.member(node) {
                    self.push_variable(name, scope, line_of(node), Access::Read, receiver.clone());
                    if receiver != Receiver::SelfRef {
                        self.visit(operand, scope);
                    }
                }
            }
            "qualified_type" => {
                let package = node.child_by_field_name("package").and_then(|p| self.text(p));
                let name = node.child_by_field_name("name").and_then(|n| self.text(n));
                if let (Some(package), Some(name)) = (package, name) {
                    self.push_variable(name, scope, line_of(node), Access::Read, Receiver::Name(package));
                }
            }
            "func_literal" => {
                self.visit_field(node, "parameters", scope);
                self.visit_field(node, "result", scope);
                self.visit_field(node, "body", scope);
            }
            "parameter_list" => {
                // parameter names are skipped, their types are usages
                let mut cursor = node.walk();
                for param in node.named_children(&mut cursor) {
                    self.visit_field(param, "type", scope);
                }
            }
            "keyed_element" => {
                let mut cursor = node.walk();
                if let Some(value) = node.named_children(&mut cursor).last() {
                    self.visit(value, scope);
                }
            }
            "identifier" | "type_identifier" => {
                if let Some(name) = self.text(node) {
                    self.push_variable(name, scope, line_of(node), Access::Read, Receiver::None);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, scope);
                }
            }
        }
    }

    fn visit_field(&mut self, node: Node, field: &str, scope: &mut ScopeStack) {
        if let Some(child) = node.child_by_field_name(field) {
            self.visit(child, scope);
        }
    }

    fn visit_function(&mut self, node: Node, scope: &mut ScopeStack) {
        let Some(name) = node.child_by_field_name("name").and_then(|n| self.text(n)) else {
            return;
        };

        self.items.push(SyntaxItem::Function {
            name: name.clone(),
            scope: scope.snapshot(),
            line: line_of(node),
            parameters: self.parameter_names(node),
        });

        self.visit_field(node, "parameters", scope);
        self.visit_field(node, "result", scope);

        scope.push(name);
        self.visit_field(node, "body", scope);
        scope.pop();
    }

    fn visit_method(&mut self, node: Node, scope: &mut ScopeStack) {
        let Some(name) = node.child_by_field_name("name").and_then(|n| self.text(n)) else {
            return;
        };
        let receiver = node
            .child_by_field_name("receiver")
            .and_then(|r| self.receiver_decl(r));

        let Some((var, type_name)) = receiver else {
            // malformed receiver, treat as a plain function
            self.visit_function(node, scope);
            return;
        };

        scope.push(type_name);
        self.items.push(SyntaxItem::Function {
            name: name.clone(),
            scope: scope.snapshot(),
            line: line_of(node),
            parameters: self.parameter_names(node),
        });

        self.visit_field(node, "parameters", scope);
        self.visit_field(node, "result", scope);

        let previous = std::mem::replace(&mut self.receiver_var, var);
        scope.push(name);
        self.visit_field(node, "body", scope);
        scope.pop();
        self.receiver_var = previous;

        scope.pop();
    }

    /// Names from the `parameters` list; unnamed parameters contribute nothing
    fn parameter_names(&self, func: Node) -> Vec<String> {
        let Some(list) = func.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut names = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            let mut inner = param.walk();
            names.extend(
                param
                    .children_by_field_name("name", &mut inner)
                    .filter_map(|n| self.text(n)),
            );
        }
        names
    }

    /// Embedded struct fields and embedded interfaces
    fn embedded_types(&self, ty: Node) -> Vec<String> {
        let mut embedded = Vec::new();
        match ty.kind() {
            "struct_type" => {
                let mut cursor = ty.walk();
                let Some(fields) = ty
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "field_declaration_list")
                else {
                    return embedded;
                };
                let mut cursor = fields.walk();
                for field in fields.named_children(&mut cursor) {
                    if field.kind() == "field_declaration" && field.child_by_field_name("name").is_none() {
                        embedded.extend(field.child_by_field_name("type").and_then(|t| self.type_name(t)));
                    }
                }
            }
            "interface_type" => {
                let mut cursor = ty.walk();
                for elem in ty.named_children(&mut cursor) {
                    if elem.kind() != "type_elem" {
                        continue;
                    }
                    let mut inner = elem.walk();
                    embedded.extend(elem.named_children(&mut inner).filter_map(|t| self.type_name(t)));
                }
            }
            _ => {}
        }
        embedded
    }

    /// `Base`, `io.Reader`, `List[T]` -> `List`
    fn type_name(&self, ty: Node) -> Option<String> {
        match ty.kind() {
            "type_identifier" => self.text(ty),
            "qualified_type" => {
                let package = self.text(ty.child_by_field_name("package")?)?;
                let name = self.text(ty.child_by_field_name("name")?)?;
                Some(format!("{}.{}", package, name))
            }
            "generic_type" => self.type_name(ty.child_by_field_name("type")?),
            _ => None,
        }
    }

    /// (receiver variable, receiver type name) from `(h *Handler[T])`
    fn receiver_decl(&self, list: Node) -> Option<(Option<String>, String)> {
        let mut cursor = list.walk();
        let param = list
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;

        let var = param.child_by_field_name("name").and_then(|n| self.text(n));
        let mut ty = param.child_by_field_name("type")?;
        loop {
            match ty.kind() {
                "pointer_type" | "parenthesized_type" => ty = ty.named_child(0)?,
                "generic_type" => ty = ty.child_by_field_name("type")?,
                "type_identifier" => return Some((var, self.text(ty)?)),
                _ => return None,
            }
        }
    }

    fn visit_call(&mut self, node: Node, scope: &mut ScopeStack) {
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => {
                    if let Some(name) = self.text(function) {
                        self.items.push(SyntaxItem::Call {
                            name,
                            scope: scope.snapshot(),
                            line: line_of(function),
                            receiver: Receiver::None,
                        });
                    }
                }
                "selector_expression" => {
                    if let Some((name, receiver, operand)) = self.member(function) {
                        let line = function
                            .child_by_field_name("field")
                            .map(line_of)
                            .unwrap_or_else(|| line_of(function));
                        self.items.push(SyntaxItem::Call {
                            name,
                            scope: scope.snapshot(),
                            line,
                            receiver: receiver.clone(),
                        });
                        if receiver != Receiver::SelfRef {
                            self.visit(operand, scope);
                        }
                    }
                }
                _ => self.visit(function, scope),
            }
        }
        self.visit_field(node, "type_arguments", scope);
        self.visit_field(node, "arguments", scope);
    }

    fn visit_import_spec(&mut self, node: Node, scope: &mut ScopeStack) {
        let Some(path) = node
            .child_by_field_name("path")
            .and_then(|p| self.text(p))
            .map(|p| p.trim_matches(|c| c == '"' || c == '`').to_string())
        else {
            return;
        };
        if path.is_empty() {
            return;
        }

        let alias = node.child_by_field_name("name");
        let (local_name, member) = match alias.map(|a| a.kind()) {
            Some("dot") => ("*".to_string(), Some("*".to_string())),
            Some(_) => match alias.and_then(|a| self.text(a)) {
                Some(name) => (name, None),
                None => return,
            },
            None => (package_name(&path).to_string(), None),
        };

        self.items.push(SyntaxItem::Import(ImportBinding {
            local_name,
            module: path,
            member,
            scope_path: scope.snapshot(),
            line_number: line_of(node),
        }));
    }

    fn bind(&mut self, target: Node, scope: &mut ScopeStack) {
        match target.kind() {
            "identifier" => {
                if let Some(name) = self.text(target).filter(|n| n != "_") {
                    self.push_variable(name, scope, line_of(target), Access::Write, Receiver::None);
                }
            }
            "expression_list" => {
                let mut cursor = target.walk();
                let children: Vec<_> = target.named_children(&mut cursor).collect();
                for child in children {
                    self.bind(child, scope);
                }
            }
            "selector_expression" => {
                if let Some((name, receiver, operand)) = self.member(target) {
                    self.push_variable(name, scope, line_of(target), Access::Write, receiver.clone());
                    if receiver != Receiver::SelfRef {
                        self.visit(operand, scope);
                    }
                }
            }
            "blank_identifier" => {}
            _ => self.visit(target, scope),
        }
    }

    fn member<'t>(&self, node: Node<'t>) -> Option<(String, Receiver, Node<'t>)> {
        let operand = node.child_by_field_name("operand")?;
        let name = self.text(node.child_by_field_name("field")?)?;
        Some((name, self.receiver_of(operand), operand))
    }

    fn receiver_of(&self, operand: Node) -> Receiver {
        match operand.kind() {
            "identifier" => match self.text(operand) {
                Some(name) if self.receiver_var.as_deref() == Some(name.as_str()) => Receiver::SelfRef,
                Some(name) => Receiver::Name(name),
                None => Receiver::Opaque,
            },
            "call_expression" => operand
                .child_by_field_name("function")
                .filter(|f| f.kind() == "identifier")
                .and_then(|f| self.text(f))
                .map(Receiver::Name)
                .unwrap_or(Receiver::Opaque),
            "composite_literal" => operand
                .child_by_field_name("type")
                .filter(|t| t.kind() == "type_identifier")
                .and_then(|t| self.text(t))
                .map(Receiver::Name)
                .unwrap_or(Receiver::Opaque),
            _ => Receiver::Opaque,
        }
    }

    fn push_variable(&mut self, name: String, scope: &ScopeStack, line: u32, access: Access, receiver: Receiver) {
        self.items.push(SyntaxItem::Variable {
            name,
            scope: scope.snapshot(),
            line,
            access,
            receiver,
        });
    }
}

/// Default package name for an import path: last segment, skipping a
/// trailing major version (`/v2`) and a `.vN` suffix (`yaml.v3`)
fn package_name(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    match last.split_once(".v") {
        Some((name, version)) if !name.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => name,
        _ => last,
    }
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DefinitionKind, UsageKind};
    use crate::indexer::parser::lower;

    fn extract(source: &str) -> crate::index::FileExtraction {
        let items = GoExtractor::new().extract(source).unwrap();
        lower("app/handler.go", items)
    }

    #[test]
    fn test_methods_scoped_under_receiver_type() {
        let source = r#"package app

type Handler struct {
	name string
}

func (h *Handler) Run() error {
	return h.prepare()
}

func (h Handler) prepare() error {
	return nil
}

func NewHandler() *Handler {
	return &Handler{}
}
"#;
        let extraction = extract(source);
        let defs: Vec<_> = extraction
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.kind))
            .collect();
        assert_eq!(
            defs,
            vec![
                ("Handler", DefinitionKind::Class),
                ("Handler.Run", DefinitionKind::Function),
                ("Handler.prepare", DefinitionKind::Function),
                ("NewHandler", DefinitionKind::Function),
            ]
        );

        let prepare = extraction
            .usages
            .iter()
            .find(|u| u.referenced_name == "prepare")
            .unwrap();
        assert_eq!(prepare.kind, UsageKind::Call);
        assert_eq!(prepare.receiver, Receiver::SelfRef);
        assert_eq!(prepare.scope_path, vec!["Handler", "Run"]);
    }

    #[test]
    fn test_imports_and_selector_calls() {
        let source = r#"package main

import (
	"fmt"
	db "github.com/acme/app/storage"
	. "strings"
	"gopkg.in/yaml.v3"
)

func main() {
	conn := db.Open()
	fmt.Println(conn)
}
"#;
        let extraction = extract(source);
        let bindings: Vec<_> = extraction
            .imports
            .iter()
            .map(|b| (b.local_name.as_str(), b.module.as_str(), b.member.as_deref()))
            .collect();
        assert_eq!(
            bindings,
            vec![
                ("fmt", "fmt", None),
                ("db", "github.com/acme/app/storage", None),
                ("*", "strings", Some("*")),
                ("yaml", "gopkg.in/yaml.v3", None),
            ]
        );

        let open = extraction
            .usages
            .iter()
            .find(|u| u.referenced_name == "Open")
            .unwrap();
        assert_eq!(open.receiver, Receiver::Name("db".to_string()));
        assert!(extraction
            .definitions
            .iter()
            .any(|d| d.qualified_name == "main.conn" && d.kind == DefinitionKind::Variable));
    }

    #[test]
    fn test_package_vars() {
        let source = "package app\n\nvar (\n\tDefault = 1\n\tlimit, _ = compute()\n)\n\nconst Name = \"x\"\n";
        let extraction = extract(source);
        let defs: Vec<_> = extraction
            .definitions
            .iter()
            .map(|d| d.qualified_name.as_str())
            .collect();
        assert_eq!(defs, vec!["Default", "limit", "Name"]);
    }

    #[test]
    fn test_signature_and_embedded_types() {
        let source = r#"package app

import (
	"io"
	"log"
)

type Base struct{}

type Server struct {
	Base
	*log.Logger
	name string
}

type ReadCloser interface {
	io.Reader
	Close() error
}

func (s *Server) Handle(w io.Writer, req, resp string, opts ...int) {}

func Start(int) {}
"#;
        let extraction = extract(source);
        let find = |qn: &str| {
            extraction
                .definitions
                .iter()
                .find(|d| d.qualified_name == qn)
                .unwrap()
        };

        assert!(find("Base").bases.is_empty());
        assert_eq!(find("Server").bases, vec!["Base", "log.Logger"]);
        assert_eq!(find("ReadCloser").bases, vec!["io.Reader"]);
        // the receiver is not a parameter
        assert_eq!(find("Server.Handle").parameters, vec!["w", "req", "resp", "opts"]);
        assert!(find("Start").parameters.is_empty());
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("fmt"), "fmt");
        assert_eq!(package_name("github.com/acme/app/v2"), "app");
        assert_eq!(package_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(package_name("net/http"), "http");
    }

    #[test]
    fn test_syntax_error() {
        let err = GoExtractor::new().extract("package app\n\nfunc broken( {\n").unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }));
    }
}
