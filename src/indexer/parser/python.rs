// Python extractor

use std::collections::HashSet;

use tree_sitter::Node;

use super::{line_of, node_text, parse_tree, Access, ScopeStack, SymbolExtractor, SyntaxItem};
use crate::error::ExtractError;
use crate::index::{ImportBinding, Receiver};

/// Python extractor using tree-sitter
#[derive(Debug, Default)]
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extract(&self, content: &str) -> Result<Vec<SyntaxItem>, ExtractError> {
        let tree = parse_tree(&tree_sitter_python::LANGUAGE.into(), content)?;

        let mut walker = Walker {
            content,
            items: Vec::new(),
            declared: HashSet::new(),
        };
        let mut scope = ScopeStack::new();
        walker.visit(tree.root_node(), &mut scope);

        Ok(walker.items)
    }
}

struct Walker<'a> {
    content: &'a str,
    items: Vec<SyntaxItem>,
    /// (scope, name) pairs declared `global` or `nonlocal`
    declared: HashSet<(Vec<String>, String)>,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node) -> Option<String> {
        node_text(node, self.content).map(str::to_string)
    }

    fn visit(&mut self, node: Node, scope: &mut ScopeStack) {
        match node.kind() {
            "function_definition" => self.visit_function(node, scope),
            "class_definition" => self.visit_class(node, scope),
            "assignment" | "augmented_assignment" => {
                self.visit_field(node, "type", scope);
                self.visit_field(node, "right", scope);
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind(left, scope);
                }
            }
            "for_statement" => {
                self.visit_field(node, "right", scope);
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind(left, scope);
                }
                self.visit_field(node, "body", scope);
                self.visit_field(node, "alternative", scope);
            }
            "named_expression" => {
                self.visit_field(node, "value", scope);
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(name, scope);
                }
            }
            // `with x as y`, `except E as e`
            "as_pattern" | "except_clause" => {
                let alias = node.child_by_field_name("alias");
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child.id()) != alias.map(|a| a.id()) {
                        self.visit(child, scope);
                    }
                }
                if let Some(alias) = alias {
                    self.bind(alias, scope);
                }
            }
            "import_statement" => self.visit_import(node, scope),
            "import_from_statement" => self.visit_import_from(node, scope),
            "global_statement" | "nonlocal_statement" => {
                let mut cursor = node.walk();
                for name in node.named_children(&mut cursor) {
                    if let Some(text) = self.text(name) {
                        self.declared.insert((scope.snapshot(), text));
                    }
                }
            }
            "future_import_statement" => {}
            "call" => self.visit_call(node, scope),
            "attribute" => {
                if let Some((name, receiver, object)) = self.member(node) {
                    self.push_variable(name, scope, line_of(node), Access::Read, receiver.clone());
                    if receiver != Receiver::SelfRef {
                        self.visit(object, scope);
                    }
                }
            }
            "keyword_argument" => self.visit_field(node, "value", scope),
            "lambda" => self.visit_field(node, "body", scope),
            "for_in_clause" => {
                let mut cursor = node.walk();
                let rights: Vec<_> = node.children_by_field_name("right", &mut cursor).collect();
                for right in rights {
                    self.visit(right, scope);
                }
            }
            "parameters" | "lambda_parameters" => self.visit_parameters(node, scope),
            "identifier" => {
                if let Some(name) = self.text(node) {
                    self.push_variable(name, scope, line_of(node), Access::Read, Receiver::None);
                }
            }
            _ => self.visit_children(node, scope),
        }
    }

    fn visit_children(&mut self, node: Node, scope: &mut ScopeStack) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, scope);
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

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.parameter_names(p))
            .unwrap_or_default();
        self.items.push(SyntaxItem::Function {
            name: name.clone(),
            scope: scope.snapshot(),
            line: line_of(node),
            parameters,
        });

        // defaults and annotations evaluate in the enclosing scope
        self.visit_field(node, "parameters", scope);
        self.visit_field(node, "return_type", scope);

        scope.push(name);
        self.visit_field(node, "body", scope);
        scope.pop();
    }

    fn visit_class(&mut self, node: Node, scope: &mut ScopeStack) {
        let Some(name) = node.child_by_field_name("name").and_then(|n| self.text(n)) else {
            return;
        };

        let bases = node
            .child_by_field_name("superclasses")
            .map(|list| {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .filter_map(|base| self.dotted_expression(base))
                    .collect()
            })
            .unwrap_or_default();
        self.items.push(SyntaxItem::Class {
            name: name.clone(),
            scope: scope.snapshot(),
            line: line_of(node),
            bases,
        });

        self.visit_field(node, "superclasses", scope);

        scope.push(name);
        self.visit_field(node, "body", scope);
        scope.pop();
    }

    /// Parameter names are skipped; default values and annotations are not
    fn visit_parameters(&mut self, node: Node, scope: &mut ScopeStack) {
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            match param.kind() {
                "default_parameter" => self.visit_field(param, "value", scope),
                "typed_default_parameter" => {
                    self.visit_field(param, "type", scope);
                    self.visit_field(param, "value", scope);
                }
                "typed_parameter" => self.visit_field(param, "type", scope),
                _ => {}
            }
        }
    }

    /// Declared names only: `*args` and `**kwargs` keep their name, separators
    /// and tuple patterns are dropped
    fn parameter_names(&self, node: Node) -> Vec<String> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter_map(|param| self.parameter_name(param))
            .collect()
    }

    fn parameter_name(&self, param: Node) -> Option<String> {
        match param.kind() {
            "identifier" => self.text(param),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .and_then(|n| self.text(n)),
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                self.parameter_name(param.named_child(0)?)
            }
            _ => None,
        }
    }

    /// `Base` or `abc.ABC`; anything else (calls, subscripts, keywords) is None
    fn dotted_expression(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" => self.text(node),
            "attribute" => {
                let object = self.dotted_expression(node.child_by_field_name("object")?)?;
                let attribute = self.text(node.child_by_field_name("attribute")?)?;
                Some(format!("{}.{}", object, attribute))
            }
            _ => None,
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
                "attribute" => {
                    if let Some((name, receiver, object)) = self.member(function) {
                        let line = function
                            .child_by_field_name("attribute")
                            .map(line_of)
                            .unwrap_or_else(|| line_of(function));
                        self.items.push(SyntaxItem::Call {
                            name,
                            scope: scope.snapshot(),
                            line,
                            receiver: receiver.clone(),
                        });
                        if receiver != Receiver::SelfRef {
                            self.visit(object, scope);
                        }
                    }
                }
                _ => self.visit(function, scope),
            }
        }
        self.visit_field(node, "arguments", scope);
    }

    fn visit_import(&mut self, node: Node, scope: &mut ScopeStack) {
        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();

        for name in names {
            let (module, local) = match name.kind() {
                "dotted_name" => {
                    let module = self.dotted(name);
                    let local = module.split('.').next().unwrap_or_default().to_string();
                    (module, local)
                }
                "aliased_import" => {
                    let module = name
                        .child_by_field_name("name")
                        .map(|n| self.dotted(n))
                        .unwrap_or_default();
                    let local = name
                        .child_by_field_name("alias")
                        .and_then(|a| self.text(a))
                        .unwrap_or_default();
                    (module, local)
                }
                _ => continue,
            };
            if module.is_empty() || local.is_empty() {
                continue;
            }
            self.items.push(SyntaxItem::Import(ImportBinding {
                local_name: local,
                module,
                member: None,
                scope_path: scope.snapshot(),
                line_number: line_of(name),
            }));
        }
    }

    fn visit_import_from(&mut self, node: Node, scope: &mut ScopeStack) {
        let Some(module) = node.child_by_field_name("module_name").map(|m| self.dotted(m)) else {
            return;
        };
        let line = line_of(node);

        let mut cursor = node.walk();
        let wildcard = node
            .named_children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import");
        if wildcard {
            self.items.push(SyntaxItem::Import(ImportBinding {
                local_name: "*".to_string(),
                module,
                member: Some("*".to_string()),
                scope_path: scope.snapshot(),
                line_number: line,
            }));
            return;
        }

        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (member, local) = match name.kind() {
                "dotted_name" => {
                    let member = self.dotted(name);
                    (member.clone(), member)
                }
                "aliased_import" => {
                    let member = name
                        .child_by_field_name("name")
                        .map(|n| self.dotted(n))
                        .unwrap_or_default();
                    let local = name
                        .child_by_field_name("alias")
                        .and_then(|a| self.text(a))
                        .unwrap_or_default();
                    (member, local)
                }
                _ => continue,
            };
            if member.is_empty() || local.is_empty() {
                continue;
            }
            self.items.push(SyntaxItem::Import(ImportBinding {
                local_name: local,
                module: module.clone(),
                member: Some(member),
                scope_path: scope.snapshot(),
                line_number: line_of(name),
            }));
        }
    }

    /// Bind assignment targets as writes
    fn bind(&mut self, target: Node, scope: &mut ScopeStack) {
        match target.kind() {
            "identifier" => {
                if let Some(name) = self.text(target) {
                    let key = (scope.snapshot(), name);
                    let access = if self.declared.contains(&key) {
                        Access::Rebind
                    } else {
                        Access::Write
                    };
                    self.push_variable(key.1, scope, line_of(target), access, Receiver::None);
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
            | "parenthesized_expression" | "as_pattern_target" | "list_splat_pattern"
            | "list_splat" | "expression_list" => {
                let mut cursor = target.walk();
                let children: Vec<_> = target.named_children(&mut cursor).collect();
                for child in children {
                    self.bind(child, scope);
                }
            }
            "attribute" => {
                if let Some((name, receiver, object)) = self.member(target) {
                    self.push_variable(name, scope, line_of(target), Access::Write, receiver.clone());
                    if receiver != Receiver::SelfRef {
                        self.visit(object, scope);
                    }
                }
            }
            _ => self.visit(target, scope),
        }
    }

    /// `object.attribute` split into (attribute, receiver hint, object node)
    fn member<'t>(&self, node: Node<'t>) -> Option<(String, Receiver, Node<'t>)> {
        let object = node.child_by_field_name("object")?;
        let name = self.text(node.child_by_field_name("attribute")?)?;
        Some((name, self.receiver_of(object), object))
    }

    fn receiver_of(&self, object: Node) -> Receiver {
        match object.kind() {
            "identifier" => match self.text(object) {
                Some(name) if name == "self" || name == "cls" => Receiver::SelfRef,
                Some(name) => Receiver::Name(name),
                None => Receiver::Opaque,
            },
            "call" => object
                .child_by_field_name("function")
                .filter(|f| f.kind() == "identifier")
                .and_then(|f| self.text(f))
                .map(Receiver::Name)
                .unwrap_or(Receiver::Opaque),
            _ => Receiver::Opaque,
        }
    }

    /// Dotted or relative module name rebuilt from identifiers only
    fn dotted(&self, node: Node) -> String {
        match node.kind() {
            "identifier" => self.text(node).unwrap_or_default(),
            "dotted_name" => {
                let mut cursor = node.walk();
                node.named_children(&mut cursor)
                    .filter_map(|c| self.text(c))
                    .collect::<Vec<_>>()
                    .join(".")
            }
            "relative_import" => {
                let mut module = String::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "import_prefix" => {
                            let dots = self.text(child).map(|t| t.matches('.').count()).unwrap_or(0);
                            module.push_str(&".".repeat(dots));
                        }
                        "dotted_name" => module.push_str(&self.dotted(child)),
                        _ => {}
                    }
                }
                module
            }
            _ => String::new(),
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
