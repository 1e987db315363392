// Qualified-name resolution

use std::collections::{BTreeMap, HashMap};

use super::{DefinitionKind, FileRecord, ImportBinding, Receiver, SymbolDefinition, UsageKind, UsageSite};

/// Joins scope segments and the symbol name
pub const SEPARATOR: &str = ".";

/// Qualified name for `name` defined under `scope`. Module-level names are
/// returned unchanged.
pub fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", scope.join(SEPARATOR), SEPARATOR, name)
    }
}

/// Outcome of resolving one usage site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Index into the definition list
    Definition(usize),
    /// An indexed module, as the files that make it up
    Module(Vec<String>),
    Unresolved,
}

/// Resolves usage sites against all definitions of a run.
///
/// Lookup order for a bare name: the scope chain from innermost outwards
/// (class bodies are only visible from directly inside them), then import
/// bindings visible at the site. Ambiguity across files is settled by file
/// path order since definitions arrive sorted by path and line.
pub struct Resolver<'a> {
    definitions: &'a [SymbolDefinition],
    by_file: HashMap<&'a str, HashMap<&'a str, usize>>,
    languages: HashMap<&'a str, &'a str>,
    packages: HashMap<&'a str, Vec<&'a str>>,
    modules: ModuleMap,
    imports: &'a HashMap<String, Vec<ImportBinding>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        files: &'a [FileRecord],
        definitions: &'a [SymbolDefinition],
        imports: &'a HashMap<String, Vec<ImportBinding>>,
    ) -> Self {
        let mut by_file: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
        for (idx, def) in definitions.iter().enumerate() {
            by_file
                .entry(def.file_path.as_str())
                .or_default()
                .entry(def.qualified_name.as_str())
                .or_insert(idx);
        }

        let languages = files
            .iter()
            .map(|f| (f.path.as_str(), f.language.as_str()))
            .collect();

        let mut packages: HashMap<&str, Vec<&str>> = HashMap::new();
        for file in files.iter().filter(|f| f.language == "go") {
            packages.entry(parent_dir(&file.path)).or_default().push(file.path.as_str());
        }
        for members in packages.values_mut() {
            members.sort_unstable();
        }

        Self {
            definitions,
            by_file,
            languages,
            packages,
            modules: ModuleMap::new(files),
            imports,
        }
    }

    pub fn definition(&self, idx: usize) -> &'a SymbolDefinition {
        &self.definitions[idx]
    }

    /// Definition of `qualified_name` visible as declared in `file`
    pub fn find(&self, file: &str, qualified_name: &str) -> Option<usize> {
        self.lookup(file, qualified_name)
    }

    pub fn resolve(&self, usage: &UsageSite) -> Resolution {
        let file = usage.file_path.as_str();
        let scope = &usage.scope_path;

        if usage.kind == UsageKind::Import {
            return match self.binding_at(file, usage) {
                Some(binding) => self.resolve_import(file, binding),
                None => Resolution::Unresolved,
            };
        }

        match &usage.receiver {
            Receiver::None => self.resolve_name(file, scope, &usage.referenced_name),
            Receiver::SelfRef => self.resolve_self_member(file, scope, &usage.referenced_name),
            Receiver::Name(base) => match self.resolve_name(file, scope, base) {
                Resolution::Definition(idx) if self.definitions[idx].kind == DefinitionKind::Class => {
                    let class = &self.definitions[idx];
                    let qn = format!("{}{}{}", class.qualified_name, SEPARATOR, usage.referenced_name);
                    self.lookup(&class.file_path, &qn)
                        .map(Resolution::Definition)
                        .unwrap_or(Resolution::Unresolved)
                }
                Resolution::Module(files) => self.module_member(&files, &usage.referenced_name),
                _ => Resolution::Unresolved,
            },
            Receiver::Opaque => Resolution::Unresolved,
        }
    }

    /// Resolve a bare name visible at `scope` in `file`
    pub fn resolve_name(&self, file: &str, scope: &[String], name: &str) -> Resolution {
        for depth in (0..=scope.len()).rev() {
            if depth > 0 && depth < scope.len() && self.is_class_scope(file, &scope[..depth]) {
                continue;
            }
            if let Some(idx) = self.lookup(file, &qualify(&scope[..depth], name)) {
                return Resolution::Definition(idx);
            }
        }

        let Some(bindings) = self.imports.get(file) else {
            return Resolution::Unresolved;
        };
        let mut visible: Vec<&ImportBinding> = bindings
            .iter()
            .filter(|b| scope.starts_with(&b.scope_path))
            .collect();
        visible.sort_by(|a, b| {
            b.scope_path
                .len()
                .cmp(&a.scope_path.len())
                .then(a.line_number.cmp(&b.line_number))
        });

        if let Some(binding) = visible
            .iter()
            .find(|b| !b.is_wildcard() && b.local_name == name)
        {
            return self.resolve_bound_name(file, binding);
        }

        for binding in visible.iter().filter(|b| b.is_wildcard()) {
            if let Some(files) = self.modules.resolve(file, self.language(file), &binding.module) {
                if let Resolution::Definition(idx) = self.module_member(&files, name) {
                    return Resolution::Definition(idx);
                }
            }
        }

        Resolution::Unresolved
    }

    /// `self.name` / `cls.name` / Go receiver: member of the innermost enclosing class
    fn resolve_self_member(&self, file: &str, scope: &[String], name: &str) -> Resolution {
        for depth in (1..=scope.len()).rev() {
            let prefix = &scope[..depth];
            let class_qn = qualify(&prefix[..depth - 1], &prefix[depth - 1]);
            let Some(idx) = self.lookup(file, &class_qn) else {
                continue;
            };
            let class = &self.definitions[idx];
            if class.kind != DefinitionKind::Class {
                continue;
            }
            let member = qualify(prefix, name);
            return self
                .lookup(&class.file_path, &member)
                .or_else(|| self.lookup(file, &member))
                .map(Resolution::Definition)
                .unwrap_or(Resolution::Unresolved);
        }
        Resolution::Unresolved
    }

    /// What a local name bound by an import refers to
    fn resolve_bound_name(&self, file: &str, binding: &ImportBinding) -> Resolution {
        let language = self.language(file);
        match binding.member.as_deref() {
            Some(member) => {
                // a package need not map to a file (no `__init__.py`) for its
                // submodules to be importable
                if let Some(files) = self.modules.resolve(file, language, &binding.module) {
                    if let Resolution::Definition(idx) = self.module_member(&files, member) {
                        return Resolution::Definition(idx);
                    }
                }
                self.modules
                    .resolve(file, language, &submodule(&binding.module, member))
                    .map(Resolution::Module)
                    .unwrap_or(Resolution::Unresolved)
            }
            None => self
                .modules
                .resolve(file, language, binding.bound_module())
                .map(Resolution::Module)
                .unwrap_or(Resolution::Unresolved),
        }
    }

    /// Target of an import statement itself (full module, not the bound prefix)
    fn resolve_import(&self, file: &str, binding: &ImportBinding) -> Resolution {
        let language = self.language(file);
        match binding.member.as_deref() {
            Some(member) if member != "*" => self.resolve_bound_name(file, binding),
            _ => self
                .modules
                .resolve(file, language, &binding.module)
                .map(Resolution::Module)
                .unwrap_or(Resolution::Unresolved),
        }
    }

    fn binding_at(&self, file: &str, usage: &UsageSite) -> Option<&'a ImportBinding> {
        self.imports.get(file)?.iter().find(|b| {
            b.line_number == usage.line_number
                && b.referenced_name() == usage.referenced_name
                && b.scope_path == usage.scope_path
        })
    }

    /// Module-level definition `name` in the first file that has one
    fn module_member(&self, files: &[String], name: &str) -> Resolution {
        files
            .iter()
            .find_map(|f| self.lookup(f, name))
            .map(Resolution::Definition)
            .unwrap_or(Resolution::Unresolved)
    }

    fn is_class_scope(&self, file: &str, prefix: &[String]) -> bool {
        let Some((name, outer)) = prefix.split_last() else {
            return false;
        };
        self.lookup(file, &qualify(outer, name))
            .is_some_and(|idx| self.definitions[idx].kind == DefinitionKind::Class)
    }

    /// Definition of `qualified_name` in `file`, or for Go in another file of
    /// the same package
    fn lookup(&self, file: &str, qualified_name: &str) -> Option<usize> {
        if let Some(idx) = self.by_file.get(file).and_then(|m| m.get(qualified_name)) {
            return Some(*idx);
        }
        if self.language(file) != "go" {
            return None;
        }
        self.packages
            .get(parent_dir(file))?
            .iter()
            .filter(|sibling| **sibling != file)
            .find_map(|sibling| self.by_file.get(sibling)?.get(qualified_name).copied())
    }

    fn language(&self, file: &str) -> &str {
        self.languages.get(file).copied().unwrap_or_default()
    }
}

/// `pkg` + `util` -> `pkg.util`; a bare relative prefix takes the member
/// directly, so `.` + `util` -> `.util`
fn submodule(module: &str, member: &str) -> String {
    if module.ends_with(SEPARATOR) {
        format!("{}{}", module, member)
    } else {
        format!("{}{}{}", module, SEPARATOR, member)
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Maps module names used in imports to indexed files
#[derive(Debug, Default)]
pub struct ModuleMap {
    /// dotted Python module -> files
    python: BTreeMap<String, Vec<String>>,
    /// directory -> Go files in it
    go: BTreeMap<String, Vec<String>>,
}

impl ModuleMap {
    pub fn new(files: &[FileRecord]) -> Self {
        let mut map = Self::default();
        for file in files {
            match file.language.as_str() {
                "python" => {
                    if let Some(module) = python_module_name(&file.path) {
                        map.python.entry(module).or_default().push(file.path.clone());
                    }
                }
                "go" => {
                    let dir = parent_dir(&file.path);
                    if !dir.is_empty() {
                        map.go.entry(dir.to_string()).or_default().push(file.path.clone());
                    }
                }
                _ => {}
            }
        }
        for files in map.python.values_mut().chain(map.go.values_mut()) {
            files.sort();
        }
        map
    }

    /// Files making up `module` as imported from `from_file`
    pub fn resolve(&self, from_file: &str, language: &str, module: &str) -> Option<Vec<String>> {
        match language {
            "python" => self.resolve_python(from_file, module),
            "go" => self.resolve_go(module),
            _ => None,
        }
    }

    fn resolve_python(&self, from_file: &str, module: &str) -> Option<Vec<String>> {
        let dots = module.chars().take_while(|c| *c == '.').count();
        if dots > 0 {
            let mut base: Vec<&str> = parent_dir(from_file)
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            for _ in 1..dots {
                base.pop()?;
            }
            let rest = &module[dots..];
            if !rest.is_empty() {
                base.extend(rest.split('.'));
            }
            return self.python.get(&base.join(".")).cloned();
        }

        if let Some(files) = self.python.get(module) {
            return Some(files.clone());
        }

        // `src/`-style layouts: accept the shortest key ending in `.module`
        let suffix = format!(".{}", module);
        self.python
            .iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .min_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then(a.cmp(b)))
            .map(|(_, files)| files.clone())
    }

    fn resolve_go(&self, import_path: &str) -> Option<Vec<String>> {
        self.go
            .iter()
            .filter(|(dir, _)| {
                import_path == dir.as_str()
                    || (import_path.ends_with(dir.as_str())
                        && import_path[..import_path.len() - dir.len()].ends_with('/'))
            })
            .max_by_key(|(dir, _)| dir.len())
            .map(|(_, files)| files.clone())
    }
}

/// `pkg/sub/mod.py` -> `pkg.sub.mod`, `pkg/__init__.py` -> `pkg`
fn python_module_name(path: &str) -> Option<String> {
    let stem = path
        .strip_suffix(".py")
        .or_else(|| path.strip_suffix(".pyi"))?;
    let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
    if stem.is_empty() || stem == "__init__" {
        return None;
    }
    Some(stem.replace('/', "."))
}
