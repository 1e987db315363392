// Inverted index: bare name and qualified name -> records

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize, Serializer};

use super::{SymbolDefinition, UsageSite};

/// Position of a record in the document's `definitions` / `usages` lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexEntry {
    Definition(usize),
    Usage(usize),
}

/// Both lookup maps. Every definition is listed under its bare and qualified
/// name; a usage under its qualified name only once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    #[serde(rename = "bare_name", serialize_with = "sorted_map")]
    by_name: HashMap<String, Vec<IndexEntry>>,
    #[serde(rename = "qualified_name", serialize_with = "sorted_map")]
    by_qualified_name: HashMap<String, Vec<IndexEntry>>,
}

impl InvertedIndex {
    pub fn build(definitions: &[SymbolDefinition], usages: &[UsageSite]) -> Self {
        let mut index = Self::default();

        for (idx, def) in definitions.iter().enumerate() {
            let entry = IndexEntry::Definition(idx);
            index.by_name.entry(def.symbol_name.clone()).or_default().push(entry);
            index
                .by_qualified_name
                .entry(def.qualified_name.clone())
                .or_default()
                .push(entry);
        }

        for (idx, usage) in usages.iter().enumerate() {
            let entry = IndexEntry::Usage(idx);
            index
                .by_name
                .entry(usage.referenced_name.clone())
                .or_default()
                .push(entry);
            if let Some(qn) = &usage.referenced_qualified_name {
                index.by_qualified_name.entry(qn.clone()).or_default().push(entry);
            }
        }

        // file path, then line, definitions before usages on the same line
        let position = |entry: &IndexEntry| match *entry {
            IndexEntry::Definition(i) => (definitions[i].file_path.as_str(), definitions[i].line_number, 0u8, i),
            IndexEntry::Usage(i) => (usages[i].file_path.as_str(), usages[i].line_number, 1u8, i),
        };
        for entries in index
            .by_name
            .values_mut()
            .chain(index.by_qualified_name.values_mut())
        {
            entries.sort_by(|a, b| position(a).cmp(&position(b)));
        }

        index
    }

    pub fn by_name(&self, name: &str) -> &[IndexEntry] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_qualified_name(&self, qualified_name: &str) -> &[IndexEntry] {
        self.by_qualified_name
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn qualified_name_count(&self) -> usize {
        self.by_qualified_name.len()
    }
}

fn sorted_map<S>(map: &HashMap<String, Vec<IndexEntry>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let ordered: BTreeMap<&String, &Vec<IndexEntry>> = map.iter().collect();
    ordered.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DefinitionKind, Receiver, UsageKind};

    fn def(file: &str, qn: &str, line: u32) -> SymbolDefinition {
        let name = qn.rsplit('.').next().unwrap_or(qn);
        SymbolDefinition {
            symbol_name: name.to_string(),
            qualified_name: qn.to_string(),
            kind: DefinitionKind::Function,
            file_path: file.to_string(),
            scope_path: vec![],
            line_number: line,
            parameters: vec![],
            bases: vec![],
        }
    }

    fn usage(file: &str, name: &str, resolved: Option<&str>, line: u32) -> UsageSite {
        UsageSite {
            referenced_name: name.to_string(),
            referenced_qualified_name: resolved.map(str::to_string),
            file_path: file.to_string(),
            line_number: line,
            kind: UsageKind::Call,
            scope_path: vec![],
            receiver: Receiver::None,
        }
    }

    #[test]
    fn test_definitions_under_both_keys() {
        let defs = vec![def("b.py", "Handler.run", 3), def("a.py", "run", 1)];
        let usages = vec![usage("a.py", "run", Some("run"), 9), usage("c.py", "run", None, 2)];
        let index = InvertedIndex::build(&defs, &usages);

        assert_eq!(
            index.by_name("run"),
            &[
                IndexEntry::Definition(1),
                IndexEntry::Usage(0),
                IndexEntry::Definition(0),
                IndexEntry::Usage(1),
            ]
        );
        assert_eq!(index.by_qualified_name("Handler.run"), &[IndexEntry::Definition(0)]);
        assert_eq!(
            index.by_qualified_name("run"),
            &[IndexEntry::Definition(1), IndexEntry::Usage(0)]
        );
        assert!(index.by_name("missing").is_empty());
    }

    #[test]
    fn test_serialized_keys_are_sorted() {
        let defs = vec![def("a.py", "zeta", 1), def("a.py", "alpha", 2)];
        let index = InvertedIndex::build(&defs, &[]);
        let json = serde_json::to_string(&index).unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
        assert!(json.starts_with("{\"bare_name\":"));
    }
}
