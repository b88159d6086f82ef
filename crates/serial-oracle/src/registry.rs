// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Known-type registry and the supertype → subtype index derived from it.
//!
//! The registry is explicit state with a load → merge → persist lifecycle.
//! One generation run owns the file; concurrent runs over the same file are
//! not supported.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::provider::{DeclKind, TypeInfoProvider};

/// Default file name of the persisted registry.
pub const KNOWN_TYPES_FILENAME: &str = "knownTypes.txt";

const HEADER: &str = "# Generated file, describing known types in the current project to\n\
                      # allow incremental code generation\n";

/// Fully-qualified names of concrete types seen across incremental runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtypeRegistry {
    names: BTreeSet<String>,
}

impl SubtypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the line format: `#` lines are comments, blank lines are
    /// ignored, every other line is one name. Duplicates collapse.
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self { names }
    }

    /// Load from `path`. A missing file is an empty registry (first run).
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let registry = Self::parse(&text);
                debug!(path = %path.display(), count = registry.len(), "loaded known types");
                Ok(registry)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Add a single name. Returns `true` if it was new.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Union another registry into this one.
    pub fn merge(&mut self, other: &Self) {
        self.names.extend(other.names.iter().cloned());
    }

    /// Record every class and enum the provider declares. Interfaces are
    /// never concrete and are not recorded.
    pub fn merge_discovered(&mut self, provider: &dyn TypeInfoProvider) -> usize {
        let before = self.names.len();
        for name in provider.declared_names() {
            let concrete = provider
                .declaration(name)
                .is_some_and(|d| d.kind != DeclKind::Interface);
            if concrete {
                self.names.insert(name.to_owned());
            }
        }
        self.names.len() - before
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether `name` is recorded.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// File contents: the header followed by one sorted name per line.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for name in &self.names {
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    /// Write [`render`](Self::render) to `path`, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<(), RegistryError> {
        let write_err = |source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.render()).map_err(write_err)?;
        debug!(path = %path.display(), count = self.len(), "persisted known types");
        Ok(())
    }

    /// Build the subtype index over every recorded name the provider can
    /// resolve. Unresolvable names are dropped with a warning; a nested
    /// name written with `$` is retried with `.`.
    pub fn subtype_index(&self, provider: &dyn TypeInfoProvider) -> SubtypeIndex {
        let mut index = SubtypeIndex::default();
        for name in &self.names {
            let resolved = if provider.declaration(name).is_some() {
                Some(name.clone())
            } else if name.contains('$') {
                let dotted = name.replace('$', ".");
                provider.declaration(&dotted).is_some().then_some(dotted)
            } else {
                None
            };
            match resolved {
                Some(resolved) => index.append_with_parents(&resolved, provider),
                None => warn!(name = %name, "known type is not visible, ignoring"),
            }
        }
        index
    }
}

/// Supertype → direct subtypes, over `extends` and `implements` edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtypeIndex {
    map: BTreeMap<String, BTreeSet<String>>,
}

impl SubtypeIndex {
    /// Direct subtypes of `name`, sorted.
    pub fn subtypes(&self, name: &str) -> impl Iterator<Item = &str> {
        self.map
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every transitive subtype of `name`, sorted, excluding `name` itself.
    pub fn all_subtypes(&self, name: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.subtypes(name).collect();
        while let Some(next) = stack.pop() {
            if next != name && seen.insert(next) {
                stack.extend(self.subtypes(next));
            }
        }
        seen
    }

    /// Supertypes that have at least one recorded subtype.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Record `name` under each of its parents, then walk up from each
    /// parent whose edge was new. An edge already present means that
    /// parent's ancestry has been walked.
    pub fn append_with_parents(&mut self, name: &str, provider: &dyn TypeInfoProvider) {
        let parents: Vec<String> = provider
            .superclass(name)
            .map(str::to_owned)
            .into_iter()
            .chain(provider.interfaces(name).iter().cloned())
            .collect();
        for parent in parents {
            let added = self
                .map
                .entry(parent.clone())
                .or_default()
                .insert(name.to_owned());
            if added {
                self.append_with_parents(&parent, provider);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{ "types": [
                { "name": "g.Shape", "kind": "class", "abstract": true, "interfaces": ["g.Named"] },
                { "name": "g.Named", "kind": "interface" },
                { "name": "g.Circle", "kind": "class", "superclass": "g.Shape" },
                { "name": "g.Ring", "kind": "class", "superclass": "g.Circle" },
                { "name": "g.Outer.Inner", "kind": "class", "superclass": "g.Shape" }
            ] }"#,
        )
        .unwrap()
    }

    #[test]
    fn parse_skips_comments_and_dedups() {
        let reg = SubtypeRegistry::parse("# header\n\na.B\na.C\n  a.B  \n#a.D\n");
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["a.B", "a.C"]);
    }

    #[test]
    fn render_has_header_and_sorted_names() {
        let mut reg = SubtypeRegistry::new();
        reg.insert("z.Z");
        reg.insert("a.A");
        let text = reg.render();
        assert!(text.starts_with("# Generated file"));
        assert!(text.ends_with("a.A\nz.Z\n"));
        assert_eq!(SubtypeRegistry::parse(&text), reg);
    }

    #[test]
    fn discovered_skips_interfaces() {
        let mut reg = SubtypeRegistry::new();
        let added = reg.merge_discovered(&schema());
        assert_eq!(added, 4);
        assert!(!reg.contains("g.Named"));
    }

    #[test]
    fn index_walks_superclasses_and_interfaces() {
        let schema = schema();
        let reg = SubtypeRegistry::parse("g.Ring\ng.Outer$Inner\ng.Gone\n");
        let index = reg.subtype_index(&schema);
        assert_eq!(index.subtypes("g.Circle").collect::<Vec<_>>(), vec!["g.Ring"]);
        assert_eq!(
            index.subtypes("g.Shape").collect::<Vec<_>>(),
            vec!["g.Circle", "g.Outer.Inner"]
        );
        assert_eq!(index.subtypes("g.Named").collect::<Vec<_>>(), vec!["g.Shape"]);
        let all: Vec<_> = index.all_subtypes("g.Named").into_iter().collect();
        assert_eq!(all, vec!["g.Circle", "g.Outer.Inner", "g.Ring", "g.Shape"]);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = SubtypeRegistry::load(&dir.path().join(KNOWN_TYPES_FILENAME)).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(KNOWN_TYPES_FILENAME);
        let mut reg = SubtypeRegistry::new();
        reg.merge_discovered(&schema());
        reg.persist(&path).unwrap();
        let loaded = SubtypeRegistry::load(&path).unwrap();
        assert_eq!(loaded, reg);
    }
}
