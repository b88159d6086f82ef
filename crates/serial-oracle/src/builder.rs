// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-point closure computation for one direction.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, instrument, warn};

use crate::error::OracleError;
use crate::oracle::{FactKind, SerializableTypeOracle, TypeFacts};
use crate::provider::{DeclKind, TypeInfoProvider};
use crate::registry::SubtypeIndex;
use crate::type_ref::TypeRef;

/// Direction a closure is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Types the endpoint must decode (and instantiate).
    Read,
    /// Types the endpoint must encode.
    Write,
}

/// Knobs that change closure membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Do not add known subtypes in the write direction. Off by default:
    /// the closure must stay safe for whatever the peer compiled against.
    pub prune_write_subtypes: bool,
}

/// How a type entered the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// A root, field, array element, or custom-serializer requirement. A
    /// reader may have to produce a value for it.
    Slot,
    /// Superclass of a member; decoded only as part of a subtype.
    Superclass,
    /// Known subtype of a member.
    Subtype,
}

/// A root whose closure failed; other roots are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootProblem {
    /// The failing root.
    pub root: TypeRef,
    /// Why it failed.
    pub error: OracleError,
}

/// Result of [`TypeOracleBuilder::build`].
#[derive(Debug, Clone)]
pub struct OracleBuild {
    /// Union of every successful root's closure.
    pub oracle: SerializableTypeOracle,
    /// Roots that failed, in root order.
    pub problems: Vec<RootProblem>,
}

impl OracleBuild {
    /// The oracle if every root succeeded, else the first problem wrapped
    /// with its root.
    pub fn into_result(self) -> Result<SerializableTypeOracle, OracleError> {
        match self.problems.into_iter().next() {
            None => Ok(self.oracle),
            Some(problem) => Err(OracleError::Root {
                root: problem.root.to_string(),
                source: Box::new(problem.error),
            }),
        }
    }
}

/// Collects roots and closes them over a provider and a subtype index.
pub struct TypeOracleBuilder<'a> {
    provider: &'a dyn TypeInfoProvider,
    index: &'a SubtypeIndex,
    direction: Direction,
    options: BuilderOptions,
    roots: BTreeSet<TypeRef>,
}

impl<'a> TypeOracleBuilder<'a> {
    /// New builder with default options.
    pub fn new(
        provider: &'a dyn TypeInfoProvider,
        index: &'a SubtypeIndex,
        direction: Direction,
    ) -> Self {
        Self {
            provider,
            index,
            direction,
            options: BuilderOptions::default(),
            roots: BTreeSet::new(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a root type. Adding the same root twice has no effect.
    pub fn add_root(&mut self, root: TypeRef) -> &mut Self {
        self.roots.insert(root);
        self
    }

    /// Add several roots.
    pub fn add_roots(&mut self, roots: impl IntoIterator<Item = TypeRef>) -> &mut Self {
        self.roots.extend(roots);
        self
    }

    /// Close every root independently and union the successful closures.
    #[instrument(skip(self), fields(direction = ?self.direction, roots = self.roots.len()))]
    pub fn build(&self) -> OracleBuild {
        let mut types = BTreeMap::new();
        let mut problems = Vec::new();
        for root in &self.roots {
            match self.close(root) {
                Ok(closure) => {
                    debug!(root = %root, members = closure.len(), "closed root");
                    types.extend(closure);
                }
                Err(error) => {
                    warn!(root = %root, %error, "root rejected");
                    problems.push(RootProblem {
                        root: root.clone(),
                        error,
                    });
                }
            }
        }
        info!(members = types.len(), problems = problems.len(), "oracle built");
        OracleBuild {
            oracle: SerializableTypeOracle::new(self.direction, types),
            problems,
        }
    }

    fn close(&self, root: &TypeRef) -> Result<BTreeMap<TypeRef, TypeFacts>, OracleError> {
        let mut marked = BTreeMap::new();
        let mut slots = BTreeSet::new();
        let mut queue = VecDeque::from([(root.clone(), Reach::Slot)]);
        while let Some((ty, reach)) = queue.pop_front() {
            if reach == Reach::Slot {
                if let TypeRef::Declared(name) = &ty {
                    slots.insert(name.clone());
                }
            }
            if marked.contains_key(&ty) {
                continue;
            }
            let facts = self.expand(&ty, &mut queue)?;
            marked.insert(ty, facts);
        }
        if self.direction == Direction::Read {
            for name in &slots {
                self.check_instantiable(name)?;
            }
        }
        Ok(marked)
    }

    fn expand(
        &self,
        ty: &TypeRef,
        queue: &mut VecDeque<(TypeRef, Reach)>,
    ) -> Result<TypeFacts, OracleError> {
        let name = match ty {
            TypeRef::Primitive(_) => {
                return Ok(TypeFacts {
                    kind: FactKind::Primitive,
                    instantiable: true,
                    custom: false,
                });
            }
            TypeRef::Array { .. } => {
                if let Some(element) = ty.element() {
                    queue.push_back((element, Reach::Slot));
                }
                return Ok(TypeFacts {
                    kind: FactKind::Array,
                    instantiable: true,
                    custom: false,
                });
            }
            TypeRef::Declared(name) => name,
        };
        let decl = self
            .provider
            .declaration(name)
            .ok_or_else(|| OracleError::UnresolvableType { name: name.clone() })?;
        let kind = match decl.kind {
            DeclKind::Class => FactKind::Class,
            DeclKind::Enum => FactKind::Enum,
            DeclKind::Interface => FactKind::Interface,
        };

        if !(self.direction == Direction::Write && self.options.prune_write_subtypes) {
            for sub in self.index.subtypes(name) {
                queue.push_back((TypeRef::declared(sub), Reach::Subtype));
            }
        }

        if let Some(custom) = &decl.custom_serializer {
            for required in &custom.requires {
                queue.push_back((required.clone(), Reach::Slot));
            }
        } else {
            if let Some(sup) = decl.superclass.as_deref() {
                if self.provider.declaration(sup).is_some() {
                    queue.push_back((TypeRef::declared(sup), Reach::Superclass));
                }
            }
            for field in decl.eligible_fields() {
                queue.push_back((field.ty.clone(), Reach::Slot));
            }
        }

        Ok(TypeFacts {
            kind,
            instantiable: decl.is_instantiable(),
            custom: decl.custom_serializer.is_some(),
        })
    }

    /// A reader must be able to produce some value for a slot typed `name`:
    /// `name` itself or one of its known subtypes has to be instantiable.
    fn check_instantiable(&self, name: &str) -> Result<(), OracleError> {
        if self.provider.is_instantiable(name) {
            return Ok(());
        }
        if self
            .index
            .all_subtypes(name)
            .into_iter()
            .any(|sub| self.provider.is_instantiable(sub))
        {
            return Ok(());
        }
        let name = name.to_owned();
        if self.provider.is_abstract(&name) {
            Err(OracleError::IncompleteClosure { name })
        } else {
            Err(OracleError::NotInstantiable { name })
        }
    }
}
