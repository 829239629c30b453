//! Fully qualified names: `[kind:]part(.part)*` with optional trailing
//! wildcard.
//!
//! A FQN is a transient value: it is resolved against the entity graph the
//! moment it is constructed and only keeps the traversed node chain. `*`
//! in the final segment selects every entity of the subtree, `?` only the
//! direct children. Wildcards anywhere else are ordinary (failing) name
//! lookups.

use crate::entity::{EntityGraph, NetlistKinds, NodeId, TestbenchKinds};
use crate::error::ConfigError;

/// Optional FQN kind prefix (`src:`, `tb:`, `nl:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Unknown,
    Source,
    Testbench,
    Netlist,
}

impl EntityKind {
    /// Unknown prefixes map to `Unknown` rather than failing; the in-band
    /// prefix vocabulary is open-ended.
    pub fn parse(value: &str) -> Self {
        match value {
            "src" => EntityKind::Source,
            "tb" => EntityKind::Testbench,
            "nl" => EntityKind::Netlist,
            _ => EntityKind::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Unknown => "??",
            EntityKind::Source => "src",
            EntityKind::Testbench => "tb",
            EntityKind::Netlist => "nl",
        }
    }
}

/// Terminal of a resolved FQN: a concrete node or a wildcard over a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FqnTarget {
    /// A concrete library, namespace or IP core node.
    Node(NodeId),
    /// `*`: every entity in the subtree below `parent`.
    Star { parent: NodeId },
    /// `?`: only the direct child entities of `parent`.
    Ask { parent: NodeId },
}

/// A resolved fully qualified name.
#[derive(Debug, Clone)]
pub struct Fqn {
    kind: EntityKind,
    /// Root-to-terminal chain of traversed nodes (wildcards excluded).
    parts: Vec<NodeId>,
    target: FqnTarget,
    wildcard: Option<String>,
}

impl Fqn {
    /// Parse and resolve `text` against the graph.
    ///
    /// `library` overrides the graph's default library for unqualified
    /// names. Resolution never guesses: a missing or invisible segment
    /// fails, reporting the resolved prefix and the failing suffix.
    pub fn resolve(
        graph: &EntityGraph,
        text: &str,
        library: Option<&str>,
        default_kind: EntityKind,
    ) -> Result<Fqn, ConfigError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let segments: Vec<&str> = text.split(':').collect();
        let (kind, entity) = match segments.as_slice() {
            [entity] => (default_kind, *entity),
            [prefix, entity] => (EntityKind::parse(prefix), *entity),
            _ => return Err(ConfigError::MalformedName(text.to_string())),
        };
        if entity.is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let mut parts: Vec<String> = entity.split('.').map(str::to_string).collect();
        let library_name = library.unwrap_or_else(|| graph.default_library_name());
        if graph.library(&parts[0]).is_none() {
            parts.insert(0, library_name.to_string());
        }

        let not_found = |pos: usize| ConfigError::EntityNotFound {
            resolved: parts[..pos].join("."),
            unresolved: parts[pos..].join("."),
        };

        let lib = graph.library(&parts[0]).ok_or_else(|| not_found(0))?;
        let mut chain = vec![lib];
        let mut cur = lib;
        let last = parts.len() - 1;
        for (pos, part) in parts.iter().enumerate().skip(1) {
            if pos == last && part.contains('*') {
                return Ok(Fqn {
                    kind,
                    parts: chain,
                    target: FqnTarget::Star { parent: cur },
                    wildcard: Some(part.clone()),
                });
            }
            if pos == last && part.contains('?') {
                return Ok(Fqn {
                    kind,
                    parts: chain,
                    target: FqnTarget::Ask { parent: cur },
                    wildcard: Some(part.clone()),
                });
            }
            match graph.lookup(cur, part) {
                Some(next) => {
                    chain.push(next);
                    cur = next;
                }
                None => return Err(not_found(pos)),
            }
        }

        Ok(Fqn {
            kind,
            parts: chain,
            target: FqnTarget::Node(cur),
            wildcard: None,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn target(&self) -> FqnTarget {
        self.target
    }

    /// The traversed node chain, root first (wildcard terminal excluded).
    pub fn parts(&self) -> &[NodeId] {
        &self.parts
    }

    /// Is the terminal a wildcard?
    pub fn is_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    /// Expand the terminal to concrete IP cores.
    ///
    /// A concrete core yields itself; wildcards enumerate their parent.
    /// A terminal namespace yields nothing (callers that need entities
    /// should pass a wildcard).
    pub fn entities(&self, graph: &EntityGraph) -> Vec<NodeId> {
        match self.target {
            FqnTarget::Node(id) => {
                if graph.node(id).is_core() {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
            FqnTarget::Star { parent } => graph.all_entities(parent),
            FqnTarget::Ask { parent } => graph.entities(parent),
        }
    }

    /// Testbenches of every selected entity, filtered by kind.
    pub fn testbenches(&self, graph: &EntityGraph, kinds: TestbenchKinds) -> Vec<NodeId> {
        self.entities(graph)
            .into_iter()
            .flat_map(|entity| graph.testbenches(entity, kinds))
            .collect()
    }

    /// Netlists of every selected entity, filtered by kind.
    pub fn netlists(&self, graph: &EntityGraph, kinds: NetlistKinds) -> Vec<NodeId> {
        self.entities(graph)
            .into_iter()
            .flat_map(|entity| graph.netlists(entity, kinds))
            .collect()
    }

    /// Dotted display form of the terminal.
    pub fn display(&self, graph: &EntityGraph) -> String {
        match (&self.wildcard, self.target) {
            (Some(token), FqnTarget::Star { parent } | FqnTarget::Ask { parent }) => {
                format!("{}.{token}", graph.display_name(parent))
            }
            (_, FqnTarget::Node(id)) => graph.display_name(id),
            _ => unreachable!("wildcard targets always carry their token"),
        }
    }
}
