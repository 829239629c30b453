//! Hierarchical entity graph: Library -> Namespace -> IP core -> variants.
//!
//! The graph is built by walking configuration sections. Constructing a
//! namespace materializes its direct children from exactly one section;
//! grandchildren recurse naturally. Testbench and netlist metadata beyond
//! the kind tag is loaded lazily on first access, so graph construction
//! stays O(config sections) and never touches the filesystem.
//!
//! Nodes live in an arena indexed by [`NodeId`]; children hold a non-owning
//! back-reference to their parent for path traversal only.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::config::Config;
use crate::error::ConfigError;
use crate::logging::Logger;

/// Node visibility, totally ordered. A node is visible iff the graph's
/// threshold is at most the node's visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Unknown,
    Private,
    Public,
}

impl Visibility {
    pub fn parse(value: &str, section: &str) -> Result<Self, ConfigError> {
        match value {
            "Unknown" => Ok(Visibility::Unknown),
            "Private" => Ok(Visibility::Private),
            "Public" => Ok(Visibility::Public),
            _ => Err(ConfigError::InvalidVisibility {
                section: section.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Terminal verdict of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationResult {
    NotRun,
    DryRun,
    Error,
    Failed,
    NoAsserts,
    Passed,
    GuiRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestbenchKind {
    Vhdl,
    Cocotb,
}

impl TestbenchKind {
    fn bit(self) -> u8 {
        match self {
            TestbenchKind::Vhdl => 1 << 0,
            TestbenchKind::Cocotb => 1 << 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestbenchKind::Vhdl => "VHDL testbench",
            TestbenchKind::Cocotb => "Cocotb testbench",
        }
    }
}

/// Set of testbench kinds used to filter enumerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestbenchKinds(u8);

impl TestbenchKinds {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b11);

    pub fn single(kind: TestbenchKind) -> Self {
        Self(kind.bit())
    }

    pub fn contains(self, kind: TestbenchKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetlistKind {
    Lattice,
    Quartus,
    Xst,
    CoreGenerator,
    Vivado,
}

impl NetlistKind {
    fn bit(self) -> u8 {
        match self {
            NetlistKind::Lattice => 1 << 0,
            NetlistKind::Quartus => 1 << 1,
            NetlistKind::Xst => 1 << 2,
            NetlistKind::CoreGenerator => 1 << 3,
            NetlistKind::Vivado => 1 << 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NetlistKind::Lattice => "Lattice netlist",
            NetlistKind::Quartus => "Quartus netlist",
            NetlistKind::Xst => "XST netlist",
            NetlistKind::CoreGenerator => "Core Generator netlist",
            NetlistKind::Vivado => "Vivado netlist",
        }
    }
}

/// Set of netlist kinds used to filter enumerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetlistKinds(u8);

impl NetlistKinds {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1_1111);

    pub fn single(kind: NetlistKind) -> Self {
        Self(kind.bit())
    }

    pub fn contains(self, kind: NetlistKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Index of a node in the entity graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Lazily loaded testbench metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestbenchDetails {
    pub module_name: String,
    pub files_file: PathBuf,
    /// Cocotb only: the Python toplevel module.
    pub top_level: Option<String>,
}

/// Lazily loaded netlist metadata. Per-kind extras stay `None` for the
/// kinds that do not define them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlistDetails {
    pub module_name: String,
    pub dependencies: Vec<String>,
    pub rules_file: Option<PathBuf>,
    pub files_file: Option<PathBuf>,
    pub xcf_file: Option<PathBuf>,
    pub filter_file: Option<PathBuf>,
    pub xst_template_file: Option<PathBuf>,
    pub xco_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Testbench {
    kind: TestbenchKind,
    result: Cell<SimulationResult>,
    details: RefCell<Option<TestbenchDetails>>,
}

#[derive(Debug)]
pub struct Netlist {
    kind: NetlistKind,
    details: RefCell<Option<NetlistDetails>>,
}

#[derive(Debug, Default)]
struct NamespaceData {
    /// lowercase name -> child namespace, insertion order preserved
    namespaces: IndexMap<String, NodeId>,
    /// lowercase name -> child entity, insertion order preserved
    entities: IndexMap<String, NodeId>,
}

#[derive(Debug, Default)]
struct CoreData {
    dependencies: Vec<String>,
    testbenches: Vec<NodeId>,
    netlists: Vec<NodeId>,
}

#[derive(Debug)]
enum NodeKind {
    Library(NamespaceData),
    Namespace(NamespaceData),
    Core(CoreData),
    Testbench(Testbench),
    Netlist(Netlist),
}

#[derive(Debug)]
pub struct Node {
    name: String,
    section: String,
    parent: Option<NodeId>,
    visibility: Visibility,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_library(&self) -> bool {
        matches!(self.kind, NodeKind::Library(..))
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, NodeKind::Library(..) | NodeKind::Namespace(..))
    }

    pub fn is_core(&self) -> bool {
        matches!(self.kind, NodeKind::Core(..))
    }
}

/// The namespace root: one default library plus explicitly added libraries.
#[derive(Debug)]
pub struct EntityGraph {
    nodes: Vec<Node>,
    /// lowercase library name -> node, insertion order preserved
    libraries: IndexMap<String, NodeId>,
    default_library: String,
    threshold: Visibility,
}

impl EntityGraph {
    /// Build the graph for the default library.
    pub fn new(
        config: &Config,
        logger: &Logger,
        default_library: &str,
        threshold: Visibility,
    ) -> Result<Self, ConfigError> {
        let mut graph = Self {
            nodes: Vec::new(),
            libraries: IndexMap::new(),
            default_library: default_library.to_string(),
            threshold,
        };
        graph.add_library(config, logger, default_library, default_library)?;
        Ok(graph)
    }

    /// Add another library rooted at `section_prefix`.
    pub fn add_library(
        &mut self,
        config: &Config,
        logger: &Logger,
        name: &str,
        section_prefix: &str,
    ) -> Result<NodeId, ConfigError> {
        let id = self.load_namespace(config, logger, name, section_prefix.to_string(), None, true)?;
        self.libraries.insert(name.to_lowercase(), id);
        Ok(id)
    }

    pub fn default_library_name(&self) -> &str {
        &self.default_library
    }

    pub fn threshold(&self) -> Visibility {
        self.threshold
    }

    pub fn libraries(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.libraries.values().copied()
    }

    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.values().map(|id| self.node(*id).name())
    }

    /// Case-insensitive library lookup.
    pub fn library(&self, name: &str) -> Option<NodeId> {
        self.libraries.get(&name.to_lowercase()).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Threshold check: visible iff `threshold <= visibility`.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.threshold <= self.node(id).visibility
    }

    /// Tree level; libraries sit at level 0.
    pub fn level(&self, id: NodeId) -> usize {
        match self.node(id).parent {
            None => 0,
            Some(parent) => self.level(parent) + 1,
        }
    }

    /// Root-to-self chain. The chain must start at a Library.
    pub fn path(&self, id: NodeId) -> Result<Vec<NodeId>, ConfigError> {
        let mut chain = vec![id];
        let mut cur = id;
        while !self.node(cur).is_library() {
            match self.node(cur).parent {
                Some(parent) => {
                    chain.insert(0, parent);
                    cur = parent;
                }
                None => return Err(ConfigError::HierarchyError),
            }
        }
        Ok(chain)
    }

    /// Dotted full name, e.g. `PoC.arith.prng`.
    pub fn display_name(&self, id: NodeId) -> String {
        let mut names = vec![self.node(id).name().to_string()];
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            names.insert(0, self.node(parent).name().to_string());
            cur = parent;
        }
        names.join(".")
    }

    // ------------------------------------------------------------------
    // Namespace enumeration (visibility filtered)
    // ------------------------------------------------------------------

    fn namespace_data(&self, id: NodeId) -> &NamespaceData {
        match &self.node(id).kind {
            NodeKind::Library(data) | NodeKind::Namespace(data) => data,
            _ => panic!("node {:?} is not a namespace", id),
        }
    }

    fn namespace_data_mut(&mut self, id: NodeId) -> &mut NamespaceData {
        match &mut self.nodes[id.0].kind {
            NodeKind::Library(data) | NodeKind::Namespace(data) => data,
            _ => panic!("node {:?} is not a namespace", id),
        }
    }

    pub fn namespaces(&self, id: NodeId) -> Vec<NodeId> {
        self.namespace_data(id)
            .namespaces
            .values()
            .copied()
            .filter(|ns| self.is_visible(*ns))
            .collect()
    }

    /// Direct child entities.
    pub fn entities(&self, id: NodeId) -> Vec<NodeId> {
        self.namespace_data(id)
            .entities
            .values()
            .copied()
            .filter(|e| self.is_visible(*e))
            .collect()
    }

    pub fn entity_names(&self, id: NodeId) -> Vec<String> {
        self.entities(id)
            .into_iter()
            .map(|e| self.node(e).name().to_string())
            .collect()
    }

    /// Entities of the whole subtree: sub-namespaces first, then own.
    pub fn all_entities(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for ns in self.namespaces(id) {
            result.extend(self.all_entities(ns));
        }
        result.extend(self.entities(id));
        result
    }

    /// Case-insensitive child lookup, namespaces before entities.
    /// Invisible children behave as missing.
    pub fn lookup(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let data = self.namespace_data(id);
        let key = name.to_lowercase();
        let child = data
            .namespaces
            .get(&key)
            .or_else(|| data.entities.get(&key))
            .copied()?;
        self.is_visible(child).then_some(child)
    }

    // ------------------------------------------------------------------
    // IP core accessors
    // ------------------------------------------------------------------

    fn core_data(&self, id: NodeId) -> &CoreData {
        match &self.node(id).kind {
            NodeKind::Core(data) => data,
            _ => panic!("node {:?} is not an IP core", id),
        }
    }

    /// Unresolved dependency names of an IP core (edge list only).
    pub fn dependencies(&self, id: NodeId) -> &[String] {
        &self.core_data(id).dependencies
    }

    pub fn testbenches(&self, id: NodeId, kinds: TestbenchKinds) -> Vec<NodeId> {
        self.core_data(id)
            .testbenches
            .iter()
            .copied()
            .filter(|tb| kinds.contains(self.testbench(*tb).kind) && self.is_visible(*tb))
            .collect()
    }

    pub fn netlists(&self, id: NodeId, kinds: NetlistKinds) -> Vec<NodeId> {
        self.core_data(id)
            .netlists
            .iter()
            .copied()
            .filter(|nl| kinds.contains(self.netlist(*nl).kind) && self.is_visible(*nl))
            .collect()
    }

    /// "The" testbench of a kind; errors when none is configured.
    pub fn first_testbench(
        &self,
        id: NodeId,
        kind: TestbenchKind,
    ) -> Result<NodeId, ConfigError> {
        self.core_data(id)
            .testbenches
            .iter()
            .copied()
            .find(|tb| self.testbench(*tb).kind == kind)
            .ok_or_else(|| ConfigError::NoVariant {
                entity: self.display_name(id),
                kind: kind.label(),
            })
    }

    /// "The" netlist of a kind; errors when none is configured.
    pub fn first_netlist(&self, id: NodeId, kind: NetlistKind) -> Result<NodeId, ConfigError> {
        self.core_data(id)
            .netlists
            .iter()
            .copied()
            .find(|nl| self.netlist(*nl).kind == kind)
            .ok_or_else(|| ConfigError::NoVariant {
                entity: self.display_name(id),
                kind: kind.label(),
            })
    }

    // ------------------------------------------------------------------
    // Testbench / netlist lazy metadata
    // ------------------------------------------------------------------

    fn testbench(&self, id: NodeId) -> &Testbench {
        match &self.node(id).kind {
            NodeKind::Testbench(tb) => tb,
            _ => panic!("node {:?} is not a testbench", id),
        }
    }

    fn netlist(&self, id: NodeId) -> &Netlist {
        match &self.node(id).kind {
            NodeKind::Netlist(nl) => nl,
            _ => panic!("node {:?} is not a netlist", id),
        }
    }

    pub fn testbench_kind(&self, id: NodeId) -> TestbenchKind {
        self.testbench(id).kind
    }

    pub fn netlist_kind(&self, id: NodeId) -> NetlistKind {
        self.netlist(id).kind
    }

    pub fn testbench_result(&self, id: NodeId) -> SimulationResult {
        self.testbench(id).result.get()
    }

    pub fn set_testbench_result(&self, id: NodeId, result: SimulationResult) {
        self.testbench(id).result.set(result);
    }

    /// Load all deferred testbench fields exactly once.
    fn ensure_testbench_loaded(&self, config: &Config, id: NodeId) -> Result<(), ConfigError> {
        let tb = self.testbench(id);
        if tb.details.borrow().is_some() {
            return Ok(());
        }
        let section = self.node(id).section();
        let details = TestbenchDetails {
            module_name: config.get(section, "TestbenchModule")?,
            files_file: PathBuf::from(config.get(section, "FilesFile")?),
            top_level: match tb.kind {
                TestbenchKind::Cocotb => Some(config.get(section, "TopLevel")?),
                TestbenchKind::Vhdl => None,
            },
        };
        *tb.details.borrow_mut() = Some(details);
        Ok(())
    }

    pub fn testbench_details(
        &self,
        config: &Config,
        id: NodeId,
    ) -> Result<TestbenchDetails, ConfigError> {
        self.ensure_testbench_loaded(config, id)?;
        Ok(self
            .testbench(id)
            .details
            .borrow()
            .clone()
            .expect("details loaded"))
    }

    pub fn testbench_module_name(
        &self,
        config: &Config,
        id: NodeId,
    ) -> Result<String, ConfigError> {
        Ok(self.testbench_details(config, id)?.module_name)
    }

    pub fn testbench_files_file(
        &self,
        config: &Config,
        id: NodeId,
    ) -> Result<PathBuf, ConfigError> {
        Ok(self.testbench_details(config, id)?.files_file)
    }

    /// Load all deferred netlist fields exactly once.
    fn ensure_netlist_loaded(&self, config: &Config, id: NodeId) -> Result<(), ConfigError> {
        let nl = self.netlist(id);
        if nl.details.borrow().is_some() {
            return Ok(());
        }
        let section = self.node(id).section();
        let kind = nl.kind;
        let optional_path = |option: &str| -> Result<Option<PathBuf>, ConfigError> {
            let value = config.get(section, option)?;
            Ok((!value.is_empty()).then(|| PathBuf::from(value)))
        };
        let details = NetlistDetails {
            module_name: config.get(section, "TopLevel")?,
            dependencies: if config.has_option(section, "Dependencies") {
                config
                    .get(section, "Dependencies")?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            } else {
                Vec::new()
            },
            rules_file: optional_path("RulesFile")?,
            files_file: match kind {
                NetlistKind::CoreGenerator => None,
                _ => Some(PathBuf::from(config.get(section, "FilesFile")?)),
            },
            xcf_file: match kind {
                NetlistKind::Xst => Some(PathBuf::from(config.get(section, "XSTConstraintsFile")?)),
                _ => None,
            },
            filter_file: match kind {
                NetlistKind::Xst => Some(PathBuf::from(config.get(section, "XSTFilterFile")?)),
                _ => None,
            },
            xst_template_file: match kind {
                NetlistKind::Xst => Some(PathBuf::from(config.get(section, "XSTOptionsFile")?)),
                _ => None,
            },
            xco_file: match kind {
                NetlistKind::CoreGenerator => {
                    Some(PathBuf::from(config.get(section, "CoreGeneratorFile")?))
                }
                _ => None,
            },
        };
        *nl.details.borrow_mut() = Some(details);
        Ok(())
    }

    pub fn netlist_details(
        &self,
        config: &Config,
        id: NodeId,
    ) -> Result<NetlistDetails, ConfigError> {
        self.ensure_netlist_loaded(config, id)?;
        Ok(self
            .netlist(id)
            .details
            .borrow()
            .clone()
            .expect("details loaded"))
    }

    pub fn netlist_module_name(
        &self,
        config: &Config,
        id: NodeId,
    ) -> Result<String, ConfigError> {
        Ok(self.netlist_details(config, id)?.module_name)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn read_visibility(&self, config: &Config, section: &str) -> Result<Visibility, ConfigError> {
        let value = config.get(section, "Visibility")?;
        Visibility::parse(&value, section)
    }

    fn load_namespace(
        &mut self,
        config: &Config,
        logger: &Logger,
        name: &str,
        section: String,
        parent: Option<NodeId>,
        is_library: bool,
    ) -> Result<NodeId, ConfigError> {
        if !config.has_section(&section) {
            return Err(ConfigError::MissingSection(section));
        }
        let visibility = self.read_visibility(config, &section)?;
        let kind = if is_library {
            NodeKind::Library(NamespaceData::default())
        } else {
            NodeKind::Namespace(NamespaceData::default())
        };
        let id = self.alloc(Node {
            name: name.to_string(),
            section: section.clone(),
            parent,
            visibility,
            kind,
        });

        let options: Vec<String> = config.options(&section)?.map(str::to_string).collect();
        for option in options {
            if option == "Visibility" {
                continue;
            }
            let tag = config.get(&section, &option)?;
            match tag.as_str() {
                "Namespace" => {
                    let child_section = format!("{section}.{option}");
                    let child =
                        self.load_namespace(config, logger, &option, child_section, Some(id), false)?;
                    self.namespace_data_mut(id)
                        .namespaces
                        .insert(option.to_lowercase(), child);
                }
                "Entity" => {
                    let child_section = entity_section(&section, &option);
                    let child = self.load_core(config, logger, &option, child_section, id)?;
                    self.namespace_data_mut(id)
                        .entities
                        .insert(option.to_lowercase(), child);
                }
                other => {
                    // tolerated for forward compatibility, but not silently
                    logger.warning(
                        format!(
                            "Unknown kind '{other}' for option '{option}' in section [{section}]."
                        ),
                        0,
                    );
                }
            }
        }
        Ok(id)
    }

    fn load_core(
        &mut self,
        config: &Config,
        logger: &Logger,
        name: &str,
        section: String,
        parent: NodeId,
    ) -> Result<NodeId, ConfigError> {
        if !config.has_section(&section) {
            return Err(ConfigError::MissingSection(section));
        }
        let visibility = self.read_visibility(config, &section)?;
        let dependencies = if config.has_option(&section, "Dependencies") {
            config
                .get(&section, "Dependencies")?
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        let id = self.alloc(Node {
            name: name.to_string(),
            section: section.clone(),
            parent: Some(parent),
            visibility,
            kind: NodeKind::Core(CoreData {
                dependencies,
                ..CoreData::default()
            }),
        });

        let options: Vec<String> = config.options(&section)?.map(str::to_string).collect();
        for option in options {
            if option == "Visibility" || option == "Dependencies" {
                continue;
            }
            let tag = config.get(&section, &option)?.to_lowercase();
            let variant = match tag.as_str() {
                "vhdltestbench" => Some(("TB", VariantKind::Testbench(TestbenchKind::Vhdl))),
                "cocotestbench" => Some(("COCOTB", VariantKind::Testbench(TestbenchKind::Cocotb))),
                "lsenetlist" => Some(("LSE", VariantKind::Netlist(NetlistKind::Lattice))),
                "quartusnetlist" => Some(("QMAP", VariantKind::Netlist(NetlistKind::Quartus))),
                "xstnetlist" => Some(("XST", VariantKind::Netlist(NetlistKind::Xst))),
                "coregennetlist" => {
                    Some(("CG", VariantKind::Netlist(NetlistKind::CoreGenerator)))
                }
                "vivadonetlist" => Some(("VIVADO", VariantKind::Netlist(NetlistKind::Vivado))),
                _ => None,
            };
            let Some((prefix, variant)) = variant else {
                logger.warning(
                    format!("Unknown kind '{tag}' for option '{option}' in section [{section}]."),
                    0,
                );
                continue;
            };
            let child_section = format!("{}.{option}", section.replacen("IP", prefix, 1));
            let child = self.load_variant(config, &option, child_section, id, variant)?;
            match variant {
                VariantKind::Testbench(..) => {
                    match &mut self.nodes[id.0].kind {
                        NodeKind::Core(data) => data.testbenches.push(child),
                        _ => unreachable!(),
                    };
                }
                VariantKind::Netlist(..) => {
                    match &mut self.nodes[id.0].kind {
                        NodeKind::Core(data) => data.netlists.push(child),
                        _ => unreachable!(),
                    };
                }
            }
        }
        Ok(id)
    }

    fn load_variant(
        &mut self,
        config: &Config,
        name: &str,
        section: String,
        parent: NodeId,
        variant: VariantKind,
    ) -> Result<NodeId, ConfigError> {
        if !config.has_section(&section) {
            return Err(ConfigError::MissingSection(section));
        }
        let visibility = self.read_visibility(config, &section)?;
        let kind = match variant {
            VariantKind::Testbench(kind) => NodeKind::Testbench(Testbench {
                kind,
                result: Cell::new(SimulationResult::NotRun),
                details: RefCell::new(None),
            }),
            VariantKind::Netlist(kind) => NodeKind::Netlist(Netlist {
                kind,
                details: RefCell::new(None),
            }),
        };
        Ok(self.alloc(Node {
            name: name.to_string(),
            section,
            parent: Some(parent),
            visibility,
            kind,
        }))
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Pretty-print the subtree rooted at `id` (visible nodes only).
    pub fn render_tree(&self, id: NodeId, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        let node = self.node(id);
        let mut buffer = String::new();
        if node.is_namespace() {
            buffer.push_str(&format!("{pad}{}\n", node.name()));
            for entity in self.entities(id) {
                buffer.push_str(&self.render_tree(entity, indent + 1));
            }
            for ns in self.namespaces(id) {
                buffer.push_str(&self.render_tree(ns, indent + 1));
            }
        } else if node.is_core() {
            buffer.push_str(&format!("{pad}Entity: {}\n", node.name()));
            for tb in self.testbenches(id, TestbenchKinds::ALL) {
                buffer.push_str(&format!(
                    "{pad}  {}: {}\n",
                    self.testbench(tb).kind.label(),
                    self.node(tb).name()
                ));
            }
            for nl in self.netlists(id, NetlistKinds::ALL) {
                buffer.push_str(&format!(
                    "{pad}  {}: {}\n",
                    self.netlist(nl).kind.label(),
                    self.node(nl).name()
                ));
            }
        }
        buffer
    }
}

#[derive(Debug, Clone, Copy)]
enum VariantKind {
    Testbench(TestbenchKind),
    Netlist(NetlistKind),
}

/// Section name of an entity: library prefix replaced by `IP`.
fn entity_section(parent_section: &str, name: &str) -> String {
    let mut parts = vec!["IP"];
    parts.extend(parent_section.split('.').skip(1));
    parts.push(name);
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Severity;
    use crate::testutil::{sample_config, sample_graph};

    fn resolve(graph: &EntityGraph, path: &[&str]) -> NodeId {
        let mut cur = graph.library(path[0]).expect("library");
        for part in &path[1..] {
            cur = graph.lookup(cur, part).expect("child");
        }
        cur
    }

    #[test]
    fn construction_materializes_children() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let lib = graph.library("PoC").unwrap();
        assert!(graph.node(lib).is_library());
        assert_eq!(graph.level(lib), 0);

        let arith = graph.lookup(lib, "arith").unwrap();
        assert!(graph.node(arith).is_namespace());
        assert_eq!(graph.entity_names(arith), ["prng", "counter"]);
        assert_eq!(graph.display_name(resolve(&graph, &["PoC", "arith", "prng"])), "PoC.arith.prng");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let a = resolve(&graph, &["poc", "ARITH", "Prng"]);
        let b = resolve(&graph, &["PoC", "arith", "prng"]);
        assert_eq!(a, b);
    }

    #[test]
    fn visibility_threshold_filters_children() {
        // Public threshold: the Private sub-namespace disappears.
        let (_config, graph) = sample_graph(Visibility::Public);
        let arith = resolve(&graph, &["PoC", "arith"]);
        assert!(graph.lookup(arith, "internal").is_none());
        let names: Vec<_> = graph
            .all_entities(arith)
            .into_iter()
            .map(|e| graph.node(e).name().to_string())
            .collect();
        assert_eq!(names, ["prng", "counter"]);

        // Private threshold: it is present again.
        let (_config, graph) = sample_graph(Visibility::Private);
        let arith = resolve(&graph, &["PoC", "arith"]);
        assert!(graph.lookup(arith, "internal").is_some());
        let names: Vec<_> = graph
            .all_entities(arith)
            .into_iter()
            .map(|e| graph.node(e).name().to_string())
            .collect();
        assert_eq!(names, ["secret", "prng", "counter"]);
    }

    #[test]
    fn dependencies_are_an_unresolved_edge_list() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        assert_eq!(graph.dependencies(prng), ["counter", "fifo"]);
    }

    #[test]
    fn missing_variant_is_a_configuration_error() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let counter = resolve(&graph, &["PoC", "arith", "counter"]);
        let err = graph
            .first_testbench(counter, TestbenchKind::Cocotb)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoVariant { .. }));
    }

    #[test]
    fn lazy_details_load_exactly_once() {
        let (mut config, graph) = sample_graph(Visibility::Public);
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        let tb = graph.first_testbench(prng, TestbenchKind::Vhdl).unwrap();

        let first = graph.testbench_module_name(&config, tb).unwrap();
        assert_eq!(first, "arith_prng_tb");

        // mutating the config after the first access must not change the
        // cached details: the load routine ran exactly once
        config.set("TB.arith.prng.prng_tb", "TestbenchModule", "changed");
        let second = graph.testbench_module_name(&config, tb).unwrap();
        assert_eq!(second, "arith_prng_tb");
        assert_eq!(
            graph.testbench_files_file(&config, tb).unwrap(),
            PathBuf::from("tb/arith/arith_prng_tb.files")
        );
    }

    #[test]
    fn construction_does_not_read_lazy_keys() {
        // Removing every lazy key must not break graph construction.
        let mut config = sample_config();
        config.set("TB.arith.prng.prng_tb", "TestbenchModule", "${missing:ref}");
        let logger = Logger::plain(Severity::Fatal);
        assert!(EntityGraph::new(&config, &logger, "PoC", Visibility::Public).is_ok());
    }

    #[test]
    fn netlist_details_carry_kind_extras() {
        let (config, graph) = sample_graph(Visibility::Public);
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        let xst = graph.first_netlist(prng, NetlistKind::Xst).unwrap();
        let details = graph.netlist_details(&config, xst).unwrap();
        assert_eq!(details.module_name, "arith_prng");
        assert_eq!(details.rules_file, None);
        assert_eq!(details.xcf_file, Some(PathBuf::from("xst/arith_prng.xcf")));
        assert_eq!(
            details.xst_template_file,
            Some(PathBuf::from("xst/arith_prng.xst"))
        );
        assert_eq!(details.xco_file, None);
    }

    #[test]
    fn broken_netlist_dependencies_are_not_silently_dropped() {
        let (mut config, graph) = sample_graph(Visibility::Public);
        config.set("XST.arith.prng.prng_xst", "Dependencies", "${Dependencies}");
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        let xst = graph.first_netlist(prng, NetlistKind::Xst).unwrap();
        let err = graph.netlist_details(&config, xst).unwrap_err();
        assert!(matches!(err, ConfigError::InterpolationCycle { .. }));
    }

    #[test]
    fn testbench_result_is_mutable_per_run() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        let tb = graph.first_testbench(prng, TestbenchKind::Vhdl).unwrap();
        assert_eq!(graph.testbench_result(tb), SimulationResult::NotRun);
        graph.set_testbench_result(tb, SimulationResult::Passed);
        assert_eq!(graph.testbench_result(tb), SimulationResult::Passed);
    }

    #[test]
    fn path_terminates_at_library() {
        let (_config, graph) = sample_graph(Visibility::Public);
        let prng = resolve(&graph, &["PoC", "arith", "prng"]);
        let path = graph.path(prng).unwrap();
        assert_eq!(path.len(), 3);
        assert!(graph.node(path[0]).is_library());
        assert_eq!(graph.node(path[2]).name(), "prng");
    }

    #[test]
    fn missing_section_names_the_offender() {
        let mut config = sample_config();
        config.set("PoC", "ghost", "Namespace");
        let logger = Logger::plain(Severity::Fatal);
        let err = EntityGraph::new(&config, &logger, "PoC", Visibility::Public).unwrap_err();
        match err {
            ConfigError::MissingSection(section) => assert_eq!(section, "PoC.ghost"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_visibility_is_a_hard_error() {
        let mut config = sample_config();
        config.set("PoC.common", "Visibility", "Sometimes");
        let logger = Logger::plain(Severity::Fatal);
        let err = EntityGraph::new(&config, &logger, "PoC", Visibility::Public).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVisibility { .. }));
    }

    #[test]
    fn kind_sets_have_sentinels() {
        assert!(TestbenchKinds::ALL.contains(TestbenchKind::Cocotb));
        assert!(!TestbenchKinds::NONE.contains(TestbenchKind::Vhdl));
        let joined =
            NetlistKinds::single(NetlistKind::Xst).union(NetlistKinds::single(NetlistKind::Vivado));
        assert!(joined.contains(NetlistKind::Xst));
        assert!(joined.contains(NetlistKind::Vivado));
        assert!(!joined.contains(NetlistKind::Quartus));
    }
}
