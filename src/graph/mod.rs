use std::collections::HashMap;
use std::fmt;

/// Index of a node within a [`StaticDag`].
pub type NodeId = usize;

/// How the publish subsystem materializes an output at its destination.
///
/// The cleanup engine treats the mode as an opaque value; it only needs to
/// know which modes leave the destination referring back into the working
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Copy,
    CopyNoFollow,
    Move,
    Link,
    RelativeLink,
    Symlink,
}

impl PublishMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Copy => "copy",
            PublishMode::CopyNoFollow => "copyNoFollow",
            PublishMode::Move => "move",
            PublishMode::Link => "link",
            PublishMode::RelativeLink => "rellink",
            PublishMode::Symlink => "symlink",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "copy" => Some(PublishMode::Copy),
            "copyNoFollow" => Some(PublishMode::CopyNoFollow),
            "move" => Some(PublishMode::Move),
            "link" => Some(PublishMode::Link),
            "rellink" => Some(PublishMode::RelativeLink),
            "symlink" => Some(PublishMode::Symlink),
            _ => None,
        }
    }

    /// Modes that publish a reference into the working directory instead of
    /// an independent copy. Removing the source would leave the published
    /// destination dangling.
    pub fn disables_eager_cleanup(&self) -> bool {
        matches!(
            self,
            PublishMode::CopyNoFollow | PublishMode::RelativeLink | PublishMode::Symlink
        )
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file-typed output parameter declared by a process.
#[derive(Debug, Clone)]
pub struct FileOutputParam {
    /// Parameter name as declared in the workflow script.
    pub name: String,
    /// Whether the parameter re-exports input files alongside the outputs.
    pub include_inputs: bool,
}

/// Compile-time configuration of a workflow process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Process name, unique within the workflow.
    pub name: String,
    /// Publish mode, if any outputs are published.
    pub publish_mode: Option<PublishMode>,
    /// Declared file-typed output parameters.
    pub file_outputs: Vec<FileOutputParam>,
}

impl ProcessConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publish_mode: None,
            file_outputs: Vec::new(),
        }
    }

    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = Some(mode);
        self
    }

    pub fn with_file_output(mut self, name: impl Into<String>, include_inputs: bool) -> Self {
        self.file_outputs.push(FileOutputParam {
            name: name.into(),
            include_inputs,
        });
        self
    }
}

/// A node of the abstract workflow graph: either a process or a channel
/// operator. Operators are transparent when deriving process consumers.
#[derive(Debug, Clone)]
pub enum GraphNode {
    Process(ProcessConfig),
    Operator { label: String },
}

/// The abstract process graph produced by the workflow compiler.
///
/// Nodes are referenced by insertion index; edges point in dataflow
/// direction. The graph is built once before execution starts and is
/// read-only afterwards.
#[derive(Default)]
pub struct StaticDag {
    nodes: Vec<GraphNode>,
    /// Forward edges, node index to downstream node indices.
    edges: HashMap<NodeId, Vec<NodeId>>,
}

impl StaticDag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&mut self, config: ProcessConfig) -> NodeId {
        self.nodes.push(GraphNode::Process(config));
        self.nodes.len() - 1
    }

    pub fn add_operator(&mut self, label: impl Into<String>) -> NodeId {
        self.nodes.push(GraphNode::Operator {
            label: label.into(),
        });
        self.nodes.len() - 1
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        self.edges.entry(from).or_default().push(to);
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        match self.edges.get(&node) {
            Some(targets) => targets.as_slice(),
            None => &[],
        }
    }

    /// All process configurations in the graph, in insertion order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessConfig> {
        self.nodes.iter().filter_map(|node| match node {
            GraphNode::Process(config) => Some(config),
            GraphNode::Operator { .. } => None,
        })
    }
}
