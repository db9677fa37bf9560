use std::collections::{HashMap, HashSet};

use crate::graph::{GraphNode, StaticDag};


/// Derive the process-level consumer sets from the static workflow graph.
///
/// For each process the walk follows forward edges; operator nodes are
/// transparent transit points, process nodes terminate the branch. A
/// process with no downstream process becomes its own consumer so its
/// deletions are never blocked on an empty set.
pub(crate) fn process_consumers(dag: &StaticDag) -> HashMap<String, HashSet<String>> {
    let mut result = HashMap::new();

    for (index, node) in dag.nodes().iter().enumerate() {
        let config = match node {
            GraphNode::Process(config) => config,
            GraphNode::Operator { .. } => continue,
        };

        let mut consumers = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<usize> = dag.successors(index).to_vec();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            match &dag.nodes()[next] {
                GraphNode::Process(downstream) => {
                    consumers.insert(downstream.name.clone());
                }
                GraphNode::Operator { .. } => {
                    stack.extend_from_slice(dag.successors(next));
                }
            }
        }

        if consumers.is_empty() {
            consumers.insert(config.name.clone());
        }
        result.insert(config.name.clone(), consumers);
    }

    result
}
