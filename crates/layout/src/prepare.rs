//! Restructuring applied to the content tree before the host parses it.
//!
//! Figures leave the text flow and wait in a trailing figure pool; the engine
//! inserts them itself. A figure no text block links to is attributed to the
//! nearest preceding text block (or the first one after it) so it is still
//! placed somewhere.

use pagefig_idf::{ContentTree, IRNode};
use std::collections::HashSet;

#[derive(Default)]
struct Lifted {
    figures: Vec<IRNode>,
    /// Paths to text-bearing nodes in the restructured tree, in order.
    blocks: Vec<Vec<usize>>,
    /// Figure id and the index of the text block preceding it.
    anchors: Vec<(String, Option<usize>)>,
}

fn lift(nodes: &mut Vec<IRNode>, path: &mut Vec<usize>, out: &mut Lifted) {
    for node in std::mem::take(nodes) {
        match node {
            IRNode::Figure { .. } => {
                if let Some(id) = node.id() {
                    out.anchors.push((id.to_string(), out.blocks.len().checked_sub(1)));
                }
                out.figures.push(node);
            }
            IRNode::FigurePool { figures } => out.figures.extend(figures),
            node => {
                path.push(nodes.len());
                let text_bearing = node.is_text_bearing();
                nodes.push(node);
                if text_bearing {
                    out.blocks.push(path.clone());
                } else if let Some(children) = nodes.last_mut().and_then(IRNode::children_mut) {
                    lift(children, path, out);
                }
                path.pop();
            }
        }
    }
}

fn node_at_path<'a>(nodes: &'a mut [IRNode], path: &[usize]) -> Option<&'a mut IRNode> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get_mut(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    node_at_path(node.children_mut()?, rest)
}

fn linked_targets(nodes: &[IRNode], out: &mut HashSet<String>) {
    for node in nodes {
        for target in node.link_targets() {
            out.insert(target.trim_start_matches('#').to_string());
        }
        if let Some(meta) = node.meta() {
            out.extend(meta.implicit_refs.iter().cloned());
        }
        linked_targets(node.children(), out);
    }
}

/// Lifts figures into a trailing pool and adds implicit references for
/// figures nothing links to.
pub fn prepare_tree(mut tree: ContentTree) -> ContentTree {
    let mut linked = HashSet::new();
    linked_targets(&tree.children, &mut linked);

    let mut lifted = Lifted::default();
    lift(&mut tree.children, &mut Vec::new(), &mut lifted);

    for (figure_id, preceding) in &lifted.anchors {
        if linked.contains(figure_id) {
            continue;
        }
        let Some(path) = preceding
            .and_then(|i| lifted.blocks.get(i))
            .or_else(|| lifted.blocks.first())
        else {
            log::warn!("Figure '{figure_id}' has no text block to be attributed to");
            continue;
        };
        if let Some(meta) = node_at_path(&mut tree.children, path).and_then(IRNode::meta_mut) {
            log::debug!("Figure '{figure_id}' is not linked; attributing it implicitly");
            meta.implicit_refs.push(figure_id.clone());
        }
    }

    if !lifted.figures.is_empty() {
        log::debug!("Lifted {} figures out of the text flow", lifted.figures.len());
        tree.children.push(IRNode::FigurePool {
            figures: lifted.figures,
        });
    }
    tree
}
