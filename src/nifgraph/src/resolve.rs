//! Conversion between on-disk block indices and arena handles.

use crate::{
    block::Block,
    error::{NifError, Result},
    graph::NifGraph,
    link::{BlockId, Link},
};

fn resolve_index(index: i32, count: usize) -> Option<BlockId> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .map(|i| BlockId(i as u32))
}

/// Rewrites every unresolved link in `blocks` into a handle and resolves
/// the raw root indices.
///
/// Null roots are dropped. Indices outside of `blocks` fail with
/// [`NifError::DanglingLink`].
pub fn resolve_all(blocks: &mut [Block], roots: &[i32]) -> Result<Vec<BlockId>> {
    let count = blocks.len();

    for (i, block) in blocks.iter_mut().enumerate() {
        let mut dangling = None;
        block.visit_links_mut(|field, _, link| {
            if let Link::Unresolved(index) = *link {
                match resolve_index(index, count) {
                    Some(id) => *link = Link::Block(id),
                    None => {
                        dangling.get_or_insert((field.to_string(), index));
                    }
                }
            }
        });

        if let Some((field, index)) = dangling {
            return Err(NifError::DanglingLink {
                block: Some(i),
                field,
                index,
                count,
            });
        }
    }

    roots
        .iter()
        .filter(|&&index| index != Link::NULL_INDEX)
        .map(|&index| {
            resolve_index(index, count).ok_or_else(|| NifError::DanglingLink {
                block: None,
                field: "roots".to_string(),
                index,
                count,
            })
        })
        .collect()
}

/// Numbers the blocks that are reachable from the roots of `graph`.
///
/// Blocks are visited depth-first in pre-order, starting from the roots
/// in order and following strong references in field order. The
/// position of a handle in the result is the index of the block in a
/// written file. Blocks that are only reachable through pointers are
/// left out.
pub fn assign_indices(graph: &NifGraph) -> Vec<BlockId> {
    graph.walk().map(|(id, _)| id).collect()
}
