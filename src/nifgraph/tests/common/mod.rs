#![allow(dead_code)]

use nifgraph::{
    Block, BlockId, BlockType, FieldType, FileInfo, FileVersion, Link, NifGraph, Primitive,
    Registry, Value,
};

/// A file version with a string table, block sizes and an endian flag.
pub const MODERN: FileVersion = FileVersion::V20_2_0_7;

/// A minimal schema with one leaf and one interior node type.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            BlockType::new("Leaf")
                .field("Name", FieldType::String)
                .field("Value", Primitive::U32),
        )
        .unwrap();
    registry
        .register(
            BlockType::new("Node")
                .field("Name", FieldType::String)
                .field("Child", FieldType::Ref)
                .field("Parent", FieldType::Ptr),
        )
        .unwrap();
    registry
}

pub fn leaf(name: &str, value: u32) -> Block {
    Block::new("Leaf")
        .with("Name", Value::String(name.into()))
        .with("Value", Value::U32(value))
}

pub fn node(name: &str, child: impl Into<Link>, parent: impl Into<Link>) -> Block {
    Block::new("Node")
        .with("Name", Value::String(name.into()))
        .with("Child", Value::Ref(child.into()))
        .with("Parent", Value::Ptr(parent.into()))
}

/// Points the `Child` field of `id` to `target`.
pub fn link_child(graph: &mut NifGraph, id: BlockId, target: BlockId) {
    graph
        .block_mut(id)
        .unwrap()
        .set("Child", Value::Ref(Link::Block(target)));
}

/// Builds `root -> a -> b` with `b` pointing back up to `a`, in the order
/// the blocks are written.
pub fn chain(version: FileVersion) -> NifGraph {
    let mut graph = NifGraph::new(FileInfo::new(version));
    let root = graph.add_block(node("root", Link::Null, Link::Null));
    let a = graph.add_block(node("a", Link::Null, Link::Null));
    let b = graph.add_block(leaf("b", 7));

    link_child(&mut graph, root, a);
    link_child(&mut graph, a, b);
    graph.add_root(root);
    graph
}

/// Gets the name of the block a link points to.
pub fn name_of(graph: &NifGraph, link: Option<Link>) -> Option<String> {
    graph
        .get(link?)
        .and_then(|b| b.str("Name"))
        .map(str::to_string)
}
