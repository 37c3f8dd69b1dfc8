mod common;

use common::{chain, leaf, link_child, name_of, node, registry, MODERN};
use nifgraph::{
    header::has_export_info, BlockId, Endian, ExportInfo, FileInfo, FileVersion, Link, NifGraph,
    Value,
};

#[test]
fn read_write_is_idempotent() {
    let registry = registry();
    for version in [
        FileVersion::V4_0_0_2,
        FileVersion::V10_0_1_0,
        FileVersion(20, 0, 0, 5),
        MODERN,
    ] {
        let graph = chain(version);

        let data = graph.write(&registry).unwrap();
        let decoded = NifGraph::read(&data, &registry).unwrap();
        assert_eq!(decoded, graph, "version {version}");

        let again = decoded.write(&registry).unwrap();
        assert_eq!(again, data, "version {version}");
    }
}

#[test]
fn output_is_deterministic() {
    let registry = registry();
    let graph = chain(MODERN);

    let first = graph.write(&registry).unwrap();
    let second = graph.clone().write(&registry).unwrap();
    assert_eq!(first, second);
}

#[test]
fn leaf_node_scenario() {
    let registry = registry();

    // root -> A -> B -> A, with C not linked from anywhere.
    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let c = graph.add_block(leaf("C", 3));
    let b = graph.add_block(node("B", Link::Null, Link::Null));
    let a = graph.add_block(node("A", b, Link::Null));
    let root = graph.add_block(node("root", a, Link::Null));
    link_child(&mut graph, b, a);
    graph.add_root(root);
    assert_eq!(graph.len(), 4);
    assert!(graph.block(c).is_some());

    let data = graph.write(&registry).unwrap();
    let decoded = NifGraph::read(&data, &registry).unwrap();

    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded.roots().len(), 1);

    let root = decoded.block(decoded.roots()[0]).unwrap();
    assert_eq!(root.str("Name"), Some("root"));
    assert_eq!(name_of(&decoded, root.link("Child")).as_deref(), Some("A"));

    let a_id = root.link("Child").and_then(Link::block).unwrap();
    let a = decoded.block(a_id).unwrap();
    let b = decoded.get(a.link("Child").unwrap()).unwrap();
    assert_eq!(b.str("Name"), Some("B"));
    assert_eq!(b.link("Child"), Some(Link::Block(a_id)));

    assert!(decoded.find_blocks(|b| b.str("Name") == Some("C")).next().is_none());
}

#[test]
fn blocks_are_numbered_depth_first() {
    let registry = registry();

    // Built in reverse so arena order differs from file order.
    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let leaf2 = graph.add_block(leaf("second", 2));
    let leaf1 = graph.add_block(leaf("first", 1));
    let inner = graph.add_block(node("inner", leaf1, Link::Null));
    let outer = graph.add_block(node("outer", inner, Link::Null));
    graph.add_root(outer);
    graph.add_root(leaf2);

    let order = nifgraph::resolve::assign_indices(&graph);
    assert_eq!(order, vec![outer, inner, leaf1, leaf2]);

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    let names: Vec<_> = decoded
        .all_blocks()
        .map(|(_, b)| b.str("Name").unwrap().to_string())
        .collect();
    assert_eq!(names, ["outer", "inner", "first", "second"]);
    assert_eq!(decoded.roots(), &[BlockId(0), BlockId(3)]);
}

#[test]
fn orphans_are_pruned() {
    let registry = registry();

    let mut graph = chain(MODERN);
    graph.add_block(leaf("orphan", 1));
    graph.add_block(leaf("another orphan", 2));

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded, chain(MODERN));
}

#[test]
fn pointers_do_not_keep_blocks_alive() {
    let registry = registry();

    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let hidden = graph.add_block(leaf("hidden", 9));
    let root = graph.add_block(node("root", Link::Null, hidden));
    graph.add_root(root);

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded.len(), 1);

    let root = decoded.block(decoded.roots()[0]).unwrap();
    assert_eq!(root.link("Parent"), Some(Link::Null));
}

#[test]
fn cycles_terminate() {
    let registry = registry();

    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let a = graph.add_block(node("a", Link::Null, Link::Null));
    let b = graph.add_block(node("b", a, a));
    link_child(&mut graph, a, b);
    graph
        .block_mut(a)
        .unwrap()
        .set("Parent", Value::Ptr(Link::Block(b)));
    graph.add_root(a);
    graph.add_root(b);

    assert_eq!(graph.walk().count(), 2);

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded, graph);
}

#[test]
fn rewrite_all_visits_every_block_once() {
    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let orphan = graph.add_block(leaf("orphan", 0));
    let a = graph.add_block(node("a", Link::Null, Link::Null));
    let b = graph.add_block(node("b", a, Link::Null));
    let only_pointed = graph.add_block(leaf("pointed", 0));
    link_child(&mut graph, a, b);
    graph
        .block_mut(b)
        .unwrap()
        .set("Parent", Value::Ptr(Link::Block(only_pointed)));
    graph.add_root(a);

    let mut visited = Vec::new();
    graph.rewrite_all(|id, block| {
        visited.push(id);

        // Rewiring links while visiting does not change the order.
        if let Some(Value::Ref(link)) = block.get_mut("Child") {
            *link = Link::Null;
        }
    });

    assert_eq!(visited, vec![a, b, only_pointed, orphan]);
    assert_eq!(graph.walk().count(), 1);
}

#[test]
fn strings_are_deduplicated() {
    let registry = registry();

    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let l2 = graph.add_block(leaf("shared", 2));
    let l1 = graph.add_block(leaf("shared", 1));
    let n = graph.add_block(node("", l1, Link::Null));
    let root = graph.add_block(node("root", n, Link::Null));
    graph.add_root(root);
    graph.add_root(l2);

    let data = graph.write(&registry).unwrap();

    let mut reader = nifgraph::codec::NifReader::new(&data);
    let header = nifgraph::Header::parse(&mut reader, &registry).unwrap();
    assert_eq!(header.strings, ["root", "shared"]);
    assert_eq!(header.max_string_length, 6);
    assert_eq!(header.block_types, ["Node", "Leaf"]);
    assert_eq!(header.block_type_index, [0, 0, 1, 1]);

    let decoded = NifGraph::read(&data, &registry).unwrap();
    let empty = decoded.block(BlockId(1)).unwrap();
    assert_eq!(empty.str("Name"), Some(""));
}

#[test]
fn big_endian_round_trip() {
    let registry = registry();

    let mut graph = chain(MODERN);
    graph.info_mut().endian = Endian::Big;

    let data = graph.write(&registry).unwrap();
    let decoded = NifGraph::read(&data, &registry).unwrap();
    assert_eq!(decoded.info().endian, Endian::Big);
    assert_eq!(decoded, graph);

    // Everything after the version follows the file's byte order.
    let little = chain(MODERN).write(&registry).unwrap();
    assert_eq!(data.len(), little.len());
    assert_ne!(data, little);
}

#[test]
fn big_endian_requires_endian_flag() {
    let registry = registry();

    let mut graph = chain(FileVersion::V10_0_1_0);
    graph.info_mut().endian = Endian::Big;

    let err = graph.write(&registry).unwrap_err();
    assert!(matches!(err.root(), nifgraph::NifError::Encoding { .. }));
}

#[test]
fn export_info_round_trip() {
    let registry = registry();

    let mut graph = chain(MODERN);
    let info = graph.info_mut();
    info.user_version = 11;
    info.user_version_2 = 130;
    info.export_info.author = "someone".into();
    info.export_info.process_script = "process".into();
    info.export_info.export_script = "export".into();
    info.export_info.max_filepath = "C:\\meshes".into();
    info.groups = vec![1, 2];

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded.info(), graph.info());
}

#[test]
fn export_info_follows_user_version() {
    assert!(has_export_info(FileVersion::V10_0_1_2, 10));
    assert!(has_export_info(MODERN, 1));
    assert!(!has_export_info(MODERN, 0));
    assert!(!has_export_info(FileVersion::V10_0_1_0, 11));
    assert!(has_export_info(FileVersion::V10_2_0_0, 11));
    assert!(!has_export_info(FileVersion::V10_2_0_0, 1));

    let registry = registry();

    let mut graph = chain(FileVersion::V10_2_0_0);
    let info = graph.info_mut();
    info.user_version = 1;
    info.export_info.author = "not stored".into();

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded.info().user_version, 1);
    assert_eq!(decoded.info().export_info, ExportInfo::default());
}

#[test]
fn latin1_text_round_trips() {
    let registry = registry();

    let mut graph = NifGraph::new(FileInfo::new(MODERN));
    let root = graph.add_block(leaf("Schöne Grüße", 1));
    graph.add_root(root);

    let decoded = NifGraph::read(&graph.write(&registry).unwrap(), &registry).unwrap();
    assert_eq!(decoded.block(root).unwrap().str("Name"), Some("Schöne Grüße"));
}
