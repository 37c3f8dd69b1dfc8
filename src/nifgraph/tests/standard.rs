use glam::Vec3;
use nifgraph::{
    scale::apply_scale, types, Block, BlockId, FileInfo, FileVersion, Link, NifGraph, Registry,
    Value, VersionContext,
};

const VERSIONS: [FileVersion; 4] = [
    FileVersion::V4_0_0_2,
    FileVersion::V10_0_1_0,
    FileVersion(20, 0, 0, 5),
    FileVersion::V20_2_0_7,
];

fn round_trip(graph: &NifGraph) -> NifGraph {
    let registry = types::standard();
    let data = graph.write(registry).unwrap();
    NifGraph::read(&data, registry).unwrap()
}

fn make(registry: &Registry, name: &str, version: FileVersion) -> Block {
    registry
        .instantiate_default(name, &VersionContext::new(version))
        .unwrap()
}

fn triangle(v1: u16, v2: u16, v3: u16) -> Value {
    let mut fields = nifgraph::Fields::default();
    fields.insert("v1".into(), Value::U16(v1));
    fields.insert("v2".into(), Value::U16(v2));
    fields.insert("v3".into(), Value::U16(v3));
    Value::Struct(fields)
}

fn vec3s(points: &[Vec3]) -> Value {
    Value::Array(points.iter().copied().map(Value::from_vec3).collect())
}

const CORNERS: [Vec3; 3] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
];

// A node holding one triangle, with blocks added in the order they are
// written.
fn mesh(version: FileVersion) -> NifGraph {
    let registry = types::standard();
    let mut graph = NifGraph::new(FileInfo::new(version));

    let (root, shape, data) = (BlockId(0), BlockId(1), BlockId(2));

    let mut node = make(registry, "NiNode", version);
    node.set("Name", Value::String("Scene Root".into()));
    node.set("Num Children", Value::U32(1));
    node.set("Children", Value::Array(vec![Value::Ref(shape.into())]));
    assert_eq!(graph.add_block(node), root);

    let mut tri_shape = make(registry, "NiTriShape", version);
    tri_shape.set("Name", Value::String("Chair".into()));
    tri_shape.set("Translation", Value::from_vec3(Vec3::new(1.0, 2.0, 3.0)));
    tri_shape.set("Data", Value::Ref(data.into()));
    assert_eq!(graph.add_block(tri_shape), shape);

    let mut tri_data = make(registry, "NiTriShapeData", version);
    tri_data.set("Num Vertices", Value::U16(3));
    tri_data.set("Has Vertices", Value::Bool(true));
    tri_data.set("Vertices", vec3s(&CORNERS));
    tri_data.set("Center", Value::from_vec3(Vec3::new(0.5, 0.5, 0.0)));
    tri_data.set("Radius", Value::F32(0.75));
    tri_data.set("Num Triangles", Value::U16(1));
    tri_data.set("Num Triangle Points", Value::U32(3));
    if let Some(has_triangles) = tri_data.get_mut("Has Triangles") {
        *has_triangles = Value::Bool(true);
    }
    tri_data.set("Triangles", Value::Array(vec![triangle(0, 1, 2)]));
    assert_eq!(graph.add_block(tri_data), data);

    graph.add_root(root);
    graph
}

#[test]
fn standard_registry_covers_all_versions() {
    let registry = types::standard();
    for version in VERSIONS {
        assert!(registry.supports(version));
    }

    assert!(registry.is_a("NiTriShape", "NiAVObject"));
    assert!(registry.is_a("RootCollisionNode", "NiNode"));
    assert!(!registry.is_a("NiTriShapeData", "NiAVObject"));
}

#[test]
fn default_nodes_round_trip() {
    let registry = types::standard();
    for version in VERSIONS {
        let mut graph = NifGraph::new(FileInfo::new(version));
        let root = graph.add_block(make(registry, "NiNode", version));
        graph.add_root(root);

        assert_eq!(round_trip(&graph), graph, "version {version}");
    }
}

#[test]
fn node_flags_follow_user_version() {
    let registry = types::standard();

    let info = FileInfo::new(FileVersion::V20_2_0_7).with_user_versions(11, 34);
    let node = registry
        .instantiate_default("NiNode", &info.context())
        .unwrap();
    assert_eq!(node.get("Flags"), Some(&Value::U32(0)));
    assert!(node.get("Num Properties").is_some());

    let mut graph = NifGraph::new(info);
    let root = graph.add_block(node);
    graph.add_root(root);
    assert_eq!(round_trip(&graph), graph);

    let fallout = VersionContext::new(FileVersion::V20_2_0_7)
        .with_user_version(12)
        .with_user_version_2(130);
    let node = registry.instantiate_default("NiNode", &fallout).unwrap();
    assert!(node.get("Num Properties").is_none());
    assert!(node.get("Effects").is_none());
}

#[test]
fn meshes_round_trip() {
    for version in VERSIONS {
        let graph = mesh(version);
        let decoded = round_trip(&graph);
        assert_eq!(decoded, graph, "version {version}");

        let shape = decoded.block(BlockId(1)).unwrap();
        let data = decoded.get(shape.link("Data").unwrap()).unwrap();
        let vertices = data.get("Vertices").and_then(Value::as_array).unwrap();
        assert_eq!(vertices[1].as_vec3(), Some(CORNERS[1]));
    }
}

#[test]
fn tangents_and_uv_sets_follow_data_flags() {
    let version = FileVersion::V20_2_0_7;
    let mut graph = mesh(version);

    let uv = |u: f32, v: f32| {
        let mut fields = nifgraph::Fields::default();
        fields.insert("u".into(), Value::F32(u));
        fields.insert("v".into(), Value::F32(v));
        Value::Struct(fields)
    };

    let data = graph.block_mut(BlockId(2)).unwrap();
    data.set("Data Flags", Value::U16(types::HAS_TANGENTS as u16 | 1));
    data.set("Has Normals", Value::Bool(true));
    data.set("Normals", vec3s(&[Vec3::Z; 3]));
    data.set("Tangents", vec3s(&[Vec3::X; 3]));
    data.set("Bitangents", vec3s(&[Vec3::Y; 3]));
    data.set(
        "UV Sets",
        Value::Array(vec![Value::Array(vec![uv(0.0, 0.0), uv(1.0, 0.0), uv(0.0, 1.0)])]),
    );

    assert_eq!(round_trip(&graph), graph);
}

#[test]
fn old_files_store_bounding_volumes() {
    let version = FileVersion::V4_0_0_2;
    let mut graph = mesh(version);

    let mut sphere = nifgraph::Fields::default();
    sphere.insert("Center".into(), Value::from_vec3(Vec3::new(0.0, 0.0, 1.0)));
    sphere.insert("Radius".into(), Value::F32(2.0));

    let mut volume = nifgraph::Fields::default();
    volume.insert(
        "Collision Type".into(),
        Value::U32(types::bound_type::SPHERE as u32),
    );
    volume.insert("Sphere".into(), Value::Struct(sphere));

    let root = graph.block_mut(BlockId(0)).unwrap();
    root.set("Has Bounding Volume", Value::Bool(true));
    root.set("Bounding Volume", Value::Struct(volume));

    let decoded = round_trip(&graph);
    assert_eq!(decoded, graph);

    let volume = decoded
        .block(BlockId(0))
        .and_then(|b| b.get("Bounding Volume"))
        .and_then(Value::as_struct)
        .unwrap();
    assert!(volume.get("Box").is_none());
}

#[test]
fn finds_geometry_under_a_node() {
    let registry = types::standard();
    let graph = mesh(FileVersion::V20_2_0_7);

    let found: Vec<_> = graph
        .find_under(BlockId(0), |b| registry.is_a(b.type_name(), "NiGeometry"))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(found, [BlockId(1)]);

    let named: Vec<_> = graph
        .find_blocks(|b| b.str("Name") == Some("Chair"))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(named, [BlockId(1)]);

    assert_eq!(graph.find_under(BlockId(2), |_| true).count(), 1);
}

#[test]
fn scales_positions() {
    let mut graph = mesh(FileVersion::V20_2_0_7);

    // Two translations, three vertices, one center and one radius.
    assert_eq!(apply_scale(&mut graph, 2.0), 7);

    let shape = graph.block(BlockId(1)).unwrap();
    assert_eq!(
        shape.get("Translation").and_then(Value::as_vec3),
        Some(Vec3::new(2.0, 4.0, 6.0))
    );

    let data = graph.block(BlockId(2)).unwrap();
    let vertices = data.get("Vertices").and_then(Value::as_array).unwrap();
    assert_eq!(vertices[1].as_vec3(), Some(Vec3::new(2.0, 0.0, 0.0)));
    assert_eq!(data.get("Radius"), Some(&Value::F32(1.5)));

    // Scaling keeps the graph encodable.
    assert_eq!(round_trip(&graph), graph);
}

#[test]
fn scales_nested_bounding_volumes() {
    let mut graph = NifGraph::new(FileInfo::new(FileVersion::V4_0_0_2));

    let mut sphere = nifgraph::Fields::default();
    sphere.insert("Center".into(), Value::from_vec3(Vec3::ONE));
    sphere.insert("Radius".into(), Value::F32(0.5));

    let mut volume = nifgraph::Fields::default();
    volume.insert("Collision Type".into(), Value::U32(0));
    volume.insert("Sphere".into(), Value::Struct(sphere));

    let mut node = make(types::standard(), "NiNode", FileVersion::V4_0_0_2);
    node.set("Has Bounding Volume", Value::Bool(true));
    node.set("Bounding Volume", Value::Struct(volume));
    let root = graph.add_block(node);
    graph.add_root(root);

    // Translation, sphere center and sphere radius.
    assert_eq!(apply_scale(&mut graph, 10.0), 3);

    let sphere = graph
        .block(root)
        .and_then(|b| b.get("Bounding Volume"))
        .and_then(Value::as_struct)
        .and_then(|v| v.get("Sphere"))
        .and_then(Value::as_struct)
        .unwrap();
    assert_eq!(sphere.get("Center").and_then(Value::as_vec3), Some(Vec3::splat(10.0)));
    assert_eq!(sphere.get("Radius"), Some(&Value::F32(5.0)));
}

#[test]
fn skin_pointers_to_pruned_bones_become_null() {
    let registry = types::standard();
    let version = FileVersion::V20_2_0_7;
    let mut graph = mesh(version);

    let bone = graph.add_block(make(registry, "NiNode", version));
    let mut skin = make(registry, "NiSkinInstance", version);
    skin.set("Skeleton Root", Value::Ptr(BlockId(0).into()));
    skin.set("Num Bones", Value::U32(2));
    skin.set(
        "Bones",
        Value::Array(vec![Value::Ptr(BlockId(0).into()), Value::Ptr(bone.into())]),
    );
    let skin = graph.add_block(skin);
    graph
        .block_mut(BlockId(1))
        .unwrap()
        .set("Skin Instance", Value::Ref(skin.into()));

    let decoded = round_trip(&graph);
    assert_eq!(decoded.len(), 4);

    let skin = decoded
        .find_blocks(|b| b.type_name() == "NiSkinInstance")
        .map(|(_, b)| b)
        .next()
        .unwrap();
    assert_eq!(skin.link("Skeleton Root"), Some(Link::Block(BlockId(0))));
    assert_eq!(
        skin.get("Bones"),
        Some(&Value::Array(vec![
            Value::Ptr(Link::Block(BlockId(0))),
            Value::Ptr(Link::Null),
        ]))
    );
}

#[test]
fn save_and_open() -> anyhow::Result<()> {
    let registry = types::standard();
    let graph = mesh(FileVersion::V20_2_0_7);

    let path = std::path::Path::new(env!("CARGO_TARGET_TMPDIR")).join("save-and-open.nif");
    graph.save(&path, registry)?;

    let opened = NifGraph::open(&path, registry)?;
    std::fs::remove_file(&path)?;
    assert_eq!(opened, graph);

    let mut buffer = Vec::new();
    graph.write_to(&mut buffer, registry)?;
    assert_eq!(buffer, graph.write(registry)?);

    Ok(())
}

#[test]
fn missing_files_are_io_errors() {
    let path = std::path::Path::new(env!("CARGO_TARGET_TMPDIR")).join("does-not-exist.nif");
    let err = NifGraph::open(path, types::standard()).unwrap_err();
    assert!(matches!(err, nifgraph::NifError::Io(_)));
}

#[test]
fn display_lists_blocks() {
    let graph = mesh(FileVersion::V20_2_0_7);
    let text = graph.to_string();

    assert!(text.contains("Gamebryo File Format, Version 20.2.0.7"));
    assert!(text.contains("NiNode"));
    assert!(text.contains("NiTriShapeData"));
}
