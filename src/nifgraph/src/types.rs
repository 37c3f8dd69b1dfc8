//! Definitions of common compounds and block types.
//!
//! This covers the scene graph skeleton that most files from 4.0.0.2
//! through 20.2.0.7 share: nodes, triangle geometry, properties, extra
//! data and skinning. Applications that need further types register them
//! on top of [`register_all`].

use once_cell::sync::OnceCell;

use crate::{
    condition::{Cmp, Condition},
    error::Result,
    registry::Registry,
    schema::{BlockType, FieldDef, FieldType, Len, Primitive::*, StructDef},
    version::FileVersion,
};

/// Values of `Collision Type` in a `BoundingVolume`.
pub mod bound_type {
    pub const SPHERE: i64 = 0;
    pub const BOX: i64 = 1;
    pub const CAPSULE: i64 = 2;
    pub const UNION: i64 = 4;
    pub const HALFSPACE: i64 = 5;
}

/// Bit in `Data Flags` of geometry data that marks stored tangents.
pub const HAS_TANGENTS: u64 = 4096;

fn compound(name: &str) -> FieldType {
    FieldType::compound(name)
}

fn array(elem: impl Into<FieldType>, len: &str) -> FieldType {
    elem.into().array(Len::field(len))
}

fn before(version: FileVersion) -> Condition {
    Condition::Not(Box::new(Condition::Since(version)))
}

fn register_compounds(registry: &mut Registry) -> Result<()> {
    registry.register_struct(
        StructDef::new("Vector3")
            .field("x", F32)
            .field("y", F32)
            .field("z", F32),
    )?;
    registry.register_struct(
        ["m11", "m21", "m31", "m12", "m22", "m32", "m13", "m23", "m33"]
            .into_iter()
            .fold(StructDef::new("Matrix33"), |def, name| def.field(name, F32)),
    )?;
    registry.register_struct(
        StructDef::new("Quaternion")
            .field("w", F32)
            .field("x", F32)
            .field("y", F32)
            .field("z", F32),
    )?;
    registry.register_struct(
        StructDef::new("Color3")
            .field("r", F32)
            .field("g", F32)
            .field("b", F32),
    )?;
    registry.register_struct(
        StructDef::new("Color4")
            .field("r", F32)
            .field("g", F32)
            .field("b", F32)
            .field("a", F32),
    )?;
    registry.register_struct(StructDef::new("TexCoord").field("u", F32).field("v", F32))?;
    registry.register_struct(
        StructDef::new("Triangle")
            .field("v1", U16)
            .field("v2", U16)
            .field("v3", U16),
    )?;
    registry.register_struct(
        StructDef::new("MatchGroup")
            .field("Num Vertices", U16)
            .field("Vertex Indices", array(U16, "Num Vertices")),
    )?;

    // Bounding volumes.
    registry.register_struct(
        StructDef::new("SphereBV")
            .field("Center", compound("Vector3"))
            .field("Radius", F32),
    )?;
    registry.register_struct(
        StructDef::new("BoxBV")
            .field("Center", compound("Vector3"))
            .field("Axis", compound("Vector3").array(Len::Fixed(3)))
            .field("Extent", FieldType::from(F32).array(Len::Fixed(3))),
    )?;
    registry.register_struct(
        StructDef::new("CapsuleBV")
            .field("Center", compound("Vector3"))
            .field("Origin", compound("Vector3"))
            .field("Extent", F32)
            .field("Radius", F32),
    )?;
    registry.register_struct(
        StructDef::new("NiPlane")
            .field("Normal", compound("Vector3"))
            .field("Constant", F32),
    )?;
    registry.register_struct(
        StructDef::new("HalfSpaceBV")
            .field("Plane", compound("NiPlane"))
            .field("Center", compound("Vector3")),
    )?;
    registry.register_struct(
        StructDef::new("UnionBV")
            .field("Num BV", U32)
            .field("Bounding Volumes", array(compound("BoundingVolume"), "Num BV")),
    )?;

    let kind = |value| Condition::field("Collision Type", Cmp::Eq, value);
    registry.register_struct(
        StructDef::new("BoundingVolume")
            .field("Collision Type", U32)
            .push(FieldDef::new("Sphere", compound("SphereBV")).when(kind(bound_type::SPHERE)))
            .push(FieldDef::new("Box", compound("BoxBV")).when(kind(bound_type::BOX)))
            .push(FieldDef::new("Capsule", compound("CapsuleBV")).when(kind(bound_type::CAPSULE)))
            .push(FieldDef::new("Union", compound("UnionBV")).when(kind(bound_type::UNION)))
            .push(
                FieldDef::new("HalfSpace", compound("HalfSpaceBV"))
                    .when(kind(bound_type::HALFSPACE)),
            ),
    )
}

fn register_scene(registry: &mut Registry) -> Result<()> {
    registry.register(
        BlockType::new("NiObjectNET")
            .field("Name", FieldType::String)
            .push(FieldDef::new("Extra Data", FieldType::Ref).until(FileVersion::V4_2_2_0))
            .push(FieldDef::new("Num Extra Data List", U32).since(FileVersion::V10_0_1_0))
            .push(
                FieldDef::new("Extra Data List", array(FieldType::Ref, "Num Extra Data List"))
                    .since(FileVersion::V10_0_1_0),
            )
            .field("Controller", FieldType::Ref),
    )?;

    let bethesda_props = Condition::UserVersion2(Cmp::Le, 34);
    registry.register(
        BlockType::new("NiAVObject")
            .inherits("NiObjectNET")
            .push(FieldDef::new("Flags", U16).when(Condition::UserVersion2(Cmp::Le, 26)))
            .push(FieldDef::new("Flags", U32).when(Condition::UserVersion2(Cmp::Gt, 26)))
            .field("Translation", compound("Vector3"))
            .field("Rotation", compound("Matrix33"))
            .field("Scale", F32)
            .push(FieldDef::new("Velocity", compound("Vector3")).until(FileVersion::V4_2_2_0))
            .push(FieldDef::new("Num Properties", U32).when(bethesda_props.clone()))
            .push(
                FieldDef::new("Properties", array(FieldType::Ref, "Num Properties"))
                    .when(bethesda_props),
            )
            .push(FieldDef::new("Has Bounding Volume", Bool).until(FileVersion::V4_2_2_0))
            .push(
                FieldDef::new("Bounding Volume", compound("BoundingVolume"))
                    .until(FileVersion::V4_2_2_0)
                    .when(Condition::truthy("Has Bounding Volume")),
            )
            .push(FieldDef::new("Collision Object", FieldType::Ref).since(FileVersion::V10_0_1_0)),
    )?;

    registry.register(
        BlockType::new("NiNode")
            .inherits("NiAVObject")
            .field("Num Children", U32)
            .field("Children", array(FieldType::Ref, "Num Children"))
            .push(FieldDef::new("Num Effects", U32).when(Condition::UserVersion2(Cmp::Lt, 130)))
            .push(
                FieldDef::new("Effects", array(FieldType::Ref, "Num Effects"))
                    .when(Condition::UserVersion2(Cmp::Lt, 130)),
            ),
    )?;
    registry.register(BlockType::new("RootCollisionNode").inherits("NiNode"))?;

    registry.register(
        BlockType::new("NiExtraData")
            .push(FieldDef::new("Name", FieldType::String).since(FileVersion::V10_0_1_0))
            .push(FieldDef::new("Next Extra Data", FieldType::Ref).until(FileVersion::V4_2_2_0)),
    )?;
    registry.register(
        BlockType::new("NiStringExtraData")
            .inherits("NiExtraData")
            .push(FieldDef::new("Bytes Remaining", U32).until(FileVersion::V4_2_2_0))
            .field("String Data", FieldType::String),
    )?;
    registry.register(
        BlockType::new("NiIntegerExtraData")
            .inherits("NiExtraData")
            .field("Integer Data", U32),
    )?;

    registry.register(BlockType::new("NiProperty").inherits("NiObjectNET"))?;
    registry.register(
        BlockType::new("NiMaterialProperty")
            .inherits("NiProperty")
            .push(
                FieldDef::new("Flags", U16)
                    .since(FileVersion(3, 0, 0, 0))
                    .until(FileVersion::V10_0_1_2),
            )
            .field("Ambient Color", compound("Color3"))
            .field("Diffuse Color", compound("Color3"))
            .field("Specular Color", compound("Color3"))
            .field("Emissive Color", compound("Color3"))
            .field("Glossiness", F32)
            .field("Alpha", F32)
            .push(
                FieldDef::new("Emissive Mult", F32)
                    .since(FileVersion::V20_2_0_7)
                    .when(Condition::UserVersion2(Cmp::Gt, 21)),
            ),
    )?;
    registry.register(
        BlockType::new("NiAlphaProperty")
            .inherits("NiProperty")
            .field("Flags", U16)
            .field("Threshold", U8),
    )?;

    registry.register(
        BlockType::new("NiTimeController")
            .field("Next Controller", FieldType::Ref)
            .field("Flags", U16)
            .field("Frequency", F32)
            .field("Phase", F32)
            .field("Start Time", F32)
            .field("Stop Time", F32)
            .field("Target", FieldType::Ptr),
    )
}

fn register_geometry(registry: &mut Registry) -> Result<()> {
    let shader_range = |def: FieldDef| {
        def.since(FileVersion::V10_0_1_0)
            .until(FileVersion(20, 1, 0, 3))
    };

    registry.register(
        BlockType::new("NiGeometry")
            .inherits("NiAVObject")
            .field("Data", FieldType::Ref)
            .field("Skin Instance", FieldType::Ref)
            .push(shader_range(FieldDef::new("Has Shader", Bool)))
            .push(shader_range(
                FieldDef::new("Shader Name", FieldType::String)
                    .when(Condition::truthy("Has Shader")),
            ))
            .push(shader_range(
                FieldDef::new("Shader Extra Data", I32).when(Condition::truthy("Has Shader")),
            ))
            .push(FieldDef::new("Num Materials", U32).since(FileVersion::V20_2_0_5))
            .push(
                FieldDef::new("Material Name", array(FieldType::String, "Num Materials"))
                    .since(FileVersion::V20_2_0_5),
            )
            .push(
                FieldDef::new("Material Extra Data", array(I32, "Num Materials"))
                    .since(FileVersion::V20_2_0_5),
            )
            .push(FieldDef::new("Active Material", I32).since(FileVersion::V20_2_0_5))
            .push(
                FieldDef::new("Material Needs Update", Bool)
                    .since(FileVersion::V20_2_0_7)
                    .until(FileVersion::V20_2_0_7),
            ),
    )?;
    registry.register(BlockType::new("NiTriBasedGeom").inherits("NiGeometry"))?;
    registry.register(BlockType::new("NiTriShape").inherits("NiTriBasedGeom"))?;

    let per_vertex = |elem: &str| array(compound(elem), "Num Vertices");
    let tangents =
        Condition::truthy("Has Normals").and(Condition::bits("Data Flags", HAS_TANGENTS));
    registry.register(
        BlockType::new("NiGeometryData")
            .push(FieldDef::new("Group ID", I32).since(FileVersion(10, 1, 0, 114)))
            .field("Num Vertices", U16)
            .push(FieldDef::new("Keep Flags", U8).since(FileVersion(10, 1, 0, 0)))
            .push(FieldDef::new("Compress Flags", U8).since(FileVersion(10, 1, 0, 0)))
            .field("Has Vertices", Bool)
            .push(
                FieldDef::new("Vertices", per_vertex("Vector3"))
                    .when(Condition::truthy("Has Vertices")),
            )
            .push(FieldDef::new("Data Flags", U16).since(FileVersion::V10_0_1_0))
            .field("Has Normals", Bool)
            .push(
                FieldDef::new("Normals", per_vertex("Vector3"))
                    .when(Condition::truthy("Has Normals")),
            )
            .push(
                FieldDef::new("Tangents", per_vertex("Vector3"))
                    .since(FileVersion(10, 1, 0, 0))
                    .when(tangents.clone()),
            )
            .push(
                FieldDef::new("Bitangents", per_vertex("Vector3"))
                    .since(FileVersion(10, 1, 0, 0))
                    .when(tangents),
            )
            .field("Center", compound("Vector3"))
            .field("Radius", F32)
            .field("Has Vertex Colors", Bool)
            .push(
                FieldDef::new("Vertex Colors", per_vertex("Color4"))
                    .when(Condition::truthy("Has Vertex Colors")),
            )
            .push(FieldDef::new("Num UV Sets", U16).when(before(FileVersion::V10_0_1_0)))
            .push(FieldDef::new("Has UV", Bool).until(FileVersion::V4_0_0_2))
            .push(
                FieldDef::new("UV Sets", per_vertex("TexCoord").array(Len::field("Num UV Sets")))
                    .when(before(FileVersion::V10_0_1_0)),
            )
            .push(
                FieldDef::new(
                    "UV Sets",
                    per_vertex("TexCoord").array(Len::Masked("Data Flags".into(), 63)),
                )
                    .since(FileVersion::V10_0_1_0),
            )
            .push(FieldDef::new("Consistency Flags", U16).since(FileVersion::V10_0_1_0))
            .push(FieldDef::new("Additional Data", FieldType::Ref).since(FileVersion(20, 0, 0, 4))),
    )?;
    registry.register(
        BlockType::new("NiTriBasedGeomData")
            .inherits("NiGeometryData")
            .field("Num Triangles", U16),
    )?;
    registry.register(
        BlockType::new("NiTriShapeData")
            .inherits("NiTriBasedGeomData")
            .field("Num Triangle Points", U32)
            .push(FieldDef::new("Has Triangles", Bool).since(FileVersion(10, 0, 1, 3)))
            .push(
                FieldDef::new("Triangles", array(compound("Triangle"), "Num Triangles"))
                    .until(FileVersion::V10_0_1_2),
            )
            .push(
                FieldDef::new("Triangles", array(compound("Triangle"), "Num Triangles"))
                    .since(FileVersion(10, 0, 1, 3))
                    .when(Condition::truthy("Has Triangles")),
            )
            .field("Num Match Groups", U16)
            .field("Match Groups", array(compound("MatchGroup"), "Num Match Groups")),
    )?;

    registry.register(
        BlockType::new("NiSkinInstance")
            .field("Data", FieldType::Ref)
            .push(FieldDef::new("Skin Partition", FieldType::Ref).since(FileVersion(10, 1, 0, 101)))
            .field("Skeleton Root", FieldType::Ptr)
            .field("Num Bones", U32)
            .field("Bones", array(FieldType::Ptr, "Num Bones")),
    )
}

/// Registers all compounds and block types of this module.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    register_compounds(registry)?;
    register_scene(registry)?;
    register_geometry(registry)
}

/// Gets a shared registry with all types of this module.
pub fn standard() -> &'static Registry {
    static STANDARD: OnceCell<Registry> = OnceCell::new();

    STANDARD.get_or_init(|| {
        let mut registry = Registry::new();
        register_all(&mut registry).expect("standard type definitions are consistent");
        registry
    })
}
