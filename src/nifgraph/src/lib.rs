//! Reading and writing of NetImmerse/Gamebryo (NIF and KF) scene
//! graphs.
//!
//! Files are decoded into a [`NifGraph`], an arena of dynamically typed
//! [`Block`]s that refer to each other through [`Link`]s. The layout of
//! every block is described by a [`Registry`] of block types whose fields
//! are gated on the file version, the user versions and the values of
//! earlier fields. [`types::standard`] provides the common scene graph
//! types.
//!
//! ```no_run
//! use nifgraph::{types, NifGraph};
//!
//! let graph = NifGraph::open("meshes/chair.nif", types::standard())?;
//! for (id, block) in graph.find_blocks(|b| b.type_name() == "NiTriShape") {
//!     println!("{id}: {:?}", block.str("Name"));
//! }
//! graph.save("chair.nif", types::standard())?;
//! # Ok::<(), nifgraph::NifError>(())
//! ```

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod block;
pub use self::block::Block;

pub mod codec;

pub mod condition;
pub use self::condition::{Cmp, Condition};

pub mod config;
pub use self::config::{ReadConfig, ReadFlags, WriteConfig, WriteFlags};

mod error;
pub use self::error::{NifError, Result};

pub mod graph;
pub use self::graph::NifGraph;

pub mod header;
pub use self::header::{ExportInfo, FileInfo, Header, Signature};

mod link;
pub use self::link::{BlockId, Link, LinkKind};

pub mod registry;
pub use self::registry::{Layout, Registry};

pub mod resolve;

pub mod scale;

pub mod schema;
pub use self::schema::{BlockType, FieldDef, FieldType, Len, Primitive, StructDef};

pub mod types;

pub mod value;
pub use self::value::{Fields, Value};

pub mod version;
pub use self::version::{FileVersion, VersionContext};

pub use binrw::Endian;
pub use half::f16;
