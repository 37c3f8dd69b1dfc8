//! The in-memory scene graph and its file codec.

use std::{
    collections::HashSet,
    fmt, fs,
    io::{self, BufWriter, Write},
    path::Path,
};

use ahash::RandomState;

use crate::{
    block::Block,
    config::{ReadConfig, WriteConfig},
    error::Result,
    header::FileInfo,
    link::{BlockId, Link, LinkKind},
    registry::Registry,
    version::VersionContext,
};

mod read;
pub use read::read;

mod write;
pub use write::write;

/// A lazy depth-first traversal over the blocks of a [`NifGraph`].
///
/// Every block is yielded at most once, so cyclic graphs are safe to
/// walk. Links to handles outside of the graph are skipped.
#[derive(Clone, Debug)]
pub struct Walk<'g> {
    blocks: &'g [Block],
    stack: Vec<BlockId>,
    visited: HashSet<BlockId, RandomState>,
    follow_ptrs: bool,
}

impl<'g> Walk<'g> {
    fn new(blocks: &'g [Block], start: &[BlockId], follow_ptrs: bool) -> Self {
        Self {
            blocks,
            stack: start.iter().rev().copied().collect(),
            visited: HashSet::default(),
            follow_ptrs,
        }
    }

    fn is_visited(&self, id: BlockId) -> bool {
        self.visited.contains(&id)
    }
}

impl<'g> Iterator for Walk<'g> {
    type Item = (BlockId, &'g Block);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            let block = match self.blocks.get(id.index()) {
                Some(block) => block,
                None => continue,
            };
            if !self.visited.insert(id) {
                continue;
            }

            // Children go on the stack in reverse so the first link is
            // visited first.
            let start = self.stack.len();
            let follow_ptrs = self.follow_ptrs;
            let stack = &mut self.stack;
            block.visit_links(|kind, link| {
                if kind == LinkKind::Ref || follow_ptrs {
                    stack.extend(link.block());
                }
            });
            self.stack[start..].reverse();

            return Some((id, block));
        }
    }
}

/// A NIF scene graph: the file information, an arena of blocks and the
/// list of root blocks.
///
/// Blocks refer to each other through [`Link`]s holding [`BlockId`]
/// handles into the arena, which may be shared and cyclic. Only blocks
/// reachable from the roots are written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NifGraph {
    info: FileInfo,
    blocks: Vec<Block>,
    roots: Vec<BlockId>,
}

impl NifGraph {
    /// Creates an empty graph.
    pub fn new(info: FileInfo) -> Self {
        Self {
            info,
            blocks: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub(crate) fn from_parts(info: FileInfo, blocks: Vec<Block>, roots: Vec<BlockId>) -> Self {
        Self {
            info,
            blocks,
            roots,
        }
    }

    /// Gets the file information.
    #[inline]
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    /// Gets the file information mutably, e.g. to change the version a
    /// graph is written as.
    #[inline]
    pub fn info_mut(&mut self) -> &mut FileInfo {
        &mut self.info
    }

    /// Gets the version numbers that decide the layout of blocks.
    #[inline]
    pub fn context(&self) -> VersionContext {
        self.info.context()
    }

    /// Moves a block into the graph and returns its handle.
    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())
    }

    /// Follows a link to its target block.
    ///
    /// Returns [`None`] for null and unresolved links.
    pub fn get(&self, link: Link) -> Option<&Block> {
        link.block().and_then(|id| self.block(id))
    }

    /// Gets the number of blocks in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over all blocks in arena order, including unreachable
    /// ones.
    pub fn all_blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (BlockId(i as u32), block))
    }

    /// Gets the root blocks in order.
    #[inline]
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    /// Appends a block to the list of roots.
    pub fn add_root(&mut self, id: BlockId) {
        self.roots.push(id);
    }

    /// Lazily finds all blocks in arena order that satisfy `pred`.
    pub fn find_blocks<'g, P>(&'g self, mut pred: P) -> impl Iterator<Item = (BlockId, &'g Block)>
    where
        P: FnMut(&Block) -> bool + 'g,
    {
        self.all_blocks().filter(move |(_, block)| pred(block))
    }

    /// Lazily finds all blocks in the subtree under `start`, including
    /// `start` itself, that satisfy `pred`.
    ///
    /// The subtree is walked depth-first over strong references.
    pub fn find_under<'g, P>(
        &'g self,
        start: BlockId,
        mut pred: P,
    ) -> impl Iterator<Item = (BlockId, &'g Block)>
    where
        P: FnMut(&Block) -> bool + 'g,
    {
        Walk::new(&self.blocks, &[start], false).filter(move |(_, block)| pred(block))
    }

    /// Walks the blocks reachable from the roots over strong references,
    /// in the order they are written.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.blocks, &self.roots, false)
    }

    /// Calls `visitor` exactly once for every block in the arena.
    ///
    /// Blocks reachable from the roots over any kind of link come first,
    /// in depth-first order, followed by the unreachable ones in arena
    /// order. The order is fixed before the first call, so the visitor
    /// may freely rewrite links.
    pub fn rewrite_all<F>(&mut self, mut visitor: F)
    where
        F: FnMut(BlockId, &mut Block),
    {
        let mut walk = Walk::new(&self.blocks, &self.roots, true);
        let mut order: Vec<_> = walk.by_ref().map(|(id, _)| id).collect();
        order.extend(
            (0..self.blocks.len() as u32)
                .map(BlockId)
                .filter(|&id| !walk.is_visited(id)),
        );

        for id in order {
            visitor(id, &mut self.blocks[id.index()]);
        }
    }

    /// Decodes a graph from a byte buffer with the default
    /// configuration.
    pub fn read(data: &[u8], registry: &Registry) -> Result<Self> {
        read(data, registry, ReadConfig::default())
    }

    /// Reads and decodes the file at `path`.
    pub fn open(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        let data = fs::read(path)?;
        Self::read(&data, registry)
    }

    /// Encodes the graph with the default configuration.
    pub fn write(&self, registry: &Registry) -> Result<Vec<u8>> {
        write(self, registry, WriteConfig::default())
    }

    /// Encodes the graph into `writer`.
    pub fn write_to<W: io::Write>(&self, mut writer: W, registry: &Registry) -> Result<()> {
        let data = self.write(registry)?;
        writer.write_all(&data)?;
        Ok(())
    }

    /// Encodes the graph into the file at `path`, replacing it.
    pub fn save(&self, path: impl AsRef<Path>, registry: &Registry) -> Result<()> {
        // Encode first so that failures leave an existing file untouched.
        let data = self.write(registry)?;

        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }
}

impl fmt::Display for NifGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)?;
        writeln!(f, "blocks:  {}", self.blocks.len())?;
        writeln!(f, "roots:   {:?}", self.roots.iter().map(|id| id.0).collect::<Vec<_>>())?;

        for (id, block) in self.all_blocks() {
            write!(f, "{id} {block}")?;
        }
        Ok(())
    }
}
