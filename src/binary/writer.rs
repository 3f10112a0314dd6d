//! Builds a [`Binary`](super::Binary) in memory. Used by the (external)
//! bytecode generator and, in this crate's own tests, to hand-assemble
//! programs the way that generator would, since the lexer/parser/AST are
//! out of scope here.

use super::{Binary, Block, EXTENSIONS_BLOCK, FIRST_DATA_BLOCK};
use crate::binary::cursor::CursorWriter;

pub struct BinaryWriter {
    extensions: Vec<String>,
    blocks: Vec<Block>,
    next_block_id: u32,
    /// Id of an optional debug block mapping code addresses to script
    /// source lines, written into the main program's prelude.
    debug_block_id: Option<u32>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        BinaryWriter {
            extensions: Vec::new(),
            blocks: Vec::new(),
            next_block_id: FIRST_DATA_BLOCK,
            debug_block_id: None,
        }
    }

    /// Registers an extension, returning its binary-local index. Calling
    /// this twice for the same name returns the same index (first-link
    /// order, as the original's binary-local extension table does).
    pub fn register_extension(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.extensions.iter().position(|n| n == name) {
            return pos as u32;
        }
        self.extensions.push(name.to_string());
        (self.extensions.len() - 1) as u32
    }

    /// Records the id of a debug block (not otherwise modeled by this
    /// crate) for the main program's prelude to reference.
    pub fn set_debug_block(&mut self, id: u32) {
        self.debug_block_id = Some(id);
    }

    /// Adds a core-owned data block, returning its block id.
    pub fn add_block(&mut self, data: Vec<u8>) -> u32 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        self.blocks.push(Block { id, data, ext_id: None });
        id
    }

    /// Adds a block owned by the extension at binary-local index
    /// `ext_index` (as returned by [`Self::register_extension`]),
    /// returning the new block's id.
    pub fn add_extension_block(&mut self, ext_index: u32, data: Vec<u8>) -> u32 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        self.blocks.push(Block { id, data, ext_id: Some(ext_index) });
        id
    }

    pub fn finish(mut self) -> Binary {
        // Prepend the interpreter-construction prelude (debug block id,
        // then the list of extensions to link) to the main program block,
        // mirroring `_sieve_interpreter_create`'s reading order (spec
        // §4.2 Entry). Done here rather than at `add_block` time so every
        // extension registered before `finish` is covered regardless of
        // call order.
        if let Some(main) = self.blocks.iter_mut().find(|b| b.id == FIRST_DATA_BLOCK) {
            let code = std::mem::take(&mut main.data);
            let mut prelude = CursorWriter::new();
            prelude.emit_integer(self.debug_block_id.map(|d| d as u64 + 1).unwrap_or(0));
            prelude.emit_integer(self.extensions.len() as u64);
            for i in 0..self.extensions.len() {
                prelude.emit_integer(i as u64);
            }
            let mut bytes = prelude.into_bytes();
            bytes.extend(code);
            main.data = bytes;
        }

        let mut ext_writer = CursorWriter::new();
        ext_writer.emit_integer(self.extensions.len() as u64);
        for name in &self.extensions {
            ext_writer.emit_string(name.as_bytes());
        }
        let mut blocks = vec![Block { id: EXTENSIONS_BLOCK, data: ext_writer.into_bytes(), ext_id: None }];
        blocks.extend(self.blocks);

        Binary { version: (super::VERSION_MAJOR, super::VERSION_MINOR), extensions: self.extensions, blocks }
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}
