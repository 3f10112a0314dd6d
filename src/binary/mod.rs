//! The on-disk container: magic/version header, a block index, and the
//! blocks themselves. Block 0 is reserved for the extension manifest
//! (count + names); bytecode blocks start at index 1.

pub mod cursor;
pub mod writer;

use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::error::{SieveError, SieveResult};
use cursor::Cursor;

pub const MAGIC: u32 = 0xdead_beaf;
pub const MAGIC_SWAPPED: u32 = 0xefbe_adde;
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// Block 0, reserved for the extension manifest.
pub const EXTENSIONS_BLOCK: u32 = 0;
/// First block id available to the generator for bytecode/data.
pub const FIRST_DATA_BLOCK: u32 = 1;

#[derive(Debug, Clone)]
pub struct BlockIndexEntry {
    pub id: u32,
    pub size: u32,
    pub offset: u32,
    /// Binary-local extension index that owns this block, or `None` for
    /// blocks owned by the core (the extension manifest and the main
    /// program block).
    pub ext_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: u32,
    pub data: Vec<u8>,
    /// Binary-local extension index that owns this block, or `None` for
    /// blocks owned by the core (the extension manifest and the main
    /// program block).
    pub ext_id: Option<u32>,
}

impl Block {
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.data)
    }
}

/// Sentinel written in place of a block-index record's `extension_index`
/// field when the block is core-owned (`Block::ext_id` is `None`).
const NO_EXTENSION: u32 = u32::MAX;

/// A loaded or in-progress-to-be-saved compiled program.
#[derive(Debug, Clone)]
pub struct Binary {
    pub version: (u8, u8),
    /// Extension names in binary-local load order; index into this vec is
    /// the stable `ext_index` used by operands and the extension table.
    pub extensions: Vec<String>,
    pub blocks: Vec<Block>,
}

impl Binary {
    pub fn new() -> Self {
        Binary {
            version: (VERSION_MAJOR, VERSION_MINOR),
            extensions: Vec::new(),
            blocks: vec![Block { id: EXTENSIONS_BLOCK, data: Vec::new(), ext_id: None }],
        }
    }

    pub fn block(&self, id: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn ext_index(&self, name: &str) -> Option<u32> {
        self.extensions.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Serializes the container: header (with an explicit `block_count`,
    /// spec §4.1), then a placeholder index, then the blocks themselves,
    /// then backpatches the index with real sizes and offsets. Saved
    /// atomically via a temp file + rename.
    pub fn save(&self, path: &Path) -> SieveResult<()> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.push(self.version.0);
        out.push(self.version.1);
        out.extend_from_slice(&[0u8; 2]); // pad version to a 4-byte boundary
        out.extend_from_slice(&(self.blocks.len() as u32).to_be_bytes());
        debug_assert_eq!(out.len() % cursor::ALIGNMENT, 0);

        let index_pos = out.len();
        let mut index: Vec<BlockIndexEntry> = self
            .blocks
            .iter()
            .map(|b| BlockIndexEntry { id: b.id, size: 0, offset: 0, ext_id: b.ext_id })
            .collect();
        // Reserve space for the index (id:4 + size:4 + offset:4 + ext:4 per
        // entry — 16 bytes keeps every record itself 4-byte aligned).
        out.resize(out.len() + index.len() * 16, 0);

        for (entry, block) in index.iter_mut().zip(&self.blocks) {
            while out.len() % cursor::ALIGNMENT != 0 {
                out.push(0);
            }
            entry.offset = out.len() as u32;
            entry.size = block.data.len() as u32;
            out.extend_from_slice(&block.data);
        }

        let mut cursor = index_pos;
        for entry in &index {
            out[cursor..cursor + 4].copy_from_slice(&entry.id.to_be_bytes());
            out[cursor + 4..cursor + 8].copy_from_slice(&entry.size.to_be_bytes());
            out[cursor + 8..cursor + 12].copy_from_slice(&entry.offset.to_be_bytes());
            let ext_id = entry.ext_id.unwrap_or(NO_EXTENSION);
            out[cursor + 12..cursor + 16].copy_from_slice(&ext_id.to_be_bytes());
            cursor += 16;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(&out)?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        log::debug!("saved sieve binary to {} ({} bytes)", path.display(), out.len());
        Ok(())
    }

    /// Loads a container from disk, verifying magic and version, then
    /// reading the block index, then the extension manifest (block 0),
    /// then the remaining blocks.
    pub fn load(path: &Path) -> SieveResult<Self> {
        let raw = fs::read(path)?;
        Self::from_bytes(&raw)
    }

    pub fn from_bytes(raw: &[u8]) -> SieveResult<Self> {
        if raw.len() < 6 {
            return Err(SieveError::UnexpectedEof);
        }
        let magic = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        match magic {
            MAGIC => {}
            MAGIC_SWAPPED => return Err(SieveError::IncompatibleEndian),
            _ => return Err(SieveError::BadMagic),
        }
        let version = (raw[4], raw[5]);
        if version != (VERSION_MAJOR, VERSION_MINOR) {
            return Err(SieveError::VersionMismatch {
                found: version,
                expected: (VERSION_MAJOR, VERSION_MINOR),
            });
        }

        // Header: magic(4) + version(1+1) + pad(2) + block_count(4).
        if raw.len() < 12 {
            return Err(SieveError::UnexpectedEof);
        }
        let count = read_u32(raw, 8)? as usize;

        // Index: `count` records of {id, size, offset, extension_index},
        // each field a 32-bit big-endian word (spec §4.1).
        let mut entries = Vec::with_capacity(count);
        let mut pos = 12;
        for _ in 0..count {
            let id = read_u32(raw, pos)?;
            let size = read_u32(raw, pos + 4)?;
            let offset = read_u32(raw, pos + 8)?;
            let raw_ext = read_u32(raw, pos + 12)?;
            let ext_id = if raw_ext == NO_EXTENSION { None } else { Some(raw_ext) };
            entries.push(BlockIndexEntry { id, size, offset, ext_id });
            pos += 16;
        }

        let mut blocks = Vec::with_capacity(count);
        for entry in &entries {
            let start = entry.offset as usize;
            let end = start + entry.size as usize;
            let data = raw.get(start..end).ok_or(SieveError::UnexpectedEof)?.to_vec();
            blocks.push(Block { id: entry.id, data, ext_id: entry.ext_id });
        }

        let extensions = if let Some(ext_block) = blocks.iter().find(|b| b.id == EXTENSIONS_BLOCK)
        {
            let mut c = Cursor::new(&ext_block.data);
            let n = c.read_integer()? as usize;
            let mut names = Vec::with_capacity(n);
            for _ in 0..n {
                let s = c.read_string()?;
                names.push(String::from_utf8_lossy(s).into_owned());
            }
            names
        } else {
            Vec::new()
        };

        Ok(Binary { version, extensions, blocks })
    }
}

impl Default for Binary {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u32(raw: &[u8], pos: usize) -> SieveResult<u32> {
    let b = raw.get(pos..pos + 4).ok_or(SieveError::UnexpectedEof)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
