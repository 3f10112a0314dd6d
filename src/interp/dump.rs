//! Textual disassembly of a binary's main program block: one line per
//! decoded operation, using the same operand readers the interpreter
//! itself uses. Mirrors the original's per-operation `dump` function
//! without needing a second parallel dispatch table — the core opcode
//! set here is small enough that one decoder serves both reading for
//! execution and reading for listing.

use std::fmt::Write as _;

use crate::binary::cursor::Cursor;
use crate::binary::{Binary, FIRST_DATA_BLOCK};
use crate::error::{SieveError, SieveResult};
use crate::schema::opcode::OpCode;
use crate::schema::ExtensionTable;

use super::ops;

/// Disassembles `binary`'s main program block into one listing line per
/// operation, each prefixed with its byte address.
pub fn disassemble(binary: &Binary) -> SieveResult<Vec<String>> {
    let block = binary
        .block(FIRST_DATA_BLOCK)
        .ok_or(SieveError::UnknownExtension(FIRST_DATA_BLOCK))?;
    let extensions = ExtensionTable::from_names(binary.extensions.clone());
    let mut cursor = Cursor::new(&block.data);
    // Skip the construction prelude (debug block id + linked-extension
    // list) the interpreter itself consumes before reaching the reset
    // vector; listing starts from the first real operation.
    super::read_prelude(&mut cursor, binary.extensions.len())?;
    let mut lines = Vec::new();

    while cursor.remaining() > 0 {
        let address = cursor.position();
        let raw_code = cursor.read_byte()?;
        if !OpCode::is_core(raw_code) {
            return Err(SieveError::UnknownOpCode(raw_code as u64));
        }
        let opcode = OpCode::try_from(raw_code).map_err(|_| SieveError::UnknownOpCode(raw_code as u64))?;
        let mut line = format!("{address:06}: {opcode:?}");
        dump_operands(opcode, &mut cursor, &extensions, &mut line)?;
        lines.push(line);
    }
    Ok(lines)
}

fn dump_operands(
    opcode: OpCode,
    cursor: &mut Cursor<'_>,
    extensions: &ExtensionTable,
    line: &mut String,
) -> SieveResult<()> {
    match opcode {
        OpCode::Jmp | OpCode::JmpTrue | OpCode::JmpFalse | OpCode::LoopStart | OpCode::LoopNext | OpCode::LoopBreak => {
            let offset = cursor.read_offset()?;
            let _ = write!(line, " offset={offset}");
        }
        OpCode::Halt | OpCode::Not | OpCode::TestTrue | OpCode::TestFalse | OpCode::ActKeep | OpCode::ActDiscard | OpCode::Stop => {}
        OpCode::TestHeader => {
            let header = cursor.read_string()?;
            let match_obj = ops::read_object_ref(cursor)?;
            let comparator_obj = ops::read_object_ref(cursor)?;
            let keys = ops::read_string_list(cursor)?;
            let match_name = ops::resolve_match_type_name(extensions, match_obj)?;
            let comparator_name = ops::resolve_comparator_name(extensions, comparator_obj)?;
            let _ = write!(
                line,
                " header={:?} match=:{match_name} comparator={comparator_name:?} keys={}",
                String::from_utf8_lossy(header),
                keys.len()
            );
        }
        OpCode::TestAddress => {
            let part = cursor.read_byte()?;
            let header = cursor.read_string()?;
            let match_obj = ops::read_object_ref(cursor)?;
            let comparator_obj = ops::read_object_ref(cursor)?;
            let keys = ops::read_string_list(cursor)?;
            let match_name = ops::resolve_match_type_name(extensions, match_obj)?;
            let comparator_name = ops::resolve_comparator_name(extensions, comparator_obj)?;
            let _ = write!(
                line,
                " part={part} header={:?} match=:{match_name} comparator={comparator_name:?} keys={}",
                String::from_utf8_lossy(header),
                keys.len()
            );
        }
        OpCode::TestSize => {
            let over = cursor.read_byte()? != 0;
            let limit = cursor.read_integer()?;
            let _ = write!(line, " {} {limit}", if over { ":over" } else { ":under" });
        }
        OpCode::TestExists => {
            let names = ops::read_string_list(cursor)?;
            let _ = write!(line, " headers={}", names.len());
        }
        OpCode::ActFileinto => {
            let mailbox = cursor.read_string()?;
            let flags = ops::read_string_list(cursor)?;
            let _ = write!(
                line,
                " mailbox={:?} flags={}",
                String::from_utf8_lossy(mailbox),
                flags.len()
            );
        }
        OpCode::ActRedirect => {
            let address = cursor.read_string()?;
            let _ = write!(line, " address={:?}", String::from_utf8_lossy(address));
        }
    }
    Ok(())
}
