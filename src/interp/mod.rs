//! The bytecode interpreter: decodes and dispatches one operation per
//! step from the program block, maintaining the loop stack, test-result
//! register, and (for sub-interpretation) a parent pointer whose
//! `parent_loop_level` folds into this interpreter's own nesting cap.

pub mod dump;
pub mod loopstack;
pub mod ops;

use crate::binary::cursor::Cursor;
use crate::binary::{Binary, FIRST_DATA_BLOCK};
use crate::collab::{MessageView, TraceSink};
use crate::engine::Engine;
use crate::error::{ExecStatus, SieveError, SieveResult};
use crate::match_engine::{self, values::MatchValues};
use crate::result::actions::{DiscardAction, FileintoAction, KeepAction, RedirectAction};
use crate::result::ResultSet;
use crate::schema::opcode::OpCode;
use crate::schema::ExtensionTable;
use loopstack::LoopStack;

pub struct Interpreter<'a> {
    engine: &'a Engine,
    program: &'a [u8],
    extensions: ExtensionTable,
    pc: usize,
    test_result: bool,
    loop_stack: LoopStack,
    /// Aggregated loop nesting from any enclosing sub-interpretation,
    /// folded into this instance's own depth check.
    parent_loop_level: u32,
    /// Id of the optional debug block read from the construction prelude,
    /// if the generator recorded one.
    debug_block_id: Option<u32>,
    /// Binary-local extension indices linked during the construction
    /// prelude, in the order the generator listed them.
    linked_extensions: Vec<u32>,
    trace: &'a mut dyn TraceSink,
}

/// Reads the interpreter-construction prelude at the start of the main
/// program block: an optional debug-block id, then the list of
/// binary-local extension indices to link (mirrors
/// `_sieve_interpreter_create`'s reading order, spec §4.2 Entry). Leaves
/// `cursor` positioned at the reset vector.
pub(crate) fn read_prelude(cursor: &mut Cursor<'_>, ext_table_len: usize) -> SieveResult<(Option<u32>, Vec<u32>)> {
    let raw_debug = cursor.read_integer()?;
    let debug_block_id = if raw_debug == 0 { None } else { Some((raw_debug - 1) as u32) };
    let count = cursor.read_integer()? as usize;
    let mut linked = Vec::with_capacity(count);
    for _ in 0..count {
        let ext_index = cursor.read_integer()? as u32;
        if ext_index as usize >= ext_table_len {
            return Err(SieveError::UnknownExtension(ext_index));
        }
        linked.push(ext_index);
    }
    Ok((debug_block_id, linked))
}

impl<'a> Interpreter<'a> {
    pub fn new(engine: &'a Engine, binary: &'a Binary, trace: &'a mut dyn TraceSink) -> SieveResult<Self> {
        Self::new_nested(engine, binary, trace, 0)
    }

    /// Constructs a sub-interpreter, e.g. for an `include`-style nested
    /// program block, folding `parent_loop_level` into this instance's
    /// own depth cap (mirrors `sieve_interpreter_create_for_block`).
    pub fn new_nested(
        engine: &'a Engine,
        binary: &'a Binary,
        trace: &'a mut dyn TraceSink,
        parent_loop_level: u32,
    ) -> SieveResult<Self> {
        let block = binary
            .block(FIRST_DATA_BLOCK)
            .ok_or(SieveError::UnknownExtension(FIRST_DATA_BLOCK))?;
        let mut prelude_cursor = Cursor::new(&block.data);
        let (debug_block_id, linked_extensions) = read_prelude(&mut prelude_cursor, binary.extensions.len())?;
        let reset_vector = prelude_cursor.position();
        Ok(Interpreter {
            engine,
            program: &block.data,
            extensions: ExtensionTable::from_names(binary.extensions.clone()),
            pc: reset_vector,
            test_result: false,
            loop_stack: LoopStack::new(),
            parent_loop_level,
            debug_block_id,
            linked_extensions,
            trace,
        })
    }

    /// Id of the debug block named by the construction prelude, if any.
    pub fn debug_block_id(&self) -> Option<u32> {
        self.debug_block_id
    }

    /// Binary-local extension indices linked by the construction prelude.
    pub fn linked_extensions(&self) -> &[u32] {
        &self.linked_extensions
    }

    fn cursor_at(&self, pos: usize) -> Cursor<'a> {
        let mut c = Cursor::new(self.program);
        // `Cursor::seek` only fails past the end of the buffer, which
        // cannot happen here since `pos` always comes from a previously
        // validated address.
        let _ = c.seek(pos);
        c
    }

    /// Runs until a `Halt`/`Stop` opcode or the program block is
    /// exhausted, recording actions into `results`.
    pub fn run(&mut self, results: &mut ResultSet, message: &dyn MessageView) -> SieveResult<ExecStatus> {
        loop {
            if self.pc >= self.program.len() {
                return Ok(ExecStatus::Ok);
            }
            match self.step(results, message)? {
                Some(status) => return Ok(status),
                None => continue,
            }
        }
    }

    fn step(&mut self, results: &mut ResultSet, message: &dyn MessageView) -> SieveResult<Option<ExecStatus>> {
        let address = self.pc;
        let mut cursor = self.cursor_at(address);
        let raw_code = cursor.read_byte()?;

        if !OpCode::is_core(raw_code) {
            // No extension opcodes are registered by this core; an
            // extension-tagged byte here means the binary references an
            // extension we don't implement.
            return Err(SieveError::UnknownOpCode(raw_code as u64));
        }
        let opcode = OpCode::try_from(raw_code).map_err(|_| SieveError::UnknownOpCode(raw_code as u64))?;

        self.trace.trace(&format!("{address:06}: {opcode:?}"));

        match opcode {
            OpCode::Jmp => {
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                self.jump(anchor, offset)?;
            }
            OpCode::JmpTrue => {
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                if self.test_result {
                    self.jump(anchor, offset)?;
                } else {
                    self.pc = cursor.position();
                }
            }
            OpCode::JmpFalse => {
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                if !self.test_result {
                    self.jump(anchor, offset)?;
                } else {
                    self.pc = cursor.position();
                }
            }
            OpCode::LoopStart => {
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                let end = checked_target(anchor, offset, self.program.len())?;
                let begin = cursor.position();
                self.loop_stack.start(begin, end, self.program.len(), self.parent_loop_level, self.engine.limits.max_loop_depth)?;
                self.pc = begin;
            }
            OpCode::LoopNext => {
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                let begin = checked_target(anchor, offset, self.program.len())?;
                self.pc = self.loop_stack.next(begin)?;
            }
            OpCode::LoopBreak => {
                // The only jump allowed to cross a loop's end address: the
                // target is the break-out landing site, and every loop
                // frame whose `end <= target` is popped before the PC
                // lands there (nested `break`s pop more than one frame).
                let anchor = cursor.position();
                let offset = cursor.read_offset()?;
                let target = checked_target(anchor, offset, self.program.len())?;
                if self.loop_stack.depth() == 0 {
                    return Err(SieveError::LoopStackMismatch);
                }
                self.loop_stack.break_out(target);
                self.pc = target;
            }
            OpCode::Halt => return Ok(Some(ExecStatus::Ok)),
            OpCode::Not => {
                self.test_result = !self.test_result;
                self.pc = cursor.position();
            }
            OpCode::TestHeader => {
                self.exec_test_header(&mut cursor, message)?;
                self.pc = cursor.position();
            }
            OpCode::TestAddress => {
                self.exec_test_address(&mut cursor, message)?;
                self.pc = cursor.position();
            }
            OpCode::TestSize => {
                let over = cursor.read_byte()? != 0;
                let limit = cursor.read_integer()?;
                self.test_result = if over { message.size() > limit } else { message.size() < limit };
                self.pc = cursor.position();
            }
            OpCode::TestExists => {
                let names = ops::read_string_list(&mut cursor)?;
                self.test_result = names
                    .iter()
                    .all(|name| !message.header(&String::from_utf8_lossy(name)).is_empty());
                self.pc = cursor.position();
            }
            OpCode::TestTrue => {
                self.test_result = true;
                self.pc = cursor.position();
            }
            OpCode::TestFalse => {
                self.test_result = false;
                self.pc = cursor.position();
            }
            OpCode::ActKeep => {
                results.add_action(Box::new(KeepAction::new()));
                self.pc = cursor.position();
            }
            OpCode::ActFileinto => {
                let mailbox = String::from_utf8_lossy(cursor.read_string()?).into_owned();
                let flags = ops::read_string_list(&mut cursor)?
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect();
                results.add_action(Box::new(FileintoAction::new(mailbox, flags)));
                self.pc = cursor.position();
            }
            OpCode::ActRedirect => {
                let address_str = String::from_utf8_lossy(cursor.read_string()?).into_owned();
                results.add_action(Box::new(RedirectAction { address: address_str }));
                self.pc = cursor.position();
            }
            OpCode::ActDiscard => {
                results.add_action(Box::new(DiscardAction));
                self.pc = cursor.position();
            }
            OpCode::Stop => return Ok(Some(ExecStatus::Ok)),
        }
        Ok(None)
    }

    /// A plain (non-break) jump: the target must stay within the active
    /// loop's body, `target < loop_end`. Only [`OpCode::LoopBreak`] may
    /// land past a loop's end address. `anchor` is the byte address of
    /// the offset field itself (not the opcode byte), matching how the
    /// generator resolves it.
    fn jump(&mut self, anchor: usize, offset: i32) -> SieveResult<()> {
        let target = checked_target(anchor, offset, self.program.len())?;
        let limit = self.loop_stack.limit();
        if limit != 0 && target >= limit {
            return Err(SieveError::OffsetOutOfRange { offset: offset as i64, block_size: self.program.len() });
        }
        self.pc = target;
        Ok(())
    }

    fn exec_test_header(&mut self, cursor: &mut Cursor<'_>, message: &dyn MessageView) -> SieveResult<()> {
        let header_name = String::from_utf8_lossy(cursor.read_string()?).into_owned();
        let match_obj = ops::read_object_ref(cursor)?;
        let comparator_obj = ops::read_object_ref(cursor)?;
        let keys = ops::read_string_list(cursor)?;

        let match_type_name = ops::resolve_match_type_name(&self.extensions, match_obj)?;
        let comparator_name = ops::resolve_comparator_name(&self.extensions, comparator_obj)?;
        let match_type = self
            .engine
            .match_type(&match_type_name)
            .ok_or_else(|| SieveError::UnknownExtension(0))?;
        let comparator = self
            .engine
            .comparator(&comparator_name)
            .ok_or_else(|| SieveError::UnknownExtension(0))?;

        let mut ctx = match_engine::begin(match_type, comparator, false)?;
        let values = message.header(&header_name);
        let found = values.iter().any(|v| match_engine::match_value(&mut ctx, v, &keys));
        let _: MatchValues = match_engine::end(ctx);
        self.test_result = found;
        Ok(())
    }

    fn exec_test_address(&mut self, cursor: &mut Cursor<'_>, message: &dyn MessageView) -> SieveResult<()> {
        let part = ops::decode_address_part(cursor.read_byte()?)?;
        let header_name = String::from_utf8_lossy(cursor.read_string()?).into_owned();
        let match_obj = ops::read_object_ref(cursor)?;
        let comparator_obj = ops::read_object_ref(cursor)?;
        let keys = ops::read_string_list(cursor)?;

        let match_type_name = ops::resolve_match_type_name(&self.extensions, match_obj)?;
        let comparator_name = ops::resolve_comparator_name(&self.extensions, comparator_obj)?;
        let match_type = self
            .engine
            .match_type(&match_type_name)
            .ok_or_else(|| SieveError::UnknownExtension(0))?;
        let comparator = self
            .engine
            .comparator(&comparator_name)
            .ok_or_else(|| SieveError::UnknownExtension(0))?;

        let mut ctx = match_engine::begin(match_type, comparator, false)?;
        let values = message.header(&header_name);
        let found = values.iter().any(|v| {
            let extracted = ops::extract_address_part(part, v);
            match_engine::match_value(&mut ctx, &extracted, &keys)
        });
        let _: MatchValues = match_engine::end(ctx);
        self.test_result = found;
        Ok(())
    }
}

fn checked_target(address: usize, offset: i32, block_size: usize) -> SieveResult<usize> {
    let target = address as i64 + offset as i64;
    if target <= 0 || target as usize > block_size {
        return Err(SieveError::OffsetOutOfRange { offset: offset as i64, block_size });
    }
    Ok(target as usize)
}
