//! Per-opcode decode + execute. Each function reads its own operands from
//! the cursor positioned right after the opcode byte and returns the new
//! `test_result` or an action to record, leaving jump/loop bookkeeping to
//! [`super::Interpreter::run`].

use crate::binary::cursor::Cursor;
use crate::error::{SieveError, SieveResult};
use crate::match_engine::stringlist::StringList;
use crate::schema::operand::ObjectRef;

/// Core match-type codes, as stored in `ObjectRef::Core`.
pub fn core_match_type_name(code: u8) -> SieveResult<&'static str> {
    match code {
        0 => Ok("is"),
        1 => Ok("contains"),
        2 => Ok("matches"),
        3 => Ok("regex"),
        other => Err(SieveError::UnknownOpCode(other as u64)),
    }
}

/// Core comparator codes, as stored in `ObjectRef::Core`.
pub fn core_comparator_name(code: u8) -> SieveResult<&'static str> {
    match code {
        0 => Ok("i;octet"),
        1 => Ok("i;ascii-casemap"),
        other => Err(SieveError::UnknownOpCode(other as u64)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPart {
    All,
    Local,
    Domain,
}

pub fn decode_address_part(code: u8) -> SieveResult<AddressPart> {
    match code {
        0 => Ok(AddressPart::All),
        1 => Ok(AddressPart::Local),
        2 => Ok(AddressPart::Domain),
        other => Err(SieveError::UnknownOpCode(other as u64)),
    }
}

pub fn extract_address_part(part: AddressPart, address: &[u8]) -> Vec<u8> {
    let at = address.iter().rposition(|&b| b == b'@');
    match (part, at) {
        (AddressPart::All, _) => address.to_vec(),
        (AddressPart::Local, Some(pos)) => address[..pos].to_vec(),
        (AddressPart::Domain, Some(pos)) => address[pos + 1..].to_vec(),
        (AddressPart::Local, None) => address.to_vec(),
        (AddressPart::Domain, None) => Vec::new(),
    }
}

/// Reads an `ObjectRef`: a tag byte (0 = core, 1 = extension) followed by
/// either a single core code byte or an `(ext_index, sub_code)` pair.
pub fn read_object_ref(cursor: &mut Cursor<'_>) -> SieveResult<ObjectRef> {
    let tag = cursor.read_byte()?;
    if tag == 0 {
        Ok(ObjectRef::Core(cursor.read_byte()?))
    } else {
        let ext_index = cursor.read_integer()? as u32;
        let sub_code = cursor.read_byte()?;
        Ok(ObjectRef::Extension { ext_index, sub_code })
    }
}

pub fn resolve_match_type_name(ext_table: &crate::schema::ExtensionTable, obj: ObjectRef) -> SieveResult<String> {
    match obj {
        ObjectRef::Core(code) => Ok(core_match_type_name(code)?.to_string()),
        ObjectRef::Extension { ext_index, .. } => {
            let name = ext_table.name_at(ext_index)?;
            Ok(name.to_string())
        }
    }
}

pub fn resolve_comparator_name(ext_table: &crate::schema::ExtensionTable, obj: ObjectRef) -> SieveResult<String> {
    match obj {
        ObjectRef::Core(code) => Ok(core_comparator_name(code)?.to_string()),
        ObjectRef::Extension { ext_index, .. } => Ok(ext_table.name_at(ext_index)?.to_string()),
    }
}

pub fn read_string_list(cursor: &mut Cursor<'_>) -> SieveResult<StringList> {
    let count = cursor.read_integer()? as usize;
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        keys.push(cursor.read_string()?.to_vec());
    }
    Ok(StringList::new(keys))
}
