use num_enum::TryFromPrimitive;

/// Core opcodes occupy `0..CUSTOM_THRESHOLD`; codes at or above the
/// threshold belong to an extension and carry an extra extension-index
/// operand (see [`crate::schema::operand::Operand::Object`]).
pub const CUSTOM_THRESHOLD: u8 = 64;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum OpCode {
    Jmp = 0,
    JmpTrue = 1,
    JmpFalse = 2,
    LoopStart = 3,
    LoopNext = 4,
    LoopBreak = 5,
    Halt = 6,

    Not = 10,

    TestHeader = 20,
    TestAddress = 21,
    TestSize = 22,
    TestExists = 23,
    TestTrue = 24,
    TestFalse = 25,

    ActKeep = 40,
    ActFileinto = 41,
    ActRedirect = 42,
    ActDiscard = 43,
    Stop = 44,
}

impl OpCode {
    pub fn is_core(code: u8) -> bool {
        code < CUSTOM_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_core_codes_are_below_threshold() {
        for code in [
            OpCode::Jmp,
            OpCode::JmpTrue,
            OpCode::JmpFalse,
            OpCode::LoopStart,
            OpCode::LoopNext,
            OpCode::LoopBreak,
            OpCode::Halt,
            OpCode::Not,
            OpCode::TestHeader,
            OpCode::TestAddress,
            OpCode::TestSize,
            OpCode::TestExists,
            OpCode::TestTrue,
            OpCode::TestFalse,
            OpCode::ActKeep,
            OpCode::ActFileinto,
            OpCode::ActRedirect,
            OpCode::ActDiscard,
            OpCode::Stop,
        ] {
            assert!(OpCode::is_core(code as u8));
        }
    }

    #[test]
    fn unknown_byte_fails_conversion() {
        assert!(OpCode::try_from(255u8).is_err());
    }
}
