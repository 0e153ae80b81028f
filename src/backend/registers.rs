/// The L2 registers the instruction selector names explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    Rdi,
    Rsi,
    Rdx,
    Rcx,
    R8,
    R9,
    Rax,
    Rsp,
}

/// Registers carrying the first six call arguments, in order
pub const ARG_REGS: [Register; 6] = [
    Register::Rdi,
    Register::Rsi,
    Register::Rdx,
    Register::Rcx,
    Register::R8,
    Register::R9,
];

/// Register that holds a function's result
pub const RETURN_REG: Register = Register::Rax;

/// Stack slot (relative to `rsp`) the return label is written to before a call
pub const RETURN_ADDRESS_OFFSET: i64 = -8;

/// Stack offset (relative to `rsp`) at which the caller stores argument
/// `index`. Only meaningful for `index >= ARG_REGS.len()`.
pub fn outgoing_stack_argument_offset(index: usize) -> i64 {
    -16 - 8 * (index - ARG_REGS.len()) as i64
}

/// Stack offset (relative to `rsp`) from which the callee reads parameter
/// `index` of `parameter_count`. Only meaningful for `index >= ARG_REGS.len()`.
pub fn incoming_stack_argument_offset(index: usize, parameter_count: usize) -> i64 {
    ((parameter_count - index) * 8) as i64
}
