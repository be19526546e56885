//! Instruction operands shared by architecture backends when building their extended bytecodes.

use super::expr::Expr;

/// An immediate operand.
#[derive(Clone, Debug, PartialEq)]
pub struct ImmVal {
    pub val: Expr,
    /// Length of the encoded value in bytes (0 if not known until the value is resolved).
    pub len: u8,
    /// Set if the value was negated in the source.
    pub isneg: bool,
    /// Length given by an explicit size override (0 if none).
    pub f_len: u8,
    /// Set if an explicit override requested a signed value.
    pub f_sign: bool,
}
impl ImmVal {
    /// Creates an immediate from a known integer, using the smallest of 1, 2, or 4 bytes that holds it.
    pub fn new_int(val: u64) -> Self {
        let len = if val & 0xff == val {
            1
        } else if val & 0xffff == val {
            2
        } else {
            4
        };
        Self { val: val.into(), len, isneg: false, f_len: 0, f_sign: false }
    }
    /// Creates an immediate whose length is deferred until `val` can be evaluated.
    pub fn new_expr(val: Expr) -> Self {
        Self { val, len: 0, isneg: false, f_len: 0, f_sign: false }
    }
}

/// An effective address (memory operand).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffAddr {
    /// The displacement, if any.
    pub disp: Option<Expr>,
    /// Length of the displacement in bytes (0 if not yet determined).
    pub len: u8,
    /// Set if the address must not be split into base and index registers.
    pub nosplit: bool,
}
impl EffAddr {
    pub fn new(disp: Option<Expr>) -> Self {
        Self { disp, len: 0, nosplit: false }
    }
    /// Overrides the displacement length.
    /// Truncation is not diagnosed since this only comes from an explicit size override.
    pub fn set_len(&mut self, len: u8) {
        self.len = len;
    }
    pub fn set_nosplit(&mut self, nosplit: bool) {
        self.nosplit = nosplit;
    }
}

/// Applies a displacement length override to an operand that may not be an effective address.
pub fn ea_set_len(ea: Option<&mut EffAddr>, len: u8) {
    if let Some(ea) = ea {
        ea.set_len(len);
    }
}
/// Applies a no-split override to an operand that may not be an effective address.
pub fn ea_set_nosplit(ea: Option<&mut EffAddr>, nosplit: bool) {
    if let Some(ea) = ea {
        ea.set_nosplit(nosplit);
    }
}

#[test]
fn test_imm_int_len() {
    assert_eq!(ImmVal::new_int(0).len, 1);
    assert_eq!(ImmVal::new_int(0xff).len, 1);
    assert_eq!(ImmVal::new_int(0x100).len, 2);
    assert_eq!(ImmVal::new_int(0xffff).len, 2);
    assert_eq!(ImmVal::new_int(0x10000).len, 4);
    assert_eq!(ImmVal::new_int(0xffff_ffff).len, 4);

    let imm = ImmVal::new_int(0x1234);
    assert_eq!(imm.val, Expr::from(0x1234u64));
    assert!(!imm.isneg && !imm.f_sign);
    assert_eq!(imm.f_len, 0);
}
#[test]
fn test_imm_expr() {
    use super::expr::OP;

    let imm = ImmVal::new_expr((OP::Add, Expr::ident("base"), 4).into());
    assert_eq!(imm.len, 0);
    assert_eq!(imm.f_len, 0);
    assert!(!imm.isneg && !imm.f_sign);
    assert_eq!(imm.val.to_string(), "base+4");
}
#[test]
fn test_ea_overrides() {
    let mut ea = EffAddr::new(Some(8.into()));
    assert_eq!((ea.len, ea.nosplit), (0, false));
    ea_set_len(Some(&mut ea), 4);
    ea_set_nosplit(Some(&mut ea), true);
    assert_eq!((ea.len, ea.nosplit), (4, true));
    ea.set_nosplit(false);
    assert!(!ea.nosplit);

    ea_set_len(None, 2);
    ea_set_nosplit(None, true);
    assert_eq!(ea, EffAddr { disp: Some(8.into()), len: 4, nosplit: false });
}
