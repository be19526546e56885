//! Everything needed to handle expression trees.
//!
//! The important type is `Expr`, which represents an owned expression tree.
//! Expressions are owned by exactly one node (a bytecode multiplier, a reserve count, a data value, or an equ symbol)
//! and are destroyed along with it.
//!
//! Only integer evaluation is provided here (enough to query the value of equ symbols and repeat counts).
//! Symbol values are obtained through the `SymbolLookup` trait so that this module does not depend on the symbol table.

use std::collections::HashSet;
use std::cmp::Ordering;
use std::fmt;
use rug::{Integer, Float};

/// Number of precision bits to use for floating point values.
pub const FLOAT_PRECISION: u32 = 80;
/// Maximum number of significant bits to use for integer values.
/// Shifts exceeding this are hard errors.
pub const INT_PRECISION: u32 = 136;

/// The supported operations in an expr.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum OP {
    // binary ops

    Mul,
    Div, Mod,
    Add, Sub,

    SHL, SHR,

    And, Or, Xor,

    // unary ops

    Neg, Not,
}
impl OP {
    /// Checks if this op takes a single operand.
    pub fn is_unary(self) -> bool {
        matches!(self, OP::Neg | OP::Not)
    }
    fn symbol(self) -> &'static str {
        match self {
            OP::Mul => "*",
            OP::Div => "/",
            OP::Mod => "%",
            OP::Add => "+",
            OP::Sub => "-",
            OP::SHL => "<<",
            OP::SHR => ">>",
            OP::And => "&",
            OP::Or => "|",
            OP::Xor => "^",
            OP::Neg => "-",
            OP::Not => "~",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueType {
    Integer,
    Float,
}

/// A literal number.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(Integer),
    Float(Float),
}
impl Value {
    pub fn get_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
        }
    }
}
impl From<Integer> for Value {
    fn from(val: Integer) -> Self {
        Value::Integer(val)
    }
}
impl From<Float> for Value {
    fn from(val: Float) -> Self {
        Value::Float(val)
    }
}
impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(Float::with_val(FLOAT_PRECISION, val))
    }
}

macro_rules! value_from_int_impl {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(val: $t) -> Self {
                Value::Integer(val.into())
            }
        }
    )*}
}
value_from_int_impl! { u8, u16, u32, u64, i8, i16, i32, i64 }

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v.to_f64()),
        }
    }
}

/// Holds the information needed to create an instance of `Expr`.
///
/// # Example
/// ```
/// # use asmcore::asm::expr::*;
/// let ex: Expr = ExprData::Ident("foo".into()).into(); // points to the identifier "foo"
/// let ey: Expr = 12u64.into(); // thanks to convenience functions, ExprData::Value is even simpler
/// let ez: Expr = (OP::Mul, ex, ey).into();
/// assert_eq!(ez.to_string(), "foo*12");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ExprData {
    Value(Value),
    Ident(String),
    Uneval { op: OP, left: Box<Expr>, right: Option<Box<Expr>> },
}
/// Convenience for creating instances of `ExprData::Value`.
impl<T> From<T> for ExprData where Value: From<T> {
    fn from(val: T) -> Self {
        ExprData::Value(val.into())
    }
}
/// Convenience for creating instances of `ExprData::Uneval` for binary ops.
impl<T, U> From<(OP, T, U)> for ExprData where Expr: From<T> + From<U> {
    fn from(vals: (OP, T, U)) -> Self {
        debug_assert!(!vals.0.is_unary());
        ExprData::Uneval { op: vals.0, left: Box::new(vals.1.into()), right: Some(Box::new(vals.2.into())) }
    }
}
/// Convenience for creating instances of `ExprData::Uneval` for unary ops.
impl<T> From<(OP, T)> for ExprData where Expr: From<T> {
    fn from(vals: (OP, T)) -> Self {
        debug_assert!(vals.0.is_unary());
        ExprData::Uneval { op: vals.0, left: Box::new(vals.1.into()), right: None }
    }
}

/// An expression.
///
/// This is an owned numeric syntax tree, constructed via `ExprData`.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub(super) data: ExprData,
}
/// Convenience for creating expressions from the raw type `ExprData`.
impl<T> From<T> for Expr where ExprData: From<T> {
    fn from(val: T) -> Self {
        Expr { data: val.into() }
    }
}
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.data {
            ExprData::Value(v) => write!(f, "{}", v),
            ExprData::Ident(ident) => write!(f, "{}", ident),
            ExprData::Uneval { op, left, right: None } => {
                write!(f, "{}", op.symbol())?;
                left.fmt_operand(f)
            }
            ExprData::Uneval { op, left, right: Some(right) } => {
                left.fmt_operand(f)?;
                write!(f, "{}", op.symbol())?;
                right.fmt_operand(f)
            }
        }
    }
}

/// The specific reason why an illegal operation failed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IllegalReason {
    IncompatibleType(OP, ValueType),
    /// A non-integer value was used where an integer was required.
    NotInteger(ValueType),
    CyclicDependency,

    DivideByZero,
    IntegerTooLarge,
}

/// The reason why an expression failed to be evaluated.
///
/// `Illegal` denotes a failure that no later pass can fix.
/// The other kinds can be recovered so long as the symbol gets a value at some later point.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum EvalError {
    /// Denotes that the user did something illegal (e.g. division by zero or cyclic dependencies).
    Illegal(IllegalReason),
    /// Denotes that evaluation failed because the stored symbol name was not defined.
    UndefinedSymbol(String),
    /// Denotes that the symbol is defined but its value is not known yet (e.g. labels and externs).
    Unresolved(String),
}
impl From<IllegalReason> for EvalError {
    fn from(reason: IllegalReason) -> Self {
        EvalError::Illegal(reason)
    }
}

/// The result of looking up a symbol name for evaluation.
pub enum Lookup<'a> {
    Undefined,
    /// The symbol exists but has no expression value (yet).
    Unresolved,
    Expr(&'a Expr),
}

/// A source of symbol values for evaluation.
pub trait SymbolLookup {
    fn lookup_expr(&self, name: &str) -> Lookup<'_>;
}

// ----------------------------------------------------------------------------------------------

/// Combines two evaluated operands, giving illegal failures priority over recoverable ones.
fn both_legal(left: Result<Integer, EvalError>, right: Result<Integer, EvalError>) -> Result<(Integer, Integer), EvalError> {
    match (left, right) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(EvalError::Illegal(reason)), _) | (_, Err(EvalError::Illegal(reason))) => Err(reason.into()),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}
#[test]
fn test_both_legal() {
    assert!(both_legal(Ok(34.into()), Ok(12.into())).is_ok());
    assert_eq!(both_legal(Ok(34.into()), Err(EvalError::UndefinedSymbol("heloo".into()))).unwrap_err(), EvalError::UndefinedSymbol("heloo".into()));
    assert_eq!(both_legal(Err(EvalError::UndefinedSymbol("heloo".into())), Err(EvalError::Illegal(IllegalReason::DivideByZero))).unwrap_err(), EvalError::Illegal(IllegalReason::DivideByZero));
    assert_eq!(both_legal(Err(EvalError::Unresolved("a".into())), Err(EvalError::UndefinedSymbol("b".into()))).unwrap_err(), EvalError::Unresolved("a".into()));
}

fn shift_amount(b: &Integer) -> Result<u32, EvalError> {
    match b.to_u32() {
        Some(v) if v <= INT_PRECISION => Ok(v),
        _ => Err(IllegalReason::IntegerTooLarge.into()),
    }
}

impl Expr {
    /// Constructs an expression referring to the named symbol.
    pub fn ident(name: &str) -> Self {
        ExprData::Ident(name.to_owned()).into()
    }
    /// Gets the raw tree.
    pub fn data(&self) -> &ExprData {
        &self.data
    }
    /// Gets the literal value if this expression is just a value node.
    pub fn as_value(&self) -> Option<&Value> {
        match &self.data {
            ExprData::Value(v) => Some(v),
            _ => None,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.data {
            ExprData::Uneval { .. } => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }

    /// Attempts to evaluate the expression as an integer given a source of symbol values.
    pub fn eval_int(&self, symbols: &dyn SymbolLookup) -> Result<Integer, EvalError> {
        self.eval_recursive(symbols, &mut Default::default())
    }
    fn eval_recursive(&self, symbols: &dyn SymbolLookup, visited: &mut HashSet<String>) -> Result<Integer, EvalError> {
        match &self.data {
            ExprData::Value(Value::Integer(v)) => Ok(v.clone()),
            ExprData::Value(v) => Err(IllegalReason::NotInteger(v.get_type()).into()),
            ExprData::Ident(ident) => match symbols.lookup_expr(ident) {
                Lookup::Undefined => Err(EvalError::UndefinedSymbol(ident.clone())),
                Lookup::Unresolved => Err(EvalError::Unresolved(ident.clone())),
                Lookup::Expr(entry) => {
                    if !visited.insert(ident.clone()) { return Err(IllegalReason::CyclicDependency.into()); }
                    let res = entry.eval_recursive(symbols, visited);
                    visited.remove(ident);
                    res
                }
            }
            ExprData::Uneval { op, left, right: None } => {
                let a = left.eval_recursive(symbols, visited)?;
                match op {
                    OP::Neg => Ok(-a),
                    OP::Not => Ok(!a),
                    _ => unreachable!("binary op {:?} without a right branch", op),
                }
            }
            ExprData::Uneval { op, left, right: Some(right) } => {
                let (a, b) = both_legal(left.eval_recursive(symbols, visited), right.eval_recursive(symbols, visited))?;
                match op {
                    OP::Mul => Ok(a * b),
                    OP::Div | OP::Mod if b.cmp0() == Ordering::Equal => Err(IllegalReason::DivideByZero.into()),
                    OP::Div => Ok(a / b),
                    OP::Mod => Ok(a % b),
                    OP::Add => Ok(a + b),
                    OP::Sub => Ok(a - b),
                    OP::SHL => {
                        let shift = shift_amount(&b)?;
                        if a.significant_bits() + shift > INT_PRECISION { return Err(IllegalReason::IntegerTooLarge.into()); }
                        Ok(a << shift)
                    }
                    OP::SHR => Ok(a >> shift_amount(&b)?),
                    OP::And => Ok(a & b),
                    OP::Or => Ok(a | b),
                    OP::Xor => Ok(a ^ b),
                    OP::Neg | OP::Not => Err(IllegalReason::IncompatibleType(*op, ValueType::Integer).into()),
                }
            }
        }
    }
}

#[cfg(test)]
struct TestSymbols(std::collections::HashMap<String, Option<Expr>>);
#[cfg(test)]
impl SymbolLookup for TestSymbols {
    fn lookup_expr(&self, name: &str) -> Lookup<'_> {
        match self.0.get(name) {
            None => Lookup::Undefined,
            Some(None) => Lookup::Unresolved,
            Some(Some(e)) => Lookup::Expr(e),
        }
    }
}

#[test]
fn test_expr_display() {
    let e: Expr = (OP::Add, Expr::ident("foo"), (OP::Mul, 4, Expr::ident("bar"))).into();
    assert_eq!(e.to_string(), "foo+(4*bar)");
    let e: Expr = (OP::Neg, (OP::Sub, 1, 2)).into();
    assert_eq!(e.to_string(), "-(1-2)");
    let e: Expr = (OP::Not, 7u8).into();
    assert_eq!(e.to_string(), "~7");
    assert_eq!(Expr::from(-3i64).to_string(), "-3");
}

#[test]
fn test_expr_eval() {
    let s = TestSymbols(Default::default());
    macro_rules! eval {
        ($op:expr, $left:expr, $right:expr) => {
            Expr::from(($op, Expr::from($left), Expr::from($right))).eval_int(&s)
        }
    }

    assert_eq!(eval!(OP::Mul, 4, 6).unwrap(), 24);
    assert_eq!(eval!(OP::Mul, -4, 6).unwrap(), -24);
    assert_eq!(eval!(OP::Div, 57, 10).unwrap(), 5);
    assert_eq!(eval!(OP::Div, -57, 10).unwrap(), -5);
    assert_eq!(eval!(OP::Mod, -57, 10).unwrap(), -7);
    assert_eq!(eval!(OP::Mod, 57, -10).unwrap(), 7);
    assert_eq!(eval!(OP::Sub, 3, 10).unwrap(), -7);
    assert_eq!(eval!(OP::SHL, 3, 4).unwrap(), 48);
    assert_eq!(eval!(OP::SHR, 48, 4).unwrap(), 3);
    assert_eq!(eval!(OP::And, 0b1100, 0b1010).unwrap(), 0b1000);
    assert_eq!(eval!(OP::Or, 0b1100, 0b1010).unwrap(), 0b1110);
    assert_eq!(eval!(OP::Xor, 0b1100, 0b1010).unwrap(), 0b0110);
    assert_eq!(Expr::from((OP::Neg, 5)).eval_int(&s).unwrap(), -5);
    assert_eq!(Expr::from((OP::Not, 0)).eval_int(&s).unwrap(), -1);

    assert_eq!(eval!(OP::Mod, -57, 0).unwrap_err(), EvalError::Illegal(IllegalReason::DivideByZero));
    assert_eq!(eval!(OP::SHL, 1, 1000).unwrap_err(), EvalError::Illegal(IllegalReason::IntegerTooLarge));
    assert_eq!(eval!(OP::SHL, 1, -1).unwrap_err(), EvalError::Illegal(IllegalReason::IntegerTooLarge));
    assert_eq!(Expr::from(1.5f64).eval_int(&s).unwrap_err(), EvalError::Illegal(IllegalReason::NotInteger(ValueType::Float)));
}

#[test]
fn test_expr_eval_symbols() {
    let mut raw = std::collections::HashMap::new();
    raw.insert("foo".to_owned(), Some(Expr::from(654)));
    raw.insert("lbl".to_owned(), None);
    raw.insert("a".to_owned(), Some(Expr::from((OP::Add, Expr::ident("b"), 1))));
    raw.insert("b".to_owned(), Some(Expr::ident("a")));
    raw.insert("twice".to_owned(), Some(Expr::from((OP::Add, Expr::ident("foo"), Expr::ident("foo")))));
    let s = TestSymbols(raw);

    assert_eq!(Expr::ident("foo").eval_int(&s).unwrap(), 654);
    assert_eq!(Expr::from((OP::Add, Expr::ident("foo"), 10)).eval_int(&s).unwrap(), 664);
    assert_eq!(Expr::ident("twice").eval_int(&s).unwrap(), 1308);
    assert_eq!(Expr::ident("nope").eval_int(&s).unwrap_err(), EvalError::UndefinedSymbol("nope".into()));
    assert_eq!(Expr::ident("lbl").eval_int(&s).unwrap_err(), EvalError::Unresolved("lbl".into()));
    assert_eq!(Expr::ident("a").eval_int(&s).unwrap_err(), EvalError::Illegal(IllegalReason::CyclicDependency));

    // illegal failures take priority over undefined symbols
    assert_eq!(Expr::from((OP::Add, Expr::ident("nope"), (OP::Div, 1, 0))).eval_int(&s).unwrap_err(), EvalError::Illegal(IllegalReason::DivideByZero));
}

#[test]
fn test_expr_inspect() {
    let e = Expr::from(12u64);
    assert_eq!(e.as_value(), Some(&Value::from(12u64)));
    assert_eq!(e.as_value().unwrap().get_type(), ValueType::Integer);
    assert!(Expr::ident("x").as_value().is_none());
    assert_eq!(Expr::ident("x").data(), &ExprData::Ident("x".into()));
    match Expr::from((OP::Neg, 3)).data() {
        ExprData::Uneval { op, left, right } => {
            assert_eq!(*op, OP::Neg);
            assert_eq!(left.as_value(), Some(&Value::from(3)));
            assert!(right.is_none());
        }
        data => panic!("{:?}", data),
    }
}
