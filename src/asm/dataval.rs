//! Literal values attached to raw data bytecodes.

use std::io::{self, Write};

use super::expr::Expr;
use crate::common::util::Indent;

/// A single literal data value.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Empty,
    Expr(Expr),
    Str(String),
}
impl DataValue {
    pub fn new_expr(expr: Expr) -> Self {
        DataValue::Expr(expr)
    }
    pub fn new_string(s: String) -> Self {
        DataValue::Str(s)
    }
}

/// An ordered list of data values.
/// Order is significant: it is the order the values are laid out in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataValueList {
    vals: Vec<DataValue>,
}
impl DataValueList {
    pub fn new() -> Self {
        Self { vals: vec![] }
    }

    /// Adds a value to the end of the list.
    pub fn append(&mut self, val: DataValue) -> &DataValue {
        self.vals.push(val);
        &self.vals[self.vals.len() - 1]
    }
    /// Destroys every value (and its owned payload), leaving the list empty.
    pub fn delete_all(&mut self) {
        self.vals.clear();
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &DataValue> {
        self.vals.iter()
    }

    pub fn print(&self, f: &mut dyn Write, indent: usize) -> io::Result<()> {
        let ind = Indent(indent);
        for val in self.vals.iter() {
            match val {
                DataValue::Empty => writeln!(f, "{}Empty", ind)?,
                DataValue::Expr(expr) => writeln!(f, "{}Expr={}", ind, expr)?,
                DataValue::Str(s) => writeln!(f, "{}String={}", ind, s)?,
            }
        }
        Ok(())
    }
}
impl From<Vec<DataValue>> for DataValueList {
    fn from(vals: Vec<DataValue>) -> Self {
        Self { vals }
    }
}
impl IntoIterator for DataValueList {
    type Item = DataValue;
    type IntoIter = std::vec::IntoIter<DataValue>;
    fn into_iter(self) -> Self::IntoIter {
        self.vals.into_iter()
    }
}

#[test]
fn test_dataval_list() {
    use super::expr::OP;

    let mut list = DataValueList::new();
    assert!(list.is_empty());
    assert_eq!(list.append(DataValue::new_expr(5.into())), &DataValue::Expr(5.into()));
    list.append(DataValue::new_string("hi there".into()));
    list.append(DataValue::Empty);
    list.append(DataValue::new_expr((OP::Add, Expr::ident("x"), 1).into()));
    assert_eq!(list.len(), 4);

    let mut out = vec![];
    list.print(&mut out, 2).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "  Expr=5\n  String=hi there\n  Empty\n  Expr=x+1\n");

    list.delete_all();
    assert!(list.is_empty());
    assert_eq!(list.iter().count(), 0);
}
