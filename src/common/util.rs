use std::fmt;

/// Displays as `n` spaces - one per nesting level of a debug dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Indent(pub(crate) usize);
impl Indent {
    /// Gets the indentation one level deeper.
    pub(crate) fn next(self) -> Self {
        Indent(self.0 + 1)
    }
}
impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:width$}", "", width = self.0)
    }
}
#[test]
fn test_indent() {
    assert_eq!(format!("{}x", Indent(0)), "x");
    assert_eq!(format!("{}x", Indent(3)), "   x");
    assert_eq!(format!("{}x", Indent(1).next().next()), "   x");
}

pub(crate) struct Punctuated<'a, T> {
    vals: &'a [T],
    sep: &'static str,
    empty: &'static str,
}
impl<'a, T> Punctuated<'a, T> {
    /// Joins `vals` with `sep`. An empty list displays as `empty`.
    pub(crate) fn join_or(vals: &'a [T], sep: &'static str, empty: &'static str) -> Self {
        Self { vals, sep, empty }
    }
}
impl<'a, T: fmt::Display> fmt::Display for Punctuated<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.vals {
            [] => write!(f, "{}", self.empty),
            [first, rest @ ..] => {
                write!(f, "{}", first)?;
                for x in rest {
                    write!(f, "{}{}", self.sep, x)?;
                }
                Ok(())
            }
        }
    }
}
#[test]
fn test_comma_chain() {
    assert_eq!(format!("{}", Punctuated::join_or(&[] as &[&str], ",", "None")), "None");
    assert_eq!(format!("{}", Punctuated::join_or(&["Used"], ",", "None")), "Used");
    assert_eq!(format!("{}", Punctuated::join_or(&["Used", "Defined"], ",", "None")), "Used,Defined");
    assert_eq!(format!("{}", Punctuated::join_or(&[8, 7, 5, 2, 1], ", ", "")), "8, 7, 5, 2, 1");
}
