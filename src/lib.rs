#![forbid(unsafe_code)]

//! `asmcore` holds the in-memory representation an assembler builds while parsing:
//! the bytecode lists of each section and the symbol table, together with the passes that run over them.
//! It contains no parser and no output format; those plug in from outside.
//! 
//! # Example of Usage
//! 
//! ```
//! # use asmcore::asm::*;
//! let mut sess = Session::default();
//! let text = sess.section(".text");
//! 
//! sess.set_location("demo.asm", 1);
//! sess.define_label_here("start", text);
//! let vals = DataValueList::from(vec![DataValue::new_expr(1.into()), DataValue::new_expr(Expr::ident("count"))]);
//! let bc = sess.new_data(vals, 4);
//! sess.append_bytecode(text, bc);
//! 
//! sess.set_location("demo.asm", 2);
//! sess.define_equ("count", 3.into());
//! 
//! sess.set_location("demo.asm", 3);
//! sess.use_symbol("missing");
//! 
//! sess.finalize().unwrap(); // internal errors only
//! let diags = sess.take_diags();
//! assert_eq!(diags.error_count(), 1); // `missing' was never defined
//! 
//! let mut dump = vec![];
//! sess.dump(&mut dump).unwrap();
//! assert!(String::from_utf8(dump).unwrap().contains("Symbol `count'"));
//! 
//! sess.teardown().unwrap();
//! assert!(sess.symbols().is_empty());
//! ```

#[macro_use] extern crate num_derive;

macro_rules! mask {
    ($src:ident : $($mask:ident)|+) => {
        $($src::$mask)|+
    };
    () => { 0 };
}

pub mod asm;
pub mod common;

#[cfg(test)]
mod test;
