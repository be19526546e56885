use crate::asm::*;
use crate::asm::bytecode::EXTENDED_BASE;
use crate::common::*;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

fn loc(line_num: usize) -> SourceLoc {
    SourceLoc::new("test.asm", line_num)
}

fn dump_string(sess: &Session) -> String {
    let mut out = vec![];
    sess.dump(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// The one extended bytecode kind of `MockArch`: an instruction of known length.
const MOCK_INSN: u8 = EXTENDED_BASE;

struct MockInsn {
    len: u64,
    imm: Option<ImmVal>,
    ea: Option<EffAddr>,
}

/// An architecture with a single extended kind which counts what was done to its payloads.
#[derive(Default, Clone)]
struct MockArch {
    deleted: Rc<Cell<usize>>,
    finalized: Rc<Cell<usize>>,
}
impl MockArch {
    fn insn(len: u64, line_num: usize) -> Bytecode {
        Bytecode::new_extended(MOCK_INSN, Box::new(MockInsn { len, imm: None, ea: None }), loc(line_num))
    }
}
impl ArchBytecodes for MockArch {
    fn type_max(&self) -> u8 {
        MOCK_INSN + 1
    }
    fn delete(&self, tag: u8, payload: Box<dyn Any>) {
        assert_eq!(tag, MOCK_INSN);
        assert!(payload.downcast::<MockInsn>().is_ok());
        self.deleted.set(self.deleted.get() + 1);
    }
    fn print(&self, f: &mut dyn Write, indent: usize, _: u8, payload: &dyn Any) -> io::Result<()> {
        let insn = payload.downcast_ref::<MockInsn>().unwrap();
        writeln!(f, "{:width$}_Mock_ Len={}", "", insn.len, width = indent)
    }
    fn finalize(&self, _: u8, payload: &mut dyn Any) -> Option<u64> {
        self.finalized.set(self.finalized.get() + 1);
        let insn = payload.downcast_mut::<MockInsn>()?;
        let operands = insn.imm.as_ref().map_or(0, |imm| imm.len as u64) + insn.ea.as_ref().map_or(0, |ea| ea.len as u64);
        Some(insn.len + operands)
    }
}

/// An object format whose declaration data is a plain `u32`, recording every destroyed value.
#[derive(Default, Clone)]
struct MockObjFmt {
    deleted: Rc<RefCell<Vec<(Visibility, u32)>>>,
}
impl MockObjFmt {
    fn data(val: u32) -> Option<objfmt::DeclData> {
        Some(Box::new(val))
    }
    fn deleted(&self) -> Vec<(Visibility, u32)> {
        self.deleted.borrow().clone()
    }
}
impl ObjectFormat for MockObjFmt {
    fn declare_data_delete(&self, vis: Visibility, data: objfmt::DeclData) {
        let val = *data.downcast::<u32>().unwrap();
        self.deleted.borrow_mut().push((vis, val));
    }
    fn declare_data_print(&self, f: &mut dyn Write, indent: usize, _: Visibility, data: Option<&dyn Any>) -> io::Result<()> {
        match data.and_then(|d| d.downcast_ref::<u32>()) {
            Some(v) => writeln!(f, "{:width$}data={}", "", v, width = indent),
            None => writeln!(f, "{:width$}data=none", "", width = indent),
        }
    }
}

fn mock_session() -> (Session, MockArch, MockObjFmt) {
    let arch = MockArch::default();
    let objfmt = MockObjFmt::default();
    let sess = Session::new(Box::new(arch.clone()), Box::new(objfmt.clone()), Default::default());
    (sess, arch, objfmt)
}

mod symbol_tests;
