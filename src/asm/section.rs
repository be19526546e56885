//! Sections: named owners of bytecode lists.

use std::io::{self, Write};

use super::arch::ArchBytecodes;
use super::bytecode::{BytecodeList, BytecodeId, Bytecode};
use crate::common::util::Indent;

/// A named section holding its bytecodes in program order.
#[derive(Debug)]
pub struct Section {
    name: String,
    /// The content of the section.
    pub bcs: BytecodeList,
}
impl Section {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), bcs: BytecodeList::new() }
    }
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes the section header and, if `with_bcs` is set, all of its bytecodes.
    pub fn print(&self, f: &mut dyn Write, indent: usize, with_bcs: bool, arch: &dyn ArchBytecodes) -> io::Result<()> {
        writeln!(f, "{}Name={}", Indent(indent), self.name)?;
        if with_bcs {
            writeln!(f, "{}Bytecodes:", Indent(indent))?;
            self.bcs.print_all(f, indent + 1, arch)?;
        }
        Ok(())
    }
}

/// A handle to a section in `Sections`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SectionId(usize);

/// All sections of a translation unit, in creation order.
///
/// Sections are never removed individually, so handles (and labels that hold them) stay valid for the whole translation.
#[derive(Debug, Default)]
pub struct Sections {
    raw: Vec<Section>,
}
impl Sections {
    pub fn new() -> Self {
        Self { raw: vec![] }
    }

    /// Gets the section with the given name, creating it (at the end) if it does not exist yet.
    pub fn get_or_create(&mut self, name: &str) -> SectionId {
        match self.find(name) {
            Some(id) => id,
            None => {
                self.raw.push(Section::new(name));
                SectionId(self.raw.len() - 1)
            }
        }
    }
    pub fn find(&self, name: &str) -> Option<SectionId> {
        self.raw.iter().position(|s| s.name == name).map(SectionId)
    }

    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.raw.get(id.0)
    }
    pub fn get_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.raw.get_mut(id.0)
    }
    /// Gets a bytecode within a section.
    pub fn bytecode(&self, sect: SectionId, bc: BytecodeId) -> Option<&Bytecode> {
        self.get(sect).and_then(|s| s.bcs.get(bc))
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.raw.iter().enumerate().map(|(i, s)| (SectionId(i), s))
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.raw.iter_mut()
    }
}

#[test]
fn test_sections() {
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");
    let data = sects.get_or_create(".data");
    assert_ne!(text, data);
    assert_eq!(sects.get_or_create(".text"), text);
    assert_eq!(sects.len(), 2);
    assert_eq!(sects.get(data).unwrap().name(), ".data");
    assert_eq!(sects.find(".bss"), None);
    assert_eq!(sects.iter().map(|(_, s)| s.name()).collect::<Vec<_>>(), vec![".text", ".data"]);
}
