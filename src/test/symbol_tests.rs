use super::*;
use crate::asm::symrec::{DataSlot, DumpContext, SymType, SymValue, Label};

fn print_symbol(symbols: &SymbolTable, sections: &Sections, arch: &dyn ArchBytecodes, objfmt: &dyn ObjectFormat) -> String {
    let ctx = DumpContext { sections, arch, objfmt };
    let mut out = vec![];
    symbols.print_all(&mut out, 0, &ctx).unwrap();
    String::from_utf8(out).unwrap()
}
fn visit_names(symbols: &SymbolTable) -> Vec<String> {
    let mut names = vec![];
    assert!(symbols.traverse(&mut names, |sym, names| { names.push(sym.name().to_owned()); true }));
    names
}

#[test]
fn test_undefined_reported_once() {
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    s.use_symbol("foo", &loc(3));
    s.use_symbol("bar", &loc(5));
    s.use_symbol("foo", &loc(7));
    s.use_symbol("baz", &loc(2));
    s.define_equ("baz", 1.into(), &loc(10), &mut diags);
    s.use_symbol("foo", &loc(12));
    assert!(diags.is_empty());

    s.finalize_parser_pass(&mut diags);
    let diags = diags.into_vec();
    assert_eq!(diags, vec![
        Diagnostic { kind: DiagnosticKind::UndefinedSymbol { name: "bar".into() }, severity: Severity::Error, loc: loc(5) },
        Diagnostic { kind: DiagnosticKind::UndefinedSymbol { name: "foo".into() }, severity: Severity::Error, loc: loc(3) },
        Diagnostic { kind: DiagnosticKind::UndefinedSummary, severity: Severity::Note, loc: loc(3) },
    ]);
    assert_eq!(diags[1].to_string(), "test.asm:3: error: undefined symbol `foo' (first use)");
}

#[test]
fn test_no_undefined_no_summary() {
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    s.use_symbol("a", &loc(1));
    s.declare("a", Visibility::Extern, None, &loc(2), &NullObjectFormat, &mut diags);
    s.finalize_parser_pass(&mut diags);
    assert!(diags.is_empty());
}

#[test]
fn test_duplicate_equ() {
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let a = s.define_equ("x", 1.into(), &loc(4), &mut diags);
    let b = s.define_equ("x", 2.into(), &loc(9), &mut diags);
    assert_eq!(a, b);
    assert_eq!(diags.as_slice(), &[Diagnostic {
        kind: DiagnosticKind::DuplicateDefinition { name: "x".into(), first_line: 4 },
        severity: Severity::Error,
        loc: loc(9),
    }]);
    assert_eq!(diags.as_slice()[0].to_string(), "test.asm:9: error: duplicate definition of `x'; first defined on line 4");
    assert_eq!(s.get_equ(a), Some(&Expr::from(1)));
    assert_eq!(s.get(a).unwrap().loc(), &loc(4));

    // labels cannot redefine equs either
    let sects = &mut Sections::new();
    let text = sects.get_or_create(".text");
    s.define_label("x", text, None, true, &loc(11), &mut diags);
    assert_eq!(diags.len(), 2);
    assert_eq!(s.get(a).unwrap().sym_type(), SymType::Equ);
}

#[test]
fn test_extern_common_conflict() {
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();

    let e = s.declare("e", Visibility::Extern, MockObjFmt::data(1), &loc(1), &objfmt, &mut diags);
    assert!(diags.is_empty());
    s.declare("e", Visibility::Common, MockObjFmt::data(2), &loc(2), &objfmt, &mut diags);
    assert_eq!(diags.as_slice()[0].kind, DiagnosticKind::DuplicateDefinition { name: "e".into(), first_line: 1 });
    assert_eq!(objfmt.deleted(), vec![(Visibility::Common, 2)]);
    let sym = s.get(e).unwrap();
    assert_eq!(sym.visibility().to_string(), "Extern");
    assert_eq!(sym.decl_data(DataSlot::CommonExtern).unwrap().downcast_ref::<u32>(), Some(&1));

    let c = s.declare("c", Visibility::Common, MockObjFmt::data(3), &loc(3), &objfmt, &mut diags);
    s.declare("c", Visibility::Extern, MockObjFmt::data(4), &loc(4), &objfmt, &mut diags);
    assert_eq!(diags.len(), 2);
    assert_eq!(objfmt.deleted(), vec![(Visibility::Common, 2), (Visibility::Extern, 4)]);
    assert_eq!(s.get_visibility(c).unwrap().to_string(), "Common");
    assert!(s.get(c).unwrap().status().get_defined());
}

#[test]
fn test_extern_redeclare() {
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();

    let id = s.declare("puts", Visibility::Extern, None, &loc(1), &objfmt, &mut diags);
    s.declare("puts", Visibility::Extern, None, &loc(2), &objfmt, &mut diags);
    assert!(diags.is_empty());
    assert_eq!(s.get(id).unwrap().loc(), &loc(2));

    // a replaced payload goes back to the object format rather than being lost
    s.declare("puts", Visibility::Extern, MockObjFmt::data(5), &loc(3), &objfmt, &mut diags);
    s.declare("puts", Visibility::Extern, MockObjFmt::data(6), &loc(4), &objfmt, &mut diags);
    assert!(diags.is_empty());
    assert_eq!(objfmt.deleted(), vec![(Visibility::Extern, 5)]);
    assert_eq!(s.get(id).unwrap().decl_data(DataSlot::CommonExtern).unwrap().downcast_ref::<u32>(), Some(&6));

    // global on top of extern is fine and uses its own slot
    s.declare("puts", Visibility::Global, MockObjFmt::data(7), &loc(5), &objfmt, &mut diags);
    assert!(diags.is_empty());
    let sym = s.get(id).unwrap();
    assert_eq!(sym.visibility().to_string(), "Global,Extern");
    assert!(sym.has_decl_data(DataSlot::Global) && sym.has_decl_data(DataSlot::CommonExtern));
}

#[test]
fn test_declare_after_define() {
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");

    // declaring first and defining later is fine
    let main = s.declare("main", Visibility::Global, MockObjFmt::data(1), &loc(1), &objfmt, &mut diags);
    s.define_label("main", text, None, true, &loc(2), &mut diags);
    assert!(diags.is_empty());
    assert_eq!(s.get(main).unwrap().label(), Some(Label { section: text, preceding: None }));
    assert_eq!(s.get(main).unwrap().status().to_string(), "Defined");

    // but a concretely defined symbol cannot be declared afterwards
    let other = s.define_label("other", text, None, true, &loc(3), &mut diags);
    s.declare("other", Visibility::Global, MockObjFmt::data(2), &loc(4), &objfmt, &mut diags);
    assert_eq!(diags.as_slice()[0].kind, DiagnosticKind::DuplicateDefinition { name: "other".into(), first_line: 3 });
    assert_eq!(objfmt.deleted(), vec![(Visibility::Global, 2)]);
    assert!(s.get_visibility(other).unwrap().is_local());
    s.declare("main", Visibility::Extern, MockObjFmt::data(3), &loc(5), &objfmt, &mut diags);
    assert_eq!(diags.len(), 2);
    assert_eq!(objfmt.deleted(), vec![(Visibility::Global, 2), (Visibility::Extern, 3)]);

    // extern counts as a definition
    s.declare("ext", Visibility::Extern, None, &loc(6), &objfmt, &mut diags);
    s.define_label("ext", text, None, true, &loc(7), &mut diags);
    assert_eq!(diags.as_slice()[2].kind, DiagnosticKind::DuplicateDefinition { name: "ext".into(), first_line: 6 });
    assert_eq!(s.get(s.lookup("ext").unwrap()).unwrap().value(), &SymValue::Unknown);
}

#[test]
fn test_delete_all() {
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");
    let bc = sects.get_mut(text).unwrap().bcs.append(Bytecode::new_reserve(1.into(), 1, loc(1)));

    s.define_equ("k", (OP::Mul, Expr::ident("j"), 2).into(), &loc(1), &mut diags);
    s.declare("l", Visibility::Global, MockObjFmt::data(10), &loc(2), &objfmt, &mut diags);
    s.define_label("l", text, bc, true, &loc(3), &mut diags);
    s.declare("e", Visibility::Extern, MockObjFmt::data(11), &loc(4), &objfmt, &mut diags);
    s.declare("c", Visibility::Common, MockObjFmt::data(12), &loc(5), &objfmt, &mut diags);
    s.declare("g", Visibility::Global, MockObjFmt::data(13), &loc(6), &objfmt, &mut diags);
    s.declare("g", Visibility::Extern, MockObjFmt::data(14), &loc(7), &objfmt, &mut diags);
    s.use_symbol("u", &loc(8));
    assert!(diags.is_empty());
    assert_eq!(s.len(), 6);

    s.delete_all(&objfmt);
    let mut deleted = objfmt.deleted();
    deleted.sort_by_key(|x| x.1);
    assert_eq!(deleted, vec![
        (Visibility::Global, 10), (Visibility::Extern, 11), (Visibility::Common, 12),
        (Visibility::Global, 13), (Visibility::Extern, 14),
    ]);
    assert!(s.is_empty());
    assert_eq!(s.lookup("k"), None);
    assert!(visit_names(&s).is_empty());
    s.finalize_parser_pass(&mut diags);
    assert!(diags.is_empty());

    s.delete_all(&objfmt);
    assert_eq!(objfmt.deleted().len(), 5);
}

#[test]
fn test_not_in_table() {
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");

    let a = s.define_label("$", text, None, false, &loc(1), &mut diags);
    let b = s.define_label("$", text, None, false, &loc(2), &mut diags);
    assert_ne!(a, b);
    assert!(diags.is_empty());
    assert_eq!(s.lookup("$"), None);
    assert!(s.is_empty());
    assert!(visit_names(&s).is_empty());
    assert!(s.get(a).unwrap().status().get_notintable());
    assert_eq!(s.get_name(b), Some("$"));

    s.delete(a, &objfmt);
    assert!(s.get(a).is_none());
    assert!(s.get(b).is_some());

    // table symbols are only destroyed by delete_all
    let t = s.define_label("t", text, None, true, &loc(3), &mut diags);
    s.delete(t, &objfmt);
    assert_eq!(s.get_name(t), Some("t"));

    s.delete_all(&objfmt);
    assert!(s.get(t).is_none());
    assert!(s.get(b).is_some());
    s.delete(b, &objfmt);
    assert!(s.get(b).is_none());
}

#[test]
fn test_traverse_order_and_stop() {
    let mut s = SymbolTable::new();
    for (i, name) in ["delta", "alpha", "charlie", "bravo"].iter().enumerate() {
        s.use_symbol(name, &loc(i + 1));
    }
    assert_eq!(visit_names(&s), vec!["alpha", "bravo", "charlie", "delta"]);

    let mut count = 0;
    assert!(!s.traverse(&mut count, |sym, count| {
        *count += 1;
        sym.name() != "bravo"
    }));
    assert_eq!(count, 2);
}

#[test]
fn test_int_value() {
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");

    let a = s.define_equ("a", (OP::Add, Expr::ident("b"), 1).into(), &loc(1), &mut diags);
    let b = s.define_equ("b", (OP::SHL, 1, 4).into(), &loc(2), &mut diags);
    let l = s.define_label("l", text, None, true, &loc(3), &mut diags);
    let c = s.define_equ("c", (OP::Sub, Expr::ident("l"), 1).into(), &loc(4), &mut diags);
    let d = s.define_equ("d", Expr::ident("nowhere"), &loc(5), &mut diags);
    let u = s.use_symbol("u", &loc(6));

    assert_eq!(s.get_int_value(a, false, &sects).unwrap(), 17);
    assert_eq!(s.get_int_value(b, true, &sects).unwrap(), 16);
    assert_eq!(s.get_int_value(l, false, &sects), None);
    assert_eq!(s.get_int_value(l, true, &sects), None);
    assert_eq!(s.get_int_value(c, true, &sects), None);
    assert_eq!(s.get_int_value(d, true, &sects), None);
    assert_eq!(s.get_int_value(u, true, &sects), None);
}

#[test]
fn test_print() {
    let arch = NoExtensions;
    let objfmt = MockObjFmt::default();
    let mut s = SymbolTable::new();
    let mut diags = Diagnostics::new();
    let mut sects = Sections::new();
    let text = sects.get_or_create(".text");
    let bc = sects.get_mut(text).unwrap().bcs.append(Bytecode::new_reserve(2.into(), 1, loc(1)));

    s.declare("lbl", Visibility::Global, MockObjFmt::data(7), &loc(1), &objfmt, &mut diags);
    s.define_label("lbl", text, bc, true, &loc(2), &mut diags);
    s.define_equ("eq", (OP::Add, Expr::ident("lbl"), 4).into(), &loc(3), &mut diags);
    s.use_symbol("eq", &loc(4));
    s.declare("ext", Visibility::Extern, None, &loc(5), &objfmt, &mut diags);
    s.use_symbol("nope", &SourceLoc::default());

    assert_eq!(print_symbol(&s, &sects, &arch, &objfmt), concat!(
        "Symbol `eq'\n",
        " _EQU_\n",
        " Expn=lbl+4\n",
        " Status=Used,Defined,Valued\n",
        " Visibility=Local\n",
        " Filename=\"test.asm\" Line Number=3\n",
        "Symbol `ext'\n",
        " -Unknown (Common/Extern)-\n",
        " Status=Defined\n",
        " Visibility=Extern\n",
        " Common/Extern object format-specific data:\n",
        "  data=none\n",
        " Filename=\"test.asm\" Line Number=5\n",
        "Symbol `lbl'\n",
        " _Label_\n",
        " Section:\n",
        "  Name=.text\n",
        " Preceding bytecode:\n",
        "  _Reserve_\n",
        "  Num Items=2\n",
        "  Item Size=1\n",
        "  Multiple=nil (1)\n",
        "  Length=unknown\n",
        "  Filename=\"test.asm\" Line Number=1\n",
        "  Offset=unknown\n",
        " Status=Defined\n",
        " Visibility=Global\n",
        " Global object format-specific data:\n",
        "  data=7\n",
        " Filename=\"test.asm\" Line Number=2\n",
        "Symbol `nope'\n",
        " -Unknown (Common/Extern)-\n",
        " Status=Used\n",
        " Visibility=Local\n",
        " Filename=\"(NULL)\" Line Number=0\n",
    ));
}
