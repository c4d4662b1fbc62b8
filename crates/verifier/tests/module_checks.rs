mod common;

use common::*;
use pexe_ir::{
    constant::ConstExpr, global_variable::GlobalVariableData, value::GlobalRef, Constant, Linkage,
    ModuleBuilder, Signature, Type, Visibility,
};
use pexe_verifier::{verify_module, verify_module_only, VerifierConfig};

#[test]
fn valid_module_is_accepted() {
    let mut builder = module_with_start();
    add_flat_global(&mut builder, "bytes");

    let module = builder.build();
    let report = verify_module(&module, &VerifierConfig::default());
    assert!(report.is_ok(), "expected no diagnostics, got {report}");
}

#[test]
fn global_section_attribute_is_rejected() {
    let mut builder = module_with_start();
    let (ty, init) = flat_bytes(&builder, b"xx");
    let mut data = GlobalVariableData::with_init("v", ty, Linkage::Internal, init);
    data.section = Some(".s".to_string());
    builder.make_global(data);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Variable v has disallowed \"section\" attribute"
    ));
}

#[test]
fn thread_local_global_is_rejected() {
    let mut builder = module_with_start();
    let (ty, init) = flat_bytes(&builder, b"xx");
    let mut data = GlobalVariableData::with_init("t", ty, Linkage::Internal, init);
    data.thread_local = true;
    builder.make_global(data);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Variable t has disallowed \"thread_local\" attribute"
    ));
}

#[test]
fn externally_initialized_global_is_rejected() {
    let mut builder = module_with_start();
    let (ty, init) = flat_bytes(&builder, b"xx");
    let mut data = GlobalVariableData::with_init("x", ty, Linkage::Internal, init);
    data.externally_initialized = true;
    builder.make_global(data);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Variable x has disallowed \"externally_initialized\" attribute"
    ));
}

#[test]
fn global_visibility_and_addrspace_and_unnamed_addr() {
    let mut builder = module_with_start();

    let (ty, init) = flat_bytes(&builder, b"aa");
    let mut hidden = GlobalVariableData::with_init("h", ty, Linkage::Internal, init);
    hidden.visibility = Visibility::Hidden;
    builder.make_global(hidden);

    let (ty, init) = flat_bytes(&builder, b"bbb");
    let mut spaced = GlobalVariableData::with_init("s", ty, Linkage::Internal, init);
    spaced.addr_space = 1;
    builder.make_global(spaced);

    let (ty, init) = flat_bytes(&builder, b"cccc");
    let mut unnamed = GlobalVariableData::with_init("u", ty, Linkage::Internal, init);
    unnamed.unnamed_addr = true;
    builder.make_global(unnamed);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Variable h has disallowed visibility: hidden"
    ));
    assert!(has_message(
        &report,
        "Variable s has addrspace attribute (disallowed)"
    ));
    assert!(has_message(
        &report,
        "Variable u has disallowed \"unnamed_addr\" attribute"
    ));
}

#[test]
fn disallowed_linkage_is_named() {
    let mut builder = module_with_start();
    let (ty, init) = flat_bytes(&builder, b"xx");
    builder.make_global(GlobalVariableData::with_init(
        "p",
        ty,
        Linkage::Private,
        init,
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Variable p has disallowed linkage type: private"
    ));
}

#[test]
fn missing_initializer_is_rejected() {
    let mut builder = module_with_start();
    builder.make_global(GlobalVariableData::new("g", Type::I32, Linkage::Internal));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Global variable g has no initializer (disallowed)"
    ));
}

#[test]
fn plain_scalar_initializer_is_not_flattened() {
    let mut builder = module_with_start();
    builder.make_global(GlobalVariableData::with_init(
        "g",
        Type::I32,
        Linkage::Internal,
        Constant::make_imm(99i32),
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Global variable g has non-flattened initializer (disallowed)"
    ));
}

#[test]
fn flattened_initializer_forms_are_accepted() {
    let mut builder = module_with_start();

    // [N x i8] literal and zeroinitializer.
    let bytes = add_flat_global(&mut builder, "bytes");
    let zero_ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_array(Type::I8, 16));
    builder.make_global(GlobalVariableData::with_init(
        "zeros",
        zero_ty,
        Linkage::Internal,
        Constant::AggregateZero(zero_ty),
    ));

    // Relocations, with and without addend.
    builder.make_global(GlobalVariableData::with_init(
        "reloc",
        Type::I32,
        Linkage::Internal,
        Constant::Expr {
            expr: ConstExpr::PtrToInt(GlobalRef::Var(bytes)),
            ty: Type::I32,
        },
    ));
    builder.make_global(GlobalVariableData::with_init(
        "reloc_off",
        Type::I32,
        Linkage::Internal,
        Constant::Expr {
            expr: ConstExpr::Add(
                Box::new(Constant::Expr {
                    expr: ConstExpr::PtrToInt(GlobalRef::Var(bytes)),
                    ty: Type::I32,
                }),
                Box::new(Constant::make_imm(8i32)),
            ),
            ty: Type::I32,
        },
    ));

    // A packed anonymous struct of simple elements.
    let (arr_ty, arr_init) = flat_bytes(&builder, b"body");
    let struct_ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_struct(&[arr_ty, Type::I32], true));
    builder.make_global(GlobalVariableData::with_init(
        "compound",
        struct_ty,
        Linkage::Internal,
        Constant::Struct {
            fields: vec![
                arr_init,
                Constant::Expr {
                    expr: ConstExpr::PtrToInt(GlobalRef::Var(bytes)),
                    ty: Type::I32,
                },
            ],
            ty: struct_ty,
        },
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(report.is_ok(), "expected no diagnostics, got {report}");
}

#[test]
fn degenerate_compound_initializers_are_rejected() {
    let mut builder = module_with_start();

    // Single-field packed struct.
    let (arr_ty, arr_init) = flat_bytes(&builder, b"only");
    let single_ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_struct(&[arr_ty], true));
    builder.make_global(GlobalVariableData::with_init(
        "single",
        single_ty,
        Linkage::Internal,
        Constant::Struct {
            fields: vec![arr_init.clone()],
            ty: single_ty,
        },
    ));

    // Unpacked struct.
    let loose_ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_struct(&[arr_ty, arr_ty], false));
    builder.make_global(GlobalVariableData::with_init(
        "loose",
        loose_ty,
        Linkage::Internal,
        Constant::Struct {
            fields: vec![arr_init.clone(), arr_init.clone()],
            ty: loose_ty,
        },
    ));

    // Named packed struct.
    let named_ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_named_struct("pair", &[arr_ty, arr_ty], true));
    builder.make_global(GlobalVariableData::with_init(
        "named",
        named_ty,
        Linkage::Internal,
        Constant::Struct {
            fields: vec![arr_init.clone(), arr_init],
            ty: named_ty,
        },
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    for symbol in ["single", "loose", "named"] {
        assert!(
            has_message(
                &report,
                &format!("Global variable {symbol} has non-flattened initializer")
            ),
            "{symbol}: {report}"
        );
    }
}

#[test]
fn aliases_are_rejected() {
    let mut builder = module_with_start();
    let gv = add_flat_global(&mut builder, "b");
    let ty = builder.ctx().with_ty_store_mut(|s| s.make_ptr(Type::I32));
    builder.make_alias("a", ty, GlobalRef::Var(gv));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(&report, "Variable a is an alias (disallowed)"));
}

#[test]
fn top_level_inline_asm_is_rejected() {
    let mut builder = module_with_start();
    builder.set_inline_asm("nop");

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Module contains disallowed top-level inline assembly"
    ));
}

#[test]
fn module_without_entry_point_is_rejected() {
    let mut builder = ModuleBuilder::new();
    let helper = define_internal(&mut builder, "helper", &[], Type::Void);
    builder.func_builder(helper).ret(None);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(&report, "Module has no entry point (disallowed)"));
}

#[test]
fn pso_root_variable_is_an_entry_point() {
    let mut builder = ModuleBuilder::new();
    let (ty, init) = flat_bytes(&builder, b"root");
    builder.make_global(GlobalVariableData::with_init(
        "__pnacl_pso_root",
        ty,
        Linkage::External,
        init,
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(report.is_ok(), "expected no diagnostics, got {report}");
}

#[test]
fn two_entry_points_are_rejected() {
    let mut builder = module_with_start();
    let (ty, init) = flat_bytes(&builder, b"root");
    builder.make_global(GlobalVariableData::with_init(
        "__pnacl_pso_root",
        ty,
        Linkage::External,
        init,
    ));

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Module has multiple entry points (disallowed)"
    ));
}

#[test]
fn other_external_symbols_are_rejected() {
    let mut builder = module_with_start();

    // An external variable that is not the pso root.
    let (ty, init) = flat_bytes(&builder, b"xx");
    builder.make_global(GlobalVariableData::with_init(
        "exported",
        ty,
        Linkage::External,
        init,
    ));

    // `__pnacl_pso_root` must be a variable, not a function.
    let func = builder.declare_function(Signature::new(
        "__pnacl_pso_root",
        Linkage::External,
        &[],
        Type::Void,
    ));
    let mut fb = builder.func_builder(func);
    fb.append_block();
    fb.ret(None);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "exported is not a valid external symbol (disallowed)"
    ));
    assert!(has_message(
        &report,
        "__pnacl_pso_root is not a valid external symbol (disallowed)"
    ));
}

#[test]
fn function_gc_and_align_attributes_are_rejected() {
    let mut builder = module_with_start();

    let with_gc = define_internal(&mut builder, "f", &[], Type::Void);
    builder.func_builder(with_gc).ret(None);
    builder.func_mut(with_gc).gc_name = Some("x".to_string());

    let with_align = define_internal(&mut builder, "g", &[], Type::Void);
    builder.func_builder(with_align).ret(None);
    builder.func_mut(with_align).align = 1;

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Function f has disallowed \"gc\" attribute"
    ));
    assert!(has_message(
        &report,
        "Function g has disallowed \"align\" attribute"
    ));
}

#[test]
fn function_attributes_and_calling_convention_are_rejected() {
    let mut builder = module_with_start();

    let with_attrs = define_internal(&mut builder, "f", &[], Type::Void);
    builder.func_builder(with_attrs).ret(None);
    builder
        .func_mut(with_attrs)
        .attributes
        .push("noreturn".to_string());

    let with_conv = define_internal(&mut builder, "g", &[], Type::Void);
    builder.func_builder(with_conv).ret(None);
    builder.func_mut(with_conv).calling_conv = pexe_ir::CallConv::Fast;

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(
        &report,
        "Function f has disallowed attributes: noreturn"
    ));
    assert!(has_message(
        &report,
        "Function g has disallowed calling convention: 8"
    ));
}

#[test]
fn function_type_rules_are_enforced() {
    let mut builder = module_with_start();

    // i1 is not a valid parameter type.
    let bad_param = define_internal(&mut builder, "takes_i1", &[Type::I1], Type::Void);
    builder.func_builder(bad_param).ret(None);

    let report = verify_module(&builder.build(), &VerifierConfig::default());
    assert!(has_message(&report, "Function takes_i1 has disallowed type:"));
}

#[test]
fn declarations_require_streaming_mode() {
    let mut builder = module_with_start();
    builder.declare_function(Signature::new("later", Linkage::Internal, &[], Type::Void));

    let strict = verify_module(&builder.module, &VerifierConfig::default());
    assert!(has_message(
        &strict,
        "Function later is declared but not defined (disallowed)"
    ));

    let streaming = VerifierConfig {
        streaming_mode: true,
        ..VerifierConfig::default()
    };
    let relaxed = verify_module(&builder.module, &streaming);
    assert!(relaxed.is_ok(), "expected no diagnostics, got {relaxed}");
}

#[test]
fn named_metadata_is_gated_on_the_debug_flag() {
    let mut builder = module_with_start();
    builder.add_named_metadata("llvm.dbg.cu", vec![]);
    builder.add_named_metadata("llvm.module.flags", vec![]);

    let strict = verify_module(&builder.module, &VerifierConfig::default());
    assert!(has_message(
        &strict,
        "Named metadata node llvm.dbg.cu is disallowed"
    ));
    assert!(has_message(
        &strict,
        "Named metadata node llvm.module.flags is disallowed"
    ));

    let debug = VerifierConfig {
        allow_debug_metadata: true,
        ..VerifierConfig::default()
    };
    let relaxed = verify_module(&builder.module, &debug);
    assert!(!has_message(
        &relaxed,
        "Named metadata node llvm.dbg.cu is disallowed"
    ));
    assert!(has_message(
        &relaxed,
        "Named metadata node llvm.module.flags is disallowed"
    ));
}

#[test]
fn report_reset_clears_diagnostics() {
    let builder = ModuleBuilder::new();
    let module = builder.build();

    let mut report = verify_module_only(&module, &VerifierConfig::default());
    assert!(report.has_errors());

    report.reset();
    assert!(report.is_ok());
    assert!(report.diagnostics.is_empty());
}

#[test]
fn max_diagnostics_bounds_the_report() {
    let mut builder = ModuleBuilder::new();
    for index in 0..8 {
        builder.make_global(GlobalVariableData::new(
            format!("g{index}"),
            Type::I32,
            Linkage::Internal,
        ));
    }

    let cfg = VerifierConfig {
        max_diagnostics: 3,
        ..VerifierConfig::default()
    };
    let report = verify_module(&builder.build(), &cfg);
    assert_eq!(report.diagnostics.len(), 3);
}
