#![allow(dead_code)]

use pexe_ir::{
    module::FuncRef, Constant, GlobalVariableData, Linkage, ModuleBuilder, Signature, Type,
};
use pexe_verifier::VerificationReport;

pub fn has_message(report: &VerificationReport, needle: &str) -> bool {
    report
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains(needle))
}

/// Defines the external `_start` entry so modules under test pass the
/// entry-point rule.
pub fn add_start(builder: &mut ModuleBuilder) -> FuncRef {
    let func = builder.declare_function(Signature::new(
        "_start",
        Linkage::External,
        &[],
        Type::Void,
    ));
    let mut fb = builder.func_builder(func);
    fb.append_block();
    fb.ret(None);
    func
}

pub fn module_with_start() -> ModuleBuilder {
    let mut builder = ModuleBuilder::new();
    add_start(&mut builder);
    builder
}

/// Declares an internal function and opens its entry block.
pub fn define_internal(
    builder: &mut ModuleBuilder,
    name: &str,
    params: &[Type],
    ret_ty: Type,
) -> FuncRef {
    let func = builder.declare_function(Signature::new(name, Linkage::Internal, params, ret_ty));
    let mut fb = builder.func_builder(func);
    fb.append_block();
    func
}

/// Declares an intrinsic; intrinsics have no body.
pub fn declare_intrinsic(
    builder: &mut ModuleBuilder,
    name: &str,
    params: &[Type],
    ret_ty: Type,
) -> FuncRef {
    builder.declare_function(Signature::new(name, Linkage::External, params, ret_ty))
}

/// A flattened byte-array initializer.
pub fn flat_bytes(builder: &ModuleBuilder, bytes: &[u8]) -> (Type, Constant) {
    let ty = builder
        .ctx()
        .with_ty_store_mut(|s| s.make_array(Type::I8, bytes.len()));
    (
        ty,
        Constant::DataArray {
            bytes: bytes.to_vec(),
            ty,
        },
    )
}

/// An internal global with a flattened initializer.
pub fn add_flat_global(builder: &mut ModuleBuilder, symbol: &str) -> pexe_ir::GlobalVariable {
    let (ty, init) = flat_bytes(builder, b"data");
    builder.make_global(GlobalVariableData::with_init(
        symbol,
        ty,
        Linkage::Internal,
        init,
    ))
}
