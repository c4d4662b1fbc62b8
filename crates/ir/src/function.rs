use smallvec::SmallVec;

use crate::{
    dfg::DataFlowGraph,
    layout::Layout,
    linkage::{CallConv, Visibility},
    module::ModuleCtx,
    Linkage, Type,
};

#[derive(Debug)]
pub struct Function {
    /// Signature of the function.
    pub sig: Signature,
    pub arg_values: SmallVec<[crate::ValueId; 8]>,

    pub dfg: DataFlowGraph,
    pub layout: Layout,

    pub visibility: Visibility,
    pub section: Option<String>,
    pub addr_space: u32,
    pub unnamed_addr: bool,
    /// Explicit alignment; 0 means unspecified.
    pub align: u64,
    pub calling_conv: CallConv,
    pub gc_name: Option<String>,
    /// Attribute strings attached to the function; must be empty in the
    /// stable subset.
    pub attributes: SmallVec<[String; 4]>,
}

impl Function {
    pub fn new(ctx: &ModuleCtx, sig: Signature) -> Self {
        let mut dfg = DataFlowGraph::new(ctx.clone());
        let arg_values = sig
            .params()
            .iter()
            .enumerate()
            .map(|(idx, param_ty)| dfg.make_arg_value(*param_ty, idx))
            .collect();

        Self {
            sig,
            arg_values,
            dfg,
            layout: Layout::default(),
            visibility: Visibility::Default,
            section: None,
            addr_space: 0,
            unnamed_addr: false,
            align: 0,
            calling_conv: CallConv::C,
            gc_name: None,
            attributes: SmallVec::new(),
        }
    }

    pub fn ctx(&self) -> &ModuleCtx {
        &self.dfg.ctx
    }

    /// A function with no body is a declaration.
    pub fn is_declaration(&self) -> bool {
        self.layout.is_empty()
    }

    /// Intrinsics are recognized by name, never defined.
    pub fn is_intrinsic(&self) -> bool {
        self.sig.name().starts_with("llvm.")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the function.
    name: String,

    /// Linkage of the function.
    linkage: Linkage,

    params: SmallVec<[Type; 8]>,
    ret_ty: Type,
}

impl Signature {
    pub fn new(name: &str, linkage: Linkage, params: &[Type], ret_ty: Type) -> Self {
        Self {
            name: name.to_string(),
            linkage,
            params: params.into(),
            ret_ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn ret_ty(&self) -> Type {
        self.ret_ty
    }

    /// The interned function type of this signature.
    pub fn func_ty(&self, ctx: &ModuleCtx) -> Type {
        ctx.with_ty_store_mut(|s| s.make_func(&self.params, self.ret_ty))
    }
}
