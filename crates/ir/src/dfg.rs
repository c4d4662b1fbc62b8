//! Pexe IR data flow graph.

use cranelift_entity::{packed_option::PackedOption, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    constant::ConstExpr,
    inst::{InstData, InstId},
    metadata::{MdKind, MdNodeId},
    module::ModuleCtx,
    value::{GlobalRef, Value, ValueId},
    Immediate, Type,
};

/// An opaque reference to a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub u32);
cranelift_entity::entity_impl!(BlockId);

#[derive(Debug, Clone, Default)]
pub struct Block {}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
pub struct DataFlowGraph {
    pub ctx: ModuleCtx,
    #[doc(hidden)]
    pub blocks: PrimaryMap<BlockId, Block>,
    #[doc(hidden)]
    pub values: PrimaryMap<ValueId, Value>,
    insts: PrimaryMap<InstId, InstData>,
    inst_results: SecondaryMap<InstId, PackedOption<ValueId>>,
    immediates: FxHashMap<Immediate, ValueId>,
    inst_metadata: FxHashMap<InstId, SmallVec<[(MdKind, MdNodeId); 2]>>,
}

impl DataFlowGraph {
    pub fn new(ctx: ModuleCtx) -> Self {
        Self {
            ctx,
            blocks: PrimaryMap::default(),
            values: PrimaryMap::default(),
            insts: PrimaryMap::default(),
            inst_results: SecondaryMap::default(),
            immediates: FxHashMap::default(),
            inst_metadata: FxHashMap::default(),
        }
    }

    pub fn make_block(&mut self) -> BlockId {
        self.blocks.push(Block::new())
    }

    pub fn make_value(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn make_inst(&mut self, inst: InstData) -> InstId {
        self.insts.push(inst)
    }

    pub fn make_imm_value<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        let imm: Immediate = imm.into();
        if let Some(&value) = self.immediates.get(&imm) {
            return value;
        }

        let ty = imm.ty();
        let value = self.make_value(Value::Immediate { imm, ty });
        self.immediates.insert(imm, value);
        value
    }

    /// The address of a global variable, typed as a pointer to its type.
    pub fn make_gv_value(&mut self, gv: crate::global_variable::GlobalVariable) -> ValueId {
        let gv_ty = self.ctx.with_gv_store(|s| s.ty(gv));
        let ty = self.ctx.with_ty_store_mut(|s| s.make_ptr(gv_ty));
        self.make_value(Value::Global {
            gv: GlobalRef::Var(gv),
            ty,
        })
    }

    /// The address of a function, typed as a pointer to `fn_ty`.
    pub fn make_func_addr_value(&mut self, func: crate::module::FuncRef, fn_ty: Type) -> ValueId {
        let ty = self.ctx.with_ty_store_mut(|s| s.make_ptr(fn_ty));
        self.make_value(Value::Global {
            gv: GlobalRef::Func(func),
            ty,
        })
    }

    pub fn make_undef_value(&mut self, ty: Type) -> ValueId {
        self.make_value(Value::Undef { ty })
    }

    pub fn make_null_value(&mut self, ty: Type) -> ValueId {
        self.make_value(Value::Null { ty })
    }

    pub fn make_const_expr_value(&mut self, expr: ConstExpr, ty: Type) -> ValueId {
        self.make_value(Value::ConstExpr { expr, ty })
    }

    pub fn make_vector_const_value(&mut self, ty: Type) -> ValueId {
        self.make_value(Value::VectorConst { ty })
    }

    pub fn make_metadata_value(&mut self, node: MdNodeId) -> ValueId {
        self.make_value(Value::Metadata { node })
    }

    pub fn make_arg_value(&mut self, ty: Type, idx: usize) -> ValueId {
        self.make_value(Value::Arg { ty, idx })
    }

    pub fn inst(&self, inst_id: InstId) -> &InstData {
        &self.insts[inst_id]
    }

    pub fn inst_mut(&mut self, inst_id: InstId) -> &mut InstData {
        &mut self.insts[inst_id]
    }

    pub fn attach_result(&mut self, inst_id: InstId, value_id: ValueId) {
        debug_assert!(self.inst_results[inst_id].is_none());
        self.inst_results[inst_id] = value_id.into();
    }

    pub fn inst_result(&self, inst_id: InstId) -> Option<ValueId> {
        self.inst_results[inst_id].expand()
    }

    pub fn value(&self, value_id: ValueId) -> &Value {
        &self.values[value_id]
    }

    pub fn value_ty(&self, value_id: ValueId) -> Type {
        self.values[value_id].ty()
    }

    /// The immediate behind `value_id`, if it is a constant scalar.
    pub fn value_imm(&self, value_id: ValueId) -> Option<Immediate> {
        match self.values[value_id] {
            Value::Immediate { imm, .. } => Some(imm),
            _ => None,
        }
    }

    pub fn attach_metadata(&mut self, inst_id: InstId, kind: MdKind, node: MdNodeId) {
        self.inst_metadata
            .entry(inst_id)
            .or_default()
            .push((kind, node));
    }

    pub fn inst_metadata(&self, inst_id: InstId) -> &[(MdKind, MdNodeId)] {
        self.inst_metadata
            .get(&inst_id)
            .map(SmallVec::as_slice)
            .unwrap_or(&[])
    }
}
