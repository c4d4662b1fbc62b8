use smallvec::SmallVec;

use crate::{
    dfg::BlockId,
    inst::{ArithFlags, BinaryOp, CastOp, FcmpCond, IcmpCond, InstData, InstId, Opcode},
    linkage::CallConv,
    value::ValueId,
    Function, Immediate, Type,
};

/// Appends blocks and instructions to a function body, assigning result
/// values as the dialect defines them.
pub struct FunctionBuilder<'a> {
    pub func: &'a mut Function,
    cur: Option<BlockId>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(func: &'a mut Function) -> Self {
        let cur = func.layout.iter_block().last();
        Self { func, cur }
    }

    pub fn append_block(&mut self) -> BlockId {
        let block = self.func.dfg.make_block();
        self.func.layout.append_block(block);
        if self.cur.is_none() {
            self.cur = Some(block);
        }
        block
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.cur = Some(block);
    }

    pub fn arg(&self, idx: usize) -> ValueId {
        self.func.arg_values[idx]
    }

    pub fn imm<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        self.func.dfg.make_imm_value(imm)
    }

    pub fn undef(&mut self, ty: Type) -> ValueId {
        self.func.dfg.make_undef_value(ty)
    }

    /// Appends `data` to the current block; creates a result value of
    /// `result_ty` when given.
    pub fn insert_inst(&mut self, data: InstData, result_ty: Option<Type>) -> (InstId, Option<ValueId>) {
        let block = self.cur.expect("no block to insert into");
        let inst = self.func.dfg.make_inst(data);
        self.func.layout.append_inst(block, inst);

        let result = result_ty.map(|ty| {
            let value = self
                .func
                .dfg
                .make_value(crate::value::Value::Inst { inst, ty });
            self.func.dfg.attach_result(inst, value);
            value
        });
        (inst, result)
    }

    pub fn binary(&mut self, code: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary_with_flags(code, lhs, rhs, ArithFlags::default())
    }

    pub fn binary_with_flags(
        &mut self,
        code: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        flags: ArithFlags,
    ) -> ValueId {
        let ty = self.func.dfg.value_ty(lhs);
        let (_, result) = self.insert_inst(
            InstData::Binary {
                code,
                args: [lhs, rhs],
                flags,
            },
            Some(ty),
        );
        result.unwrap()
    }

    pub fn icmp(&mut self, cond: IcmpCond, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.cmp_result_ty(lhs);
        let (_, result) = self.insert_inst(
            InstData::Icmp {
                cond,
                args: [lhs, rhs],
            },
            Some(ty),
        );
        result.unwrap()
    }

    pub fn fcmp(&mut self, cond: FcmpCond, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.cmp_result_ty(lhs);
        let (_, result) = self.insert_inst(
            InstData::Fcmp {
                cond,
                args: [lhs, rhs],
            },
            Some(ty),
        );
        result.unwrap()
    }

    fn cmp_result_ty(&self, operand: ValueId) -> Type {
        let operand_ty = self.func.dfg.value_ty(operand);
        let vector = self
            .func
            .dfg
            .ctx
            .with_ty_store(|s| s.vector_def(operand_ty));
        match vector {
            Some((_, lanes)) => self
                .func
                .dfg
                .ctx
                .with_ty_store_mut(|s| s.make_vector(Type::I1, lanes)),
            None => Type::I1,
        }
    }

    pub fn cast(&mut self, code: CastOp, arg: ValueId, ty: Type) -> ValueId {
        let (_, result) = self.insert_inst(InstData::Cast { code, arg, ty }, Some(ty));
        result.unwrap()
    }

    pub fn load(&mut self, ptr: ValueId, ty: Type, align: u64) -> ValueId {
        let (_, result) = self.insert_inst(
            InstData::Load {
                ptr,
                ty,
                align,
                volatile: false,
                atomic: false,
            },
            Some(ty),
        );
        result.unwrap()
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId, align: u64) -> InstId {
        let (inst, _) = self.insert_inst(
            InstData::Store {
                args: [value, ptr],
                align,
                volatile: false,
                atomic: false,
            },
            None,
        );
        inst
    }

    /// `alloca i8, i32 <size>`, the only form the stable subset admits.
    pub fn alloca(&mut self, size: ValueId) -> ValueId {
        self.alloca_of(Type::I8, size)
    }

    pub fn alloca_of(&mut self, alloc_ty: Type, size: ValueId) -> ValueId {
        let ptr_ty = self
            .func
            .dfg
            .ctx
            .with_ty_store_mut(|s| s.make_ptr(alloc_ty));
        let (_, result) = self.insert_inst(InstData::Alloca { alloc_ty, size }, Some(ptr_ty));
        result.unwrap()
    }

    pub fn call(&mut self, callee: ValueId, args: &[ValueId], ret_ty: Type) -> Option<ValueId> {
        let result_ty = (!ret_ty.is_void()).then_some(ret_ty);
        let (_, result) = self.insert_inst(
            InstData::Call {
                callee,
                args: args.into(),
                ret_ty,
                conv: CallConv::C,
                attrs: SmallVec::new(),
                inline_asm: false,
            },
            result_ty,
        );
        result
    }

    pub fn select(&mut self, cond: ValueId, then: ValueId, alt: ValueId) -> ValueId {
        let ty = self.func.dfg.value_ty(then);
        let (_, result) = self.insert_inst(
            InstData::Select {
                args: [cond, then, alt],
            },
            Some(ty),
        );
        result.unwrap()
    }

    pub fn phi(&mut self, incomings: &[(ValueId, BlockId)], ty: Type) -> ValueId {
        let (_, result) = self.insert_inst(
            InstData::Phi {
                incomings: incomings.into(),
                ty,
            },
            Some(ty),
        );
        result.unwrap()
    }

    pub fn jump(&mut self, dest: BlockId) -> InstId {
        self.insert_inst(InstData::Jump { dest }, None).0
    }

    pub fn br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId) -> InstId {
        self.insert_inst(
            InstData::Br {
                cond,
                dests: [then_dest, else_dest],
            },
            None,
        )
        .0
    }

    pub fn switch(
        &mut self,
        cond: ValueId,
        default: BlockId,
        cases: &[(ValueId, BlockId)],
    ) -> InstId {
        self.insert_inst(
            InstData::Switch {
                cond,
                default,
                cases: cases.into(),
            },
            None,
        )
        .0
    }

    pub fn ret(&mut self, arg: Option<ValueId>) -> InstId {
        self.insert_inst(InstData::Ret { arg }, None).0
    }

    pub fn unreachable(&mut self) -> InstId {
        self.insert_inst(InstData::Unreachable, None).0
    }

    pub fn extract_element(&mut self, vector: ValueId, index: ValueId) -> ValueId {
        let vec_ty = self.func.dfg.value_ty(vector);
        let elem_ty = self
            .func
            .dfg
            .ctx
            .with_ty_store(|s| s.vector_def(vec_ty))
            .map(|(elem, _)| elem)
            .unwrap_or(vec_ty);
        let (_, result) = self.insert_inst(
            InstData::ExtractElement {
                args: [vector, index],
            },
            Some(elem_ty),
        );
        result.unwrap()
    }

    pub fn insert_element(&mut self, vector: ValueId, elem: ValueId, index: ValueId) -> ValueId {
        let ty = self.func.dfg.value_ty(vector);
        let (_, result) = self.insert_inst(
            InstData::InsertElement {
                args: [vector, elem, index],
            },
            Some(ty),
        );
        result.unwrap()
    }

    /// Appends a construct outside the stable subset.
    pub fn disallowed(
        &mut self,
        code: Opcode,
        args: &[ValueId],
        result_ty: Option<Type>,
    ) -> (InstId, Option<ValueId>) {
        self.insert_inst(
            InstData::Disallowed {
                code,
                args: args.into(),
            },
            result_ty,
        )
    }
}
