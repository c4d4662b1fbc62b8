//! Function-body ABI checks.
//!
//! Each instruction goes through four phases: opcode classification,
//! opcode-specific operand and pointer checks, the generic operand-shape
//! check, and the result-type and attached-metadata checks. A single
//! instruction produces at most one instruction diagnostic; checking
//! continues with the next instruction so one run reports many errors.

use pexe_ir::{
    inst::{CastOp, InstData, InstId, Opcode},
    module::FuncRef,
    value::{GlobalRef, Value},
    CallConv, Function, Module, Type, ValueId, MD_DBG,
};

use crate::{
    config::VerifierConfig,
    diagnostic::{Diagnostic, Location},
    intrinsics::{
        atomic_params, AtomicParam, IntrinsicKind, ALLOWED_MEMORY_ORDERS, LOCK_FREE_BYTE_SIZES,
        MEMORY_ORDER_NUM, MEM_INTRINSIC_ALIGN_ARG, RMW_OP_NUM,
    },
    report::VerificationReport,
    types::{
        is_valid_pointer_type, is_valid_scalar_type, is_valid_vector_type, scalar_bit_size,
    },
};

pub(crate) fn collect_function_diagnostics(
    module: &Module,
    func_ref: FuncRef,
    func: &Function,
    cfg: &VerifierConfig,
    report: &mut VerificationReport,
) {
    let mut verifier = FunctionVerifier {
        module,
        func_ref,
        func,
        cfg,
        report,
    };
    verifier.run();
}

struct FunctionVerifier<'a> {
    module: &'a Module,
    func_ref: FuncRef,
    func: &'a Function,
    cfg: &'a VerifierConfig,
    report: &'a mut VerificationReport,
}

impl FunctionVerifier<'_> {
    fn run(&mut self) {
        let func = self.func;
        for block in func.layout.iter_block() {
            for inst_id in func.layout.iter_inst(block) {
                self.check_inst_and_report(inst_id);
                self.check_inst_metadata(inst_id);
            }
        }
    }

    fn error(&mut self, message: impl Into<String>, inst: InstId) {
        self.report.push(
            Diagnostic::error(
                message,
                Location::Inst {
                    func: self.func_ref,
                    inst,
                },
            ),
            self.cfg.max_diagnostics,
        );
    }

    fn check_inst_and_report(&mut self, inst_id: InstId) {
        // The opcode and operands are checked first; some opcodes must be
        // rejected out of hand regardless of the instruction's result type,
        // and diagnostics name that reason.
        let mut error = self.check_inst(inst_id);

        let mut bad_result_ty = None;
        if error.is_none() {
            if let Some(result) = self.func.dfg.inst_result(inst_id) {
                let ty = self.func.dfg.value_ty(result);
                let ok = is_valid_scalar_type(ty)
                    || is_valid_vector_type(&self.module.ctx, ty)
                    || self.is_normalized_ptr(result)
                    || matches!(self.func.dfg.inst(inst_id), InstData::Alloca { .. });
                if !ok {
                    error = Some("bad result type");
                    bad_result_ty = Some(ty);
                }
            }
        }

        if let Some(message) = error {
            let name = self.func.sig.name().to_string();
            let ty_text = bad_result_ty
                .map(|ty| ty.display(&self.module.ctx).to_string())
                .unwrap_or_default();
            let inst_text = self
                .func
                .dfg
                .inst(inst_id)
                .display(self.func, self.module)
                .to_string();
            self.error(
                format!("Function {name} disallowed: {message}: {ty_text} {inst_text}"),
                inst_id,
            );
        }
    }

    fn check_inst_metadata(&mut self, inst_id: InstId) {
        for (kind, _node) in self.func.dfg.inst_metadata(inst_id) {
            let whitelisted = *kind == MD_DBG && self.cfg.allow_debug_metadata;
            if whitelisted {
                continue;
            }
            let kind_text = match self.module.md_kind_name(*kind) {
                Some(name) => format!("!{name}"),
                None => format!("!<unknown kind #{}>", kind.0),
            };
            let name = self.func.sig.name().to_string();
            self.error(
                format!("Function {name} has disallowed instruction metadata: {kind_text}"),
                inst_id,
            );
        }
    }

    /// Opcode, opcode-specific, generic-operand and arithmetic-flag phases;
    /// first match wins.
    fn check_inst(&self, inst_id: InstId) -> Option<&'static str> {
        let data = self.func.dfg.inst(inst_id);

        // Index of the single pointer operand in `data.operands()` order,
        // when one exists; it is excluded from the generic operand check.
        let mut ptr_operand_index = None;

        match data {
            InstData::Disallowed { code, .. } => {
                return Some(match code {
                    // GetElementPtr is expanded into arithmetic, var-args
                    // and exception handling are lowered away, and atomics
                    // must arrive as intrinsics.
                    Opcode::GetElementPtr
                    | Opcode::VAArg
                    | Opcode::Invoke
                    | Opcode::LandingPad
                    | Opcode::Resume
                    | Opcode::IndirectBr
                    | Opcode::ShuffleVector
                    | Opcode::ExtractValue
                    | Opcode::InsertValue
                    | Opcode::AtomicCmpXchg
                    | Opcode::AtomicRmw
                    | Opcode::Fence => "bad instruction opcode",
                    _ => "unknown instruction opcode",
                });
            }

            // i1 arithmetic is of dubious usefulness and code generators
            // would have to support the corner cases.
            InstData::Binary { code, args, .. } if code.is_integer_arith() => {
                if let Some(error) = self.verify_arithmetic_type(args[0]) {
                    return Some(error);
                }
            }
            InstData::Icmp { args, .. } => {
                if let Some(error) = self.verify_arithmetic_type(args[0]) {
                    return Some(error);
                }
            }

            InstData::Binary { .. }
            | InstData::Fcmp { .. }
            | InstData::Select { .. }
            | InstData::Phi { .. }
            | InstData::Jump { .. }
            | InstData::Br { .. }
            | InstData::Ret { .. }
            | InstData::Unreachable => {}

            // Insert and extract element are restricted to constant
            // in-range indices to prevent undefined behavior.
            InstData::ExtractElement { args } => {
                if let Some(error) = self.verify_vector_index(args[0], args[1]) {
                    return Some(error);
                }
            }
            InstData::InsertElement { args } => {
                if let Some(error) = self.verify_vector_index(args[0], args[2]) {
                    return Some(error);
                }
            }

            InstData::Load {
                ptr,
                ty,
                align,
                volatile,
                atomic,
            } => {
                if *atomic {
                    return Some("atomic load");
                }
                if *volatile {
                    return Some("volatile load");
                }
                if !self.is_normalized_ptr(*ptr) {
                    return Some("bad pointer");
                }
                if !self.is_allowed_alignment(*align, *ty) {
                    return Some("bad alignment");
                }
                ptr_operand_index = Some(0);
            }
            InstData::Store {
                args,
                align,
                volatile,
                atomic,
            } => {
                if *atomic {
                    return Some("atomic store");
                }
                if *volatile {
                    return Some("volatile store");
                }
                if !self.is_normalized_ptr(args[1]) {
                    return Some("bad pointer");
                }
                if !self.is_allowed_alignment(*align, self.func.dfg.value_ty(args[0])) {
                    return Some("bad alignment");
                }
                ptr_operand_index = Some(1);
            }

            InstData::Cast { code, arg, ty } => match code {
                CastOp::BitCast => {
                    if ty.is_pointer(&self.module.ctx) {
                        if !self.is_inherent_ptr(*arg) {
                            return Some("operand not InherentPtr");
                        }
                        ptr_operand_index = Some(0);
                    }
                }
                CastOp::IntToPtr => {
                    if self.func.dfg.value_ty(*arg) != Type::I32 {
                        return Some("non-i32 inttoptr");
                    }
                }
                CastOp::PtrToInt => {
                    if !self.is_inherent_ptr(*arg) {
                        return Some("operand not InherentPtr");
                    }
                    if *ty != Type::I32 {
                        return Some("non-i32 ptrtoint");
                    }
                    ptr_operand_index = Some(0);
                }
                _ => {}
            },

            InstData::Alloca { alloc_ty, size } => {
                if *alloc_ty != Type::I8 {
                    return Some("non-i8 alloca");
                }
                if self.func.dfg.value_ty(*size) != Type::I32 {
                    return Some("alloca array size is not i32");
                }
            }

            InstData::Call {
                callee,
                args,
                conv,
                attrs,
                inline_asm,
                ..
            } => {
                if *inline_asm {
                    return Some("inline assembly");
                }
                if !attrs.is_empty() {
                    return Some("bad call attributes");
                }
                if *conv != CallConv::C {
                    return Some("bad calling convention");
                }

                // Intrinsic calls can carry multiple pointer arguments and
                // metadata arguments, so they are handled specially; the
                // later phases are skipped entirely.
                if let Some(kind) = self.intrinsic_callee_kind(*callee) {
                    return self.check_intrinsic_call(inst_id, kind, args);
                }

                // The callee is the last operand.
                if !self.is_normalized_ptr(*callee) {
                    return Some("bad function callee operand");
                }
                ptr_operand_index = Some(args.len());
            }

            // Switch cases are represented with array and vector constants
            // that the generic check would reject, so switch is checked
            // here and the later phases are skipped.
            InstData::Switch { cond, cases, .. } => {
                if !self.is_valid_scalar_operand(*cond) {
                    return Some("bad switch condition");
                }
                let cond_ty = self.func.dfg.value_ty(*cond);
                if !matches!(cond_ty, Type::I8 | Type::I16 | Type::I32 | Type::I64) {
                    return Some("bad switch condition type");
                }
                for (case_value, _) in cases {
                    if !self.is_valid_scalar_operand(*case_value) {
                        return Some("bad switch case");
                    }
                }
                return None;
            }
        }

        // Pointer operands were checked above; every remaining operand must
        // be a scalar or a vector.
        for (index, operand) in data.operands().iter().enumerate() {
            if Some(index) == ptr_operand_index {
                continue;
            }
            if !(self.is_valid_scalar_operand(*operand) || self.is_valid_vector_operand(*operand))
            {
                return Some("bad operand");
            }
        }

        if let InstData::Binary { code, flags, .. } = data {
            if code.is_overflowing() {
                if flags.nuw {
                    return Some("has \"nuw\" attribute");
                }
                if flags.nsw {
                    return Some("has \"nsw\" attribute");
                }
            }
            if code.is_exactable() && flags.exact {
                return Some("has \"exact\" attribute");
            }
        }

        None
    }

    fn check_intrinsic_call(
        &self,
        inst_id: InstId,
        kind: IntrinsicKind,
        args: &[ValueId],
    ) -> Option<&'static str> {
        for arg in args {
            let ok = self.is_valid_scalar_operand(*arg)
                || self.is_valid_vector_operand(*arg)
                || self.is_normalized_ptr(*arg)
                || matches!(self.func.dfg.value(*arg), Value::Metadata { .. });
            if !ok {
                return Some("bad intrinsic operand");
            }
        }

        // Alignments other than 1 are disallowed on memcpy() etc. for the
        // same reason as on integer loads and stores.
        if kind.is_memory_intrinsic() {
            let align = args
                .get(MEM_INTRINSIC_ALIGN_ARG)
                .and_then(|arg| self.func.dfg.value_imm(*arg))
                .and_then(|imm| imm.as_i64());
            if align != Some(1) {
                return Some("bad alignment");
            }
        }

        if kind.is_atomic() {
            // Memory orders are validated across all positions before any
            // rmw-operation parameter; when both are bad the memory-order
            // diagnostic wins.
            for (index, param) in atomic_params(kind).iter().enumerate() {
                if *param != AtomicParam::MemOrder {
                    continue;
                }
                let order = args
                    .get(index)
                    .and_then(|arg| self.func.dfg.value_imm(*arg))
                    .and_then(|imm| imm.as_i64());
                let Some(order) = order else {
                    return Some("invalid memory order");
                };
                if order <= 0 || order >= MEMORY_ORDER_NUM {
                    return Some("invalid memory order");
                }
                // Only sequential consistency for now; once more orders are
                // admitted this must also validate the order against the
                // specific atomic operation.
                if !ALLOWED_MEMORY_ORDERS
                    .iter()
                    .any(|allowed| *allowed as i64 == order)
                {
                    return Some("invalid memory order");
                }
            }
            for (index, param) in atomic_params(kind).iter().enumerate() {
                if *param != AtomicParam::RmwOp {
                    continue;
                }
                let op = args
                    .get(index)
                    .and_then(|arg| self.func.dfg.value_imm(*arg))
                    .and_then(|imm| imm.as_i64());
                let Some(op) = op else {
                    return Some("invalid atomicRMW operation");
                };
                if op <= 0 || op >= RMW_OP_NUM {
                    return Some("invalid atomicRMW operation");
                }
            }
        }

        if kind == IntrinsicKind::AtomicIsLockFree {
            let result_is_int = self
                .func
                .dfg
                .inst_result(inst_id)
                .map(|result| self.func.dfg.value_ty(result).is_integral())
                .unwrap_or(false);
            let size = args
                .first()
                .and_then(|arg| self.func.dfg.value_imm(*arg))
                .and_then(|imm| imm.as_i64());
            let size_ok = size.map_or(false, |size| LOCK_FREE_BYTE_SIZES.contains(&size));
            if !result_is_int || !size_ok {
                return Some("invalid atomic lock-free byte size");
            }
        }

        None
    }

    fn verify_arithmetic_type(&self, operand: ValueId) -> Option<&'static str> {
        let ty = self.func.dfg.value_ty(operand);
        if ty == Type::I1 {
            return Some("arithmetic on i1");
        }
        let elem = self
            .module
            .ctx
            .with_ty_store(|s| s.vector_def(ty))
            .map(|(elem, _)| elem);
        if elem == Some(Type::I1) {
            return Some("arithmetic on vector of i1");
        }
        None
    }

    fn verify_vector_index(&self, vector: ValueId, index: ValueId) -> Option<&'static str> {
        let imm = self
            .func
            .dfg
            .value_imm(index)
            .filter(|imm| imm.is_integer());
        let Some(imm) = imm else {
            return Some("non-constant vector insert/extract index");
        };

        let lanes = self
            .module
            .ctx
            .with_ty_store(|s| s.vector_def(self.func.dfg.value_ty(vector)))
            .map(|(_, lanes)| lanes)
            .unwrap_or(0);
        let index = imm.as_i64().unwrap_or(-1);
        if index < 0 || index as usize >= lanes {
            return Some("out of range vector insert/extract index");
        }
        None
    }

    /// Integer accesses always use "align 1" so that misaligned pointers
    /// cannot produce non-portable faults; floats may use their natural
    /// alignment, and vectors must be aligned to their element size.
    fn is_allowed_alignment(&self, align: u64, ty: Type) -> bool {
        if align > u64::MAX / 8 {
            return false;
        }
        let vector = self.module.ctx.with_ty_store(|s| s.vector_def(ty));
        if let Some((elem, _)) = vector {
            return elem != Type::I1
                && scalar_bit_size(elem).map_or(false, |bits| align.saturating_mul(8) == bits);
        }
        align == 1
            || (ty == Type::Double && align == 8)
            || (ty == Type::Float && align == 4)
    }

    /// InherentPtrs: stack slots, non-intrinsic globals, and intrinsic call
    /// results (some intrinsics return pointers). Intrinsic functions
    /// themselves are excluded so their address cannot be taken.
    fn is_inherent_ptr(&self, value: ValueId) -> bool {
        match self.func.dfg.value(value) {
            Value::Inst { inst, .. } => match self.func.dfg.inst(*inst) {
                InstData::Alloca { .. } => true,
                InstData::Call { callee, .. } => self.intrinsic_callee_kind(*callee).is_some(),
                _ => false,
            },
            Value::Global { gv, .. } => match gv {
                GlobalRef::Var(_) => true,
                GlobalRef::Func(func_ref) => !self.module.funcs[*func_ref].is_intrinsic(),
            },
            _ => false,
        }
    }

    /// NormalizedPtrs may stand where pointer types are required. Constant
    /// expressions, null and undef are excluded; pointer arithmetic and
    /// casting must appear as explicit instructions.
    fn is_normalized_ptr(&self, value: ValueId) -> bool {
        if !is_valid_pointer_type(&self.module.ctx, self.func.dfg.value_ty(value)) {
            return false;
        }
        if let Value::Inst { inst, .. } = self.func.dfg.value(value) {
            if matches!(
                self.func.dfg.inst(*inst),
                InstData::Cast {
                    code: CastOp::IntToPtr | CastOp::BitCast,
                    ..
                }
            ) {
                return true;
            }
        }
        self.is_inherent_ptr(value)
    }

    fn is_valid_scalar_operand(&self, value: ValueId) -> bool {
        match self.func.dfg.value(value) {
            // Instruction and argument types are checked where they are
            // defined.
            Value::Inst { .. } | Value::Arg { .. } => true,
            Value::Immediate { ty, .. } | Value::Undef { ty } => is_valid_scalar_type(*ty),
            _ => false,
        }
    }

    fn is_valid_vector_operand(&self, value: ValueId) -> bool {
        match self.func.dfg.value(value) {
            Value::Inst { .. } | Value::Arg { .. } => true,
            // Constant vectors other than undef are not allowed on
            // instructions; they are loaded from constant global memory and
            // rematerialized by the backend when needed.
            Value::Undef { ty } => is_valid_vector_type(&self.module.ctx, *ty),
            _ => false,
        }
    }

    /// Resolves `callee` to an intrinsic kind when it directly names an
    /// intrinsic function.
    fn intrinsic_callee_kind(&self, callee: ValueId) -> Option<IntrinsicKind> {
        match self.func.dfg.value(callee) {
            Value::Global {
                gv: GlobalRef::Func(func_ref),
                ..
            } => {
                let func = &self.module.funcs[*func_ref];
                if func.is_intrinsic() {
                    IntrinsicKind::resolve(func.sig.name())
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
