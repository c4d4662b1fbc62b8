//! Pexe IR instruction definitions.
//!
//! The source dialect's instruction class hierarchy is flattened into one
//! tagged enum keyed by opcode; opcode-specific state (arithmetic flags,
//! volatile/atomic/alignment on memory accesses, call payload) lives on the
//! variant that needs it.

use std::fmt;

use smallvec::SmallVec;

use crate::{
    dfg::BlockId,
    function::Function,
    linkage::CallConv,
    module::Module,
    value::{Value, ValueId},
    Type,
};

/// An opaque reference to [`InstData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstId(pub u32);
cranelift_entity::entity_impl!(InstId);

/// Every opcode of the consumed dialect, admissible or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Terminators.
    Ret,
    Br,
    Switch,
    IndirectBr,
    Invoke,
    Resume,
    Unreachable,
    // Integer binary operations.
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    // Floating-point binary operations.
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    // Bitwise binary operations.
    And,
    Or,
    Xor,
    // Memory.
    Alloca,
    Load,
    Store,
    GetElementPtr,
    Fence,
    AtomicCmpXchg,
    AtomicRmw,
    // Casts.
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    PtrToInt,
    IntToPtr,
    BitCast,
    // Other.
    ICmp,
    FCmp,
    Phi,
    Call,
    Select,
    VAArg,
    ExtractElement,
    InsertElement,
    ShuffleVector,
    ExtractValue,
    InsertValue,
    LandingPad,
    // Reserved opcodes that never appear in well-formed input.
    UserOp1,
    UserOp2,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Ret => "ret",
            Self::Br => "br",
            Self::Switch => "switch",
            Self::IndirectBr => "indirectbr",
            Self::Invoke => "invoke",
            Self::Resume => "resume",
            Self::Unreachable => "unreachable",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::UDiv => "udiv",
            Self::SDiv => "sdiv",
            Self::URem => "urem",
            Self::SRem => "srem",
            Self::Shl => "shl",
            Self::LShr => "lshr",
            Self::AShr => "ashr",
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
            Self::FRem => "frem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Alloca => "alloca",
            Self::Load => "load",
            Self::Store => "store",
            Self::GetElementPtr => "getelementptr",
            Self::Fence => "fence",
            Self::AtomicCmpXchg => "cmpxchg",
            Self::AtomicRmw => "atomicrmw",
            Self::Trunc => "trunc",
            Self::ZExt => "zext",
            Self::SExt => "sext",
            Self::FPTrunc => "fptrunc",
            Self::FPExt => "fpext",
            Self::FPToUI => "fptoui",
            Self::FPToSI => "fptosi",
            Self::UIToFP => "uitofp",
            Self::SIToFP => "sitofp",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
            Self::BitCast => "bitcast",
            Self::ICmp => "icmp",
            Self::FCmp => "fcmp",
            Self::Phi => "phi",
            Self::Call => "call",
            Self::Select => "select",
            Self::VAArg => "va_arg",
            Self::ExtractElement => "extractelement",
            Self::InsertElement => "insertelement",
            Self::ShuffleVector => "shufflevector",
            Self::ExtractValue => "extractvalue",
            Self::InsertValue => "insertvalue",
            Self::LandingPad => "landingpad",
            Self::UserOp1 => "userop1",
            Self::UserOp2 => "userop2",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.mnemonic().fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Add => Opcode::Add,
            Self::Sub => Opcode::Sub,
            Self::Mul => Opcode::Mul,
            Self::UDiv => Opcode::UDiv,
            Self::SDiv => Opcode::SDiv,
            Self::URem => Opcode::URem,
            Self::SRem => Opcode::SRem,
            Self::Shl => Opcode::Shl,
            Self::LShr => Opcode::LShr,
            Self::AShr => Opcode::AShr,
            Self::FAdd => Opcode::FAdd,
            Self::FSub => Opcode::FSub,
            Self::FMul => Opcode::FMul,
            Self::FDiv => Opcode::FDiv,
            Self::FRem => Opcode::FRem,
            Self::And => Opcode::And,
            Self::Or => Opcode::Or,
            Self::Xor => Opcode::Xor,
        }
    }

    /// Integer arithmetic and shifts; the set that must not operate on i1.
    pub fn is_integer_arith(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::UDiv
                | Self::SDiv
                | Self::URem
                | Self::SRem
                | Self::Shl
                | Self::LShr
                | Self::AShr
        )
    }

    /// Operations that may carry `nuw`/`nsw`.
    pub fn is_overflowing(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Shl)
    }

    /// Operations that may carry `exact`.
    pub fn is_exactable(self) -> bool {
        matches!(self, Self::UDiv | Self::SDiv | Self::LShr | Self::AShr)
    }
}

/// Wrap/exactness flags on binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArithFlags {
    pub nuw: bool,
    pub nsw: bool,
    pub exact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    PtrToInt,
    IntToPtr,
    BitCast,
}

impl CastOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Trunc => Opcode::Trunc,
            Self::ZExt => Opcode::ZExt,
            Self::SExt => Opcode::SExt,
            Self::FPTrunc => Opcode::FPTrunc,
            Self::FPExt => Opcode::FPExt,
            Self::FPToUI => Opcode::FPToUI,
            Self::FPToSI => Opcode::FPToSI,
            Self::UIToFP => Opcode::UIToFP,
            Self::SIToFP => Opcode::SIToFP,
            Self::PtrToInt => Opcode::PtrToInt,
            Self::IntToPtr => Opcode::IntToPtr,
            Self::BitCast => Opcode::BitCast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmpCond {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FcmpCond {
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    Uno,
}

/// An instruction data definition.
#[derive(Debug, Clone, PartialEq)]
pub enum InstData {
    /// Binary operations; `flags` only on the opcodes that admit them.
    Binary {
        code: BinaryOp,
        args: [ValueId; 2],
        flags: ArithFlags,
    },

    Icmp {
        cond: IcmpCond,
        args: [ValueId; 2],
    },

    Fcmp {
        cond: FcmpCond,
        args: [ValueId; 2],
    },

    /// Cast operations; `ty` is the destination type.
    Cast {
        code: CastOp,
        arg: ValueId,
        ty: Type,
    },

    Load {
        ptr: ValueId,
        ty: Type,
        align: u64,
        volatile: bool,
        atomic: bool,
    },

    /// `args` is `[value, pointer]`.
    Store {
        args: [ValueId; 2],
        align: u64,
        volatile: bool,
        atomic: bool,
    },

    /// Stack allocation of `size` elements of `alloc_ty`.
    Alloca {
        alloc_ty: Type,
        size: ValueId,
    },

    Call {
        callee: ValueId,
        args: SmallVec<[ValueId; 8]>,
        ret_ty: Type,
        conv: CallConv,
        /// Attribute strings attached to the call site; must be empty.
        attrs: SmallVec<[String; 2]>,
        inline_asm: bool,
    },

    /// `args` is `[cond, true_value, false_value]`.
    Select {
        args: [ValueId; 3],
    },

    Phi {
        incomings: SmallVec<[(ValueId, BlockId); 4]>,
        ty: Type,
    },

    Jump {
        dest: BlockId,
    },

    Br {
        cond: ValueId,
        dests: [BlockId; 2],
    },

    Switch {
        cond: ValueId,
        default: BlockId,
        cases: SmallVec<[(ValueId, BlockId); 4]>,
    },

    Ret {
        arg: Option<ValueId>,
    },

    Unreachable,

    /// `args` is `[vector, index]`.
    ExtractElement {
        args: [ValueId; 2],
    },

    /// `args` is `[vector, element, index]`.
    InsertElement {
        args: [ValueId; 3],
    },

    /// Any construct outside the stable subset, kept representable so that
    /// the verifier can observe and reject it.
    Disallowed {
        code: Opcode,
        args: SmallVec<[ValueId; 4]>,
    },
}

impl InstData {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Binary { code, .. } => code.opcode(),
            Self::Icmp { .. } => Opcode::ICmp,
            Self::Fcmp { .. } => Opcode::FCmp,
            Self::Cast { code, .. } => code.opcode(),
            Self::Load { .. } => Opcode::Load,
            Self::Store { .. } => Opcode::Store,
            Self::Alloca { .. } => Opcode::Alloca,
            Self::Call { .. } => Opcode::Call,
            Self::Select { .. } => Opcode::Select,
            Self::Phi { .. } => Opcode::Phi,
            Self::Jump { .. } | Self::Br { .. } => Opcode::Br,
            Self::Switch { .. } => Opcode::Switch,
            Self::Ret { .. } => Opcode::Ret,
            Self::Unreachable => Opcode::Unreachable,
            Self::ExtractElement { .. } => Opcode::ExtractElement,
            Self::InsertElement { .. } => Opcode::InsertElement,
            Self::Disallowed { code, .. } => *code,
        }
    }

    /// Value operands in source order. For calls the callee comes last,
    /// matching the dialect's operand layout.
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        match self {
            Self::Binary { args, .. } | Self::Icmp { args, .. } | Self::Fcmp { args, .. } => {
                args.iter().copied().collect()
            }
            Self::Cast { arg, .. } => [*arg].into_iter().collect(),
            Self::Load { ptr, .. } => [*ptr].into_iter().collect(),
            Self::Store { args, .. } => args.iter().copied().collect(),
            Self::Alloca { size, .. } => [*size].into_iter().collect(),
            Self::Call { callee, args, .. } => {
                args.iter().copied().chain([*callee]).collect()
            }
            Self::Select { args } => args.iter().copied().collect(),
            Self::Phi { incomings, .. } => incomings.iter().map(|(value, _)| *value).collect(),
            Self::Jump { .. } => SmallVec::new(),
            Self::Br { cond, .. } => [*cond].into_iter().collect(),
            Self::Switch { cond, cases, .. } => {
                [*cond].into_iter().chain(cases.iter().map(|(value, _)| *value)).collect()
            }
            Self::Ret { arg } => arg.iter().copied().collect(),
            Self::Unreachable => SmallVec::new(),
            Self::ExtractElement { args } => args.iter().copied().collect(),
            Self::InsertElement { args } => args.iter().copied().collect(),
            Self::Disallowed { args, .. } => args.iter().copied().collect(),
        }
    }

    pub fn display<'a>(&'a self, func: &'a Function, module: &'a Module) -> DisplayInst<'a> {
        DisplayInst {
            data: self,
            func,
            module,
        }
    }
}

pub struct DisplayInst<'a> {
    data: &'a InstData,
    func: &'a Function,
    module: &'a Module,
}

impl DisplayInst<'_> {
    fn write_value(&self, f: &mut fmt::Formatter<'_>, value: ValueId) -> fmt::Result {
        match self.func.dfg.value(value) {
            Value::Immediate { imm, .. } => write!(f, "{imm}"),
            Value::Global { gv, .. } => write!(f, "@{}", self.module.global_ref_name(*gv)),
            Value::Undef { .. } => write!(f, "undef"),
            Value::Null { .. } => write!(f, "null"),
            Value::ConstExpr { .. } => write!(f, "<constexpr>"),
            Value::VectorConst { .. } => write!(f, "<vector const>"),
            Value::Metadata { .. } => write!(f, "!metadata"),
            _ => write!(f, "v{}", value.0),
        }
    }
}

impl fmt::Display for DisplayInst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data;
        write!(f, "{}", data.opcode())?;

        match data {
            InstData::Jump { dest } => return write!(f, " block{}", dest.0),
            InstData::Br { cond, dests } => {
                write!(f, " ")?;
                self.write_value(f, *cond)?;
                return write!(f, ", block{}, block{}", dests[0].0, dests[1].0);
            }
            InstData::Switch { cond, default, cases } => {
                write!(f, " ")?;
                self.write_value(f, *cond)?;
                write!(f, ", block{} [", default.0)?;
                for (i, (value, block)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.write_value(f, *value)?;
                    write!(f, " -> block{}", block.0)?;
                }
                return write!(f, "]");
            }
            InstData::Phi { incomings, .. } => {
                for (i, (value, block)) in incomings.iter().enumerate() {
                    write!(f, "{}", if i > 0 { ", " } else { " " })?;
                    write!(f, "[")?;
                    self.write_value(f, *value)?;
                    write!(f, ", block{}]", block.0)?;
                }
                return Ok(());
            }
            _ => {}
        }

        for (i, operand) in data.operands().iter().enumerate() {
            write!(f, "{}", if i > 0 { ", " } else { " " })?;
            self.write_value(f, *operand)?;
        }
        Ok(())
    }
}
