//! The intrinsic registry.
//!
//! Intrinsics fall in three categories: always allowed provided the exact
//! name and type match, never allowed, and debug-info intrinsics gated on
//! the debug-metadata flag. Anything unrecognized is rejected by default.

use pexe_ir::{module::ModuleCtx, Function, Type};
use rustc_hash::FxHashMap;

use crate::config::VerifierConfig;

/// Every intrinsic kind the verifier can name. One exhaustive match
/// dispatches on this, so adding a kind is a compiler-checked local change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    // Bit manipulation.
    Bswap,
    Ctlz,
    Cttz,
    Ctpop,
    // Threading primitives.
    ReadThreadPointer,
    Setjmp,
    Longjmp,
    // Floating point.
    Sqrt,
    // Atomics.
    AtomicLoad,
    AtomicStore,
    AtomicRmw,
    AtomicCmpxchg,
    AtomicFence,
    AtomicFenceAll,
    AtomicIsLockFree,
    // Stack management.
    Stacksave,
    Stackrestore,
    // Control.
    Trap,
    // Memory.
    Memcpy,
    Memmove,
    Memset,
    // Debug info; admitted only under the debug-metadata flag.
    DbgDeclare,
    DbgValue,
    // Known to be never allowed.
    AdjustTrampoline,
    InitTrampoline,
    EhDwarfCfa,
    EhReturnI32,
    EhReturnI64,
    EhSjljCallsite,
    EhSjljFunctioncontext,
    EhSjljLongjmp,
    EhSjljLsda,
    EhSjljSetjmp,
    EhTypeidFor,
    EhUnwindInit,
    FrameAddress,
    ReturnAddress,
    StackProtector,
    VaCopy,
    VaEnd,
    VaStart,
    SaddWithOverflow,
    SsubWithOverflow,
    UaddWithOverflow,
    UsubWithOverflow,
    SmulWithOverflow,
    UmulWithOverflow,
    LifetimeStart,
    LifetimeEnd,
    InvariantStart,
    InvariantEnd,
    Cos,
    Sin,
    Exp,
    Exp2,
    Log,
    Log2,
    Log10,
    Pow,
    Powi,
    Expect,
    FltRounds,
}

impl IntrinsicKind {
    /// Resolves an intrinsic name to its kind. Overloaded families match on
    /// the name stem; `None` means the name is not a recognized intrinsic.
    pub fn resolve(name: &str) -> Option<Self> {
        let exact = match name {
            "llvm.nacl.read.tp" => Some(Self::ReadThreadPointer),
            "llvm.nacl.setjmp" => Some(Self::Setjmp),
            "llvm.nacl.longjmp" => Some(Self::Longjmp),
            "llvm.nacl.atomic.fence" => Some(Self::AtomicFence),
            "llvm.nacl.atomic.fence.all" => Some(Self::AtomicFenceAll),
            "llvm.nacl.atomic.is.lock.free" => Some(Self::AtomicIsLockFree),
            "llvm.stacksave" => Some(Self::Stacksave),
            "llvm.stackrestore" => Some(Self::Stackrestore),
            "llvm.trap" => Some(Self::Trap),
            "llvm.dbg.declare" => Some(Self::DbgDeclare),
            "llvm.dbg.value" => Some(Self::DbgValue),
            "llvm.adjust.trampoline" => Some(Self::AdjustTrampoline),
            "llvm.init.trampoline" => Some(Self::InitTrampoline),
            "llvm.eh.dwarf.cfa" => Some(Self::EhDwarfCfa),
            "llvm.eh.return.i32" => Some(Self::EhReturnI32),
            "llvm.eh.return.i64" => Some(Self::EhReturnI64),
            "llvm.eh.sjlj.callsite" => Some(Self::EhSjljCallsite),
            "llvm.eh.sjlj.functioncontext" => Some(Self::EhSjljFunctioncontext),
            "llvm.eh.sjlj.longjmp" => Some(Self::EhSjljLongjmp),
            "llvm.eh.sjlj.lsda" => Some(Self::EhSjljLsda),
            "llvm.eh.sjlj.setjmp" => Some(Self::EhSjljSetjmp),
            "llvm.eh.typeid.for" => Some(Self::EhTypeidFor),
            "llvm.eh.unwind.init" => Some(Self::EhUnwindInit),
            "llvm.frameaddress" => Some(Self::FrameAddress),
            "llvm.returnaddress" => Some(Self::ReturnAddress),
            "llvm.stackprotector" => Some(Self::StackProtector),
            "llvm.va_copy" => Some(Self::VaCopy),
            "llvm.va_end" => Some(Self::VaEnd),
            "llvm.va_start" => Some(Self::VaStart),
            "llvm.flt.rounds" => Some(Self::FltRounds),
            _ => None,
        };
        if exact.is_some() {
            return exact;
        }

        const STEMS: &[(&str, IntrinsicKind)] = &[
            ("llvm.bswap.", IntrinsicKind::Bswap),
            ("llvm.ctlz.", IntrinsicKind::Ctlz),
            ("llvm.cttz.", IntrinsicKind::Cttz),
            ("llvm.ctpop.", IntrinsicKind::Ctpop),
            ("llvm.sqrt.", IntrinsicKind::Sqrt),
            ("llvm.nacl.atomic.load.", IntrinsicKind::AtomicLoad),
            ("llvm.nacl.atomic.store.", IntrinsicKind::AtomicStore),
            ("llvm.nacl.atomic.rmw.", IntrinsicKind::AtomicRmw),
            ("llvm.nacl.atomic.cmpxchg.", IntrinsicKind::AtomicCmpxchg),
            ("llvm.memcpy.", IntrinsicKind::Memcpy),
            ("llvm.memmove.", IntrinsicKind::Memmove),
            ("llvm.memset.", IntrinsicKind::Memset),
            ("llvm.sadd.with.overflow.", IntrinsicKind::SaddWithOverflow),
            ("llvm.ssub.with.overflow.", IntrinsicKind::SsubWithOverflow),
            ("llvm.uadd.with.overflow.", IntrinsicKind::UaddWithOverflow),
            ("llvm.usub.with.overflow.", IntrinsicKind::UsubWithOverflow),
            ("llvm.smul.with.overflow.", IntrinsicKind::SmulWithOverflow),
            ("llvm.umul.with.overflow.", IntrinsicKind::UmulWithOverflow),
            ("llvm.lifetime.start", IntrinsicKind::LifetimeStart),
            ("llvm.lifetime.end", IntrinsicKind::LifetimeEnd),
            ("llvm.invariant.start", IntrinsicKind::InvariantStart),
            ("llvm.invariant.end", IntrinsicKind::InvariantEnd),
            ("llvm.cos.", IntrinsicKind::Cos),
            ("llvm.sin.", IntrinsicKind::Sin),
            ("llvm.exp.", IntrinsicKind::Exp),
            ("llvm.exp2.", IntrinsicKind::Exp2),
            ("llvm.log.", IntrinsicKind::Log),
            ("llvm.log2.", IntrinsicKind::Log2),
            ("llvm.log10.", IntrinsicKind::Log10),
            ("llvm.pow.", IntrinsicKind::Pow),
            ("llvm.powi.", IntrinsicKind::Powi),
            ("llvm.expect.", IntrinsicKind::Expect),
        ];

        STEMS
            .iter()
            .find(|(stem, _)| name.starts_with(stem))
            .map(|(_, kind)| *kind)
    }

    pub fn is_memory_intrinsic(self) -> bool {
        matches!(self, Self::Memcpy | Self::Memmove | Self::Memset)
    }

    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            Self::AtomicLoad
                | Self::AtomicStore
                | Self::AtomicRmw
                | Self::AtomicCmpxchg
                | Self::AtomicFence
                | Self::AtomicFenceAll
        )
    }
}

/// Positional parameter classification for the atomic intrinsic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicParam {
    Ptr,
    Value,
    MemOrder,
    RmwOp,
}

/// The parameter layouts of the atomic intrinsics; every overload of a kind
/// shares the same layout.
pub fn atomic_params(kind: IntrinsicKind) -> &'static [AtomicParam] {
    use AtomicParam::*;
    match kind {
        IntrinsicKind::AtomicLoad => &[Ptr, MemOrder],
        IntrinsicKind::AtomicStore => &[Value, Ptr, MemOrder],
        IntrinsicKind::AtomicRmw => &[RmwOp, Ptr, Value, MemOrder],
        IntrinsicKind::AtomicCmpxchg => &[Ptr, Value, Value, MemOrder, MemOrder],
        IntrinsicKind::AtomicFence => &[MemOrder],
        IntrinsicKind::AtomicFenceAll => &[],
        _ => &[],
    }
}

/// Memory orders; constants on atomic calls must lie strictly between
/// `Invalid` and `NUM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    Invalid = 0,
    Relaxed = 1,
    Consume = 2,
    Acquire = 3,
    Release = 4,
    AcquireRelease = 5,
    SequentiallyConsistent = 6,
}

pub const MEMORY_ORDER_NUM: i64 = 7;

/// The memory orders presently admitted on atomic operations.
pub const ALLOWED_MEMORY_ORDERS: &[MemoryOrder] = &[MemoryOrder::SequentiallyConsistent];

/// Read-modify-write operations; same enum-range rule as memory orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwOp {
    Invalid = 0,
    Add = 1,
    Sub = 2,
    Or = 3,
    And = 4,
    Xor = 5,
    Exchange = 6,
}

pub const RMW_OP_NUM: i64 = 7;

/// Byte sizes `is_lock_free` may ask about.
pub const LOCK_FREE_BYTE_SIZES: &[i64] = &[1, 2, 4, 8];

/// Argument index carrying the alignment constant on memcpy/memmove/memset.
pub const MEM_INTRINSIC_ALIGN_ARG: usize = 3;

/// The admissible (name, concrete signature) pairs, built once per
/// verification.
pub struct AllowedIntrinsics {
    mapping: FxHashMap<String, Type>,
}

impl AllowedIntrinsics {
    pub fn new(ctx: &ModuleCtx) -> Self {
        let mut this = Self {
            mapping: FxHashMap::default(),
        };

        let i8_ptr = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I8));

        // bswap over i16/i32/i64; the backends can lower all three.
        for (suffix, ty) in [("i16", Type::I16), ("i32", Type::I32), ("i64", Type::I64)] {
            this.add(ctx, &format!("llvm.bswap.{suffix}"), &[ty], ty);
        }

        // ctlz/cttz carry the is-zero-poison i1 flag; ctpop does not.
        for (suffix, ty) in [("i32", Type::I32), ("i64", Type::I64)] {
            this.add(ctx, &format!("llvm.ctlz.{suffix}"), &[ty, Type::I1], ty);
            this.add(ctx, &format!("llvm.cttz.{suffix}"), &[ty, Type::I1], ty);
            this.add(ctx, &format!("llvm.ctpop.{suffix}"), &[ty], ty);
        }

        this.add(ctx, "llvm.nacl.read.tp", &[], i8_ptr);
        this.add(ctx, "llvm.nacl.setjmp", &[i8_ptr], Type::I32);
        this.add(ctx, "llvm.nacl.longjmp", &[i8_ptr, Type::I32], Type::Void);

        // Native sqrt; the contract is sqrt(x) = NaN for x < -0.0.
        this.add(ctx, "llvm.sqrt.f32", &[Type::Float], Type::Float);
        this.add(ctx, "llvm.sqrt.f64", &[Type::Double], Type::Double);

        for (suffix, ty) in [
            ("i8", Type::I8),
            ("i16", Type::I16),
            ("i32", Type::I32),
            ("i64", Type::I64),
        ] {
            let ty_ptr = ctx.with_ty_store_mut(|s| s.make_ptr(ty));
            this.add(
                ctx,
                &format!("llvm.nacl.atomic.load.{suffix}"),
                &[ty_ptr, Type::I32],
                ty,
            );
            this.add(
                ctx,
                &format!("llvm.nacl.atomic.store.{suffix}"),
                &[ty, ty_ptr, Type::I32],
                Type::Void,
            );
            this.add(
                ctx,
                &format!("llvm.nacl.atomic.rmw.{suffix}"),
                &[Type::I32, ty_ptr, ty, Type::I32],
                ty,
            );
            this.add(
                ctx,
                &format!("llvm.nacl.atomic.cmpxchg.{suffix}"),
                &[ty_ptr, ty, ty, Type::I32, Type::I32],
                ty,
            );
        }
        this.add(ctx, "llvm.nacl.atomic.fence", &[Type::I32], Type::Void);
        this.add(ctx, "llvm.nacl.atomic.fence.all", &[], Type::Void);
        this.add(
            ctx,
            "llvm.nacl.atomic.is.lock.free",
            &[Type::I32, i8_ptr],
            Type::I1,
        );

        // Stack save and restore support C99 VLAs.
        this.add(ctx, "llvm.stacksave", &[], i8_ptr);
        this.add(ctx, "llvm.stackrestore", &[i8_ptr], Type::Void);

        this.add(ctx, "llvm.trap", &[], Type::Void);

        // Only the i32-length overloads of memcpy/memmove/memset.
        this.add(
            ctx,
            "llvm.memcpy.p0i8.p0i8.i32",
            &[i8_ptr, i8_ptr, Type::I32, Type::I32, Type::I1],
            Type::Void,
        );
        this.add(
            ctx,
            "llvm.memmove.p0i8.p0i8.i32",
            &[i8_ptr, i8_ptr, Type::I32, Type::I32, Type::I1],
            Type::Void,
        );
        this.add(
            ctx,
            "llvm.memset.p0i8.i32",
            &[i8_ptr, Type::I8, Type::I32, Type::I32, Type::I1],
            Type::Void,
        );

        this
    }

    fn add(&mut self, ctx: &ModuleCtx, name: &str, params: &[Type], ret_ty: Type) {
        let fn_ty = ctx.with_ty_store_mut(|s| s.make_func(params, ret_ty));
        self.mapping.insert(name.to_string(), fn_ty);
    }

    /// Whether `func`, which must be marked as an intrinsic, is admissible.
    pub fn is_allowed(&self, ctx: &ModuleCtx, func: &Function, cfg: &VerifierConfig) -> bool {
        let name = func.sig.name();
        if let Some(expected_ty) = self.mapping.get(name) {
            return func.sig.func_ty(ctx) == *expected_ty;
        }

        let Some(kind) = IntrinsicKind::resolve(name) else {
            // Disallow by default.
            return false;
        };

        match kind {
            IntrinsicKind::DbgDeclare | IntrinsicKind::DbgValue => cfg.allow_debug_metadata,

            // Allowed kinds land here only when the concrete signature did
            // not match an admissible overload.
            IntrinsicKind::Bswap
            | IntrinsicKind::Ctlz
            | IntrinsicKind::Cttz
            | IntrinsicKind::Ctpop
            | IntrinsicKind::ReadThreadPointer
            | IntrinsicKind::Setjmp
            | IntrinsicKind::Longjmp
            | IntrinsicKind::Sqrt
            | IntrinsicKind::AtomicLoad
            | IntrinsicKind::AtomicStore
            | IntrinsicKind::AtomicRmw
            | IntrinsicKind::AtomicCmpxchg
            | IntrinsicKind::AtomicFence
            | IntrinsicKind::AtomicFenceAll
            | IntrinsicKind::AtomicIsLockFree
            | IntrinsicKind::Stacksave
            | IntrinsicKind::Stackrestore
            | IntrinsicKind::Trap
            | IntrinsicKind::Memcpy
            | IntrinsicKind::Memmove
            | IntrinsicKind::Memset => false,

            // Trampolines depend on a target-sized/aligned buffer.
            IntrinsicKind::AdjustTrampoline | IntrinsicKind::InitTrampoline => false,

            // Zero-cost exception handling is not stable.
            IntrinsicKind::EhDwarfCfa
            | IntrinsicKind::EhReturnI32
            | IntrinsicKind::EhReturnI64
            | IntrinsicKind::EhSjljCallsite
            | IntrinsicKind::EhSjljFunctioncontext
            | IntrinsicKind::EhSjljLongjmp
            | IntrinsicKind::EhSjljLsda
            | IntrinsicKind::EhSjljSetjmp
            | IntrinsicKind::EhTypeidFor
            | IntrinsicKind::EhUnwindInit => false,

            // Frame and return addresses must not leak into user code.
            IntrinsicKind::FrameAddress | IntrinsicKind::ReturnAddress => false,

            IntrinsicKind::StackProtector => false,

            // Var-args handling is expanded out before verification.
            IntrinsicKind::VaCopy | IntrinsicKind::VaEnd | IntrinsicKind::VaStart => false,

            // The *_with_overflow intrinsics return struct values.
            IntrinsicKind::SaddWithOverflow
            | IntrinsicKind::SsubWithOverflow
            | IntrinsicKind::UaddWithOverflow
            | IntrinsicKind::UsubWithOverflow
            | IntrinsicKind::SmulWithOverflow
            | IntrinsicKind::UmulWithOverflow => false,

            // Object-lifetime and invariant markers have unstable argument
            // semantics.
            IntrinsicKind::LifetimeStart
            | IntrinsicKind::LifetimeEnd
            | IntrinsicKind::InvariantStart
            | IntrinsicKind::InvariantEnd => false,

            // Transcendentals are lowered to libcalls before this point.
            IntrinsicKind::Cos
            | IntrinsicKind::Sin
            | IntrinsicKind::Exp
            | IntrinsicKind::Exp2
            | IntrinsicKind::Log
            | IntrinsicKind::Log2
            | IntrinsicKind::Log10
            | IntrinsicKind::Pow
            | IntrinsicKind::Powi => false,

            IntrinsicKind::Expect => false,
            IntrinsicKind::FltRounds => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pexe_ir::{Linkage, Signature};

    fn intrinsic_func(ctx: &ModuleCtx, name: &str, params: &[Type], ret_ty: Type) -> Function {
        Function::new(ctx, Signature::new(name, Linkage::External, params, ret_ty))
    }

    #[test]
    fn exact_signature_is_required() {
        let ctx = ModuleCtx::new();
        let cfg = VerifierConfig::default();
        let registry = AllowedIntrinsics::new(&ctx);

        let good = intrinsic_func(&ctx, "llvm.bswap.i32", &[Type::I32], Type::I32);
        assert!(registry.is_allowed(&ctx, &good, &cfg));

        let wrong_ret = intrinsic_func(&ctx, "llvm.bswap.i32", &[Type::I32], Type::I64);
        assert!(!registry.is_allowed(&ctx, &wrong_ret, &cfg));

        let bad_overload = intrinsic_func(&ctx, "llvm.bswap.i8", &[Type::I8], Type::I8);
        assert!(!registry.is_allowed(&ctx, &bad_overload, &cfg));
    }

    #[test]
    fn deny_listed_kinds_are_rejected() {
        let ctx = ModuleCtx::new();
        let cfg = VerifierConfig::default();
        let registry = AllowedIntrinsics::new(&ctx);

        for name in [
            "llvm.frameaddress",
            "llvm.va_start",
            "llvm.lifetime.start",
            "llvm.sadd.with.overflow.i32",
            "llvm.cos.f64",
            "llvm.expect.i32",
        ] {
            let func = intrinsic_func(&ctx, name, &[], Type::Void);
            assert!(!registry.is_allowed(&ctx, &func, &cfg), "{name}");
        }
    }

    #[test]
    fn unknown_intrinsics_are_rejected_by_default() {
        let ctx = ModuleCtx::new();
        let cfg = VerifierConfig::default();
        let registry = AllowedIntrinsics::new(&ctx);

        let func = intrinsic_func(&ctx, "llvm.experimental.guard", &[], Type::Void);
        assert!(!registry.is_allowed(&ctx, &func, &cfg));
    }

    #[test]
    fn dbg_intrinsics_follow_the_flag() {
        let ctx = ModuleCtx::new();
        let registry = AllowedIntrinsics::new(&ctx);
        let func = intrinsic_func(
            &ctx,
            "llvm.dbg.declare",
            &[Type::Metadata, Type::Metadata],
            Type::Void,
        );

        let off = VerifierConfig::default();
        assert!(!registry.is_allowed(&ctx, &func, &off));

        let on = VerifierConfig {
            allow_debug_metadata: true,
            ..VerifierConfig::default()
        };
        assert!(registry.is_allowed(&ctx, &func, &on));
    }
}
