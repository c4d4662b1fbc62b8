//! The type classifier: pure predicates over IR types.
//!
//! i1 is permitted as a vector element but rejected as a parameter, a
//! pointee, and in arithmetic, so that loads and stores always move a whole
//! number of bytes.

use pexe_ir::{module::ModuleCtx, types::CompoundType, Type};

/// The vector shapes of the dialect, `(element, lanes)`.
pub const VECTOR_LANES: &[(Type, usize)] = &[
    (Type::I1, 4),
    (Type::I1, 8),
    (Type::I1, 16),
    (Type::I8, 16),
    (Type::I16, 8),
    (Type::I32, 4),
    (Type::Float, 4),
];

pub fn is_valid_scalar_type(ty: Type) -> bool {
    matches!(
        ty,
        Type::I1 | Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Float | Type::Double
    )
}

pub fn is_valid_vector_type(ctx: &ModuleCtx, ty: Type) -> bool {
    let Some((elem, lanes)) = ctx.with_ty_store(|s| s.vector_def(ty)) else {
        return false;
    };

    VECTOR_LANES.contains(&(elem, lanes))
}

/// Valid as an argument type, and as a return type other than `void`.
pub fn is_valid_param_type(ctx: &ModuleCtx, ty: Type) -> bool {
    (is_valid_scalar_type(ty) && ty != Type::I1) || is_valid_vector_type(ctx, ty)
}

pub fn is_valid_return_type(ctx: &ModuleCtx, ty: Type) -> bool {
    ty.is_void() || is_valid_param_type(ctx, ty)
}

pub fn is_valid_function_type(ctx: &ModuleCtx, ty: Type) -> bool {
    let Some(CompoundType::Func {
        params,
        ret_ty,
        variadic,
    }) = ty.resolve_compound(ctx)
    else {
        return false;
    };

    !variadic
        && is_valid_return_type(ctx, ret_ty)
        && params.iter().all(|param| is_valid_param_type(ctx, *param))
}

/// A valid pointer type is a default-address-space pointer to a non-i1
/// scalar, a non-i1-element vector, or a valid function type.
pub fn is_valid_pointer_type(ctx: &ModuleCtx, ty: Type) -> bool {
    let Some(CompoundType::Ptr {
        pointee,
        addr_space,
    }) = ty.resolve_compound(ctx)
    else {
        return false;
    };

    if addr_space != 0 {
        return false;
    }

    if is_valid_scalar_type(pointee) && pointee != Type::I1 {
        return true;
    }
    if is_valid_vector_type(ctx, pointee) {
        let elem = ctx
            .with_ty_store(|s| s.vector_def(pointee))
            .map(|(elem, _)| elem);
        return elem != Some(Type::I1);
    }
    is_valid_function_type(ctx, pointee)
}

/// Bit size of a scalar type, for alignment computations.
pub fn scalar_bit_size(ty: Type) -> Option<u64> {
    match ty {
        Type::Float => Some(32),
        Type::Double => Some(64),
        _ => ty.int_width(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_set() {
        for ty in [
            Type::I1,
            Type::I8,
            Type::I16,
            Type::I32,
            Type::I64,
            Type::Float,
            Type::Double,
        ] {
            assert!(is_valid_scalar_type(ty));
        }
        assert!(!is_valid_scalar_type(Type::Void));
        assert!(!is_valid_scalar_type(Type::Metadata));
    }

    #[test]
    fn vector_table() {
        let ctx = ModuleCtx::new();
        let v4i32 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I32, 4));
        let v8i32 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I32, 8));
        let v16i1 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I1, 16));
        let v4f64 = ctx.with_ty_store_mut(|s| s.make_vector(Type::Double, 4));

        assert!(is_valid_vector_type(&ctx, v4i32));
        assert!(!is_valid_vector_type(&ctx, v8i32));
        assert!(is_valid_vector_type(&ctx, v16i1));
        assert!(!is_valid_vector_type(&ctx, v4f64));
    }

    #[test]
    fn param_rejects_i1_but_not_i1_vectors() {
        let ctx = ModuleCtx::new();
        assert!(!is_valid_param_type(&ctx, Type::I1));
        let v4i1 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I1, 4));
        assert!(is_valid_param_type(&ctx, v4i1));
    }

    #[test]
    fn pointer_rules() {
        let ctx = ModuleCtx::new();
        let p_i32 = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I32));
        let p_i1 = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I1));
        let p_as1 = ctx.with_ty_store_mut(|s| s.make_ptr_in(Type::I32, 1));
        let v4i1 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I1, 4));
        let p_v4i1 = ctx.with_ty_store_mut(|s| s.make_ptr(v4i1));
        let fn_ty = ctx.with_ty_store_mut(|s| s.make_func(&[Type::I32], Type::Void));
        let p_fn = ctx.with_ty_store_mut(|s| s.make_ptr(fn_ty));

        assert!(is_valid_pointer_type(&ctx, p_i32));
        assert!(!is_valid_pointer_type(&ctx, p_i1));
        assert!(!is_valid_pointer_type(&ctx, p_as1));
        assert!(!is_valid_pointer_type(&ctx, p_v4i1));
        assert!(is_valid_pointer_type(&ctx, p_fn));
        assert!(!is_valid_pointer_type(&ctx, Type::I32));
    }

    #[test]
    fn variadic_function_type_is_invalid() {
        let ctx = ModuleCtx::new();
        let variadic = ctx.with_ty_store_mut(|s| s.make_variadic_func(&[Type::I32], Type::Void));
        let plain = ctx.with_ty_store_mut(|s| s.make_func(&[Type::I32], Type::Void));
        assert!(!is_valid_function_type(&ctx, variadic));
        assert!(is_valid_function_type(&ctx, plain));
    }
}
