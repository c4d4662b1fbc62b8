//! Pexe IR type definitions.
//!
//! All derived types are interned in the [`TypeStore`] so that type equality
//! is identity comparison on [`CompoundTypeRef`].

use std::fmt;

use cranelift_entity::PrimaryMap;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::module::ModuleCtx;

#[derive(Debug, Default)]
pub struct TypeStore {
    compounds: PrimaryMap<CompoundTypeRef, CompoundType>,
    rev_types: FxHashMap<CompoundType, CompoundTypeRef>,
    struct_types: IndexMap<String, CompoundTypeRef>,
}

impl TypeStore {
    pub fn make_ptr(&mut self, pointee: Type) -> Type {
        self.make_ptr_in(pointee, 0)
    }

    pub fn make_ptr_in(&mut self, pointee: Type, addr_space: u32) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Ptr {
            pointee,
            addr_space,
        });
        Type::Compound(cmpd_ref)
    }

    pub fn make_vector(&mut self, elem: Type, lanes: usize) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Vector { elem, lanes });
        Type::Compound(cmpd_ref)
    }

    pub fn make_array(&mut self, elem: Type, len: usize) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Array { elem, len });
        Type::Compound(cmpd_ref)
    }

    pub fn make_func(&mut self, params: &[Type], ret_ty: Type) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Func {
            params: params.into(),
            ret_ty,
            variadic: false,
        });
        Type::Compound(cmpd_ref)
    }

    pub fn make_variadic_func(&mut self, params: &[Type], ret_ty: Type) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Func {
            params: params.into(),
            ret_ty,
            variadic: true,
        });
        Type::Compound(cmpd_ref)
    }

    pub fn make_struct(&mut self, fields: &[Type], packed: bool) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Struct(StructData {
            name: None,
            fields: fields.to_vec(),
            packed,
        }));
        Type::Compound(cmpd_ref)
    }

    pub fn make_named_struct(&mut self, name: &str, fields: &[Type], packed: bool) -> Type {
        let cmpd_ref = self.make_compound(CompoundType::Struct(StructData {
            name: Some(name.to_string()),
            fields: fields.to_vec(),
            packed,
        }));
        Type::Compound(cmpd_ref)
    }

    /// Lookup a named struct type.
    pub fn lookup_struct(&self, name: &str) -> Option<CompoundTypeRef> {
        self.struct_types.get(name).copied()
    }

    pub fn make_compound(&mut self, data: CompoundType) -> CompoundTypeRef {
        match self.rev_types.get(&data) {
            Some(cmpd_ref) => *cmpd_ref,
            None => {
                let cmpd_ref = self.compounds.push(data.clone());
                if let CompoundType::Struct(StructData {
                    name: Some(name), ..
                }) = &data
                {
                    assert!(
                        !self.struct_types.contains_key(name),
                        "struct {name} is already defined"
                    );
                    self.struct_types.insert(name.to_string(), cmpd_ref);
                }
                self.rev_types.insert(data, cmpd_ref);
                cmpd_ref
            }
        }
    }

    pub fn resolve_compound(&self, cmpd_ref: CompoundTypeRef) -> &CompoundType {
        &self.compounds[cmpd_ref]
    }

    pub fn deref(&self, ptr: Type) -> Option<Type> {
        match ptr {
            Type::Compound(cmpd_ref) => match &self.compounds[cmpd_ref] {
                CompoundType::Ptr { pointee, .. } => Some(*pointee),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn vector_def(&self, ty: Type) -> Option<(Type, usize)> {
        match ty {
            Type::Compound(cmpd_ref) => match self.compounds[cmpd_ref] {
                CompoundType::Vector { elem, lanes } => Some((elem, lanes)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn array_def(&self, ty: Type) -> Option<(Type, usize)> {
        match ty {
            Type::Compound(cmpd_ref) => match self.compounds[cmpd_ref] {
                CompoundType::Array { elem, len } => Some((elem, len)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn struct_def(&self, ty: Type) -> Option<&StructData> {
        match ty {
            Type::Compound(cmpd_ref) => match &self.compounds[cmpd_ref] {
                CompoundType::Struct(def) => Some(def),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_ptr(&self, ty: Type) -> bool {
        match ty {
            Type::Compound(cmpd_ref) => self.compounds[cmpd_ref].is_ptr(),
            _ => false,
        }
    }

    pub fn is_vector(&self, ty: Type) -> bool {
        match ty {
            Type::Compound(cmpd_ref) => self.compounds[cmpd_ref].is_vector(),
            _ => false,
        }
    }

    pub fn is_func(&self, ty: Type) -> bool {
        match ty {
            Type::Compound(cmpd_ref) => self.compounds[cmpd_ref].is_func(),
            _ => false,
        }
    }
}

/// Pexe IR types definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Type {
    #[default]
    Void,
    I1,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
    /// The type of metadata operands on intrinsic calls.
    Metadata,
    Compound(CompoundTypeRef),
}

impl Type {
    pub fn is_integral(self) -> bool {
        matches!(self, Self::I1 | Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    pub fn is_void(self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_compound(self) -> bool {
        matches!(self, Self::Compound(_))
    }

    /// Bit width of an integer type.
    pub fn int_width(self) -> Option<u64> {
        match self {
            Self::I1 => Some(1),
            Self::I8 => Some(8),
            Self::I16 => Some(16),
            Self::I32 => Some(32),
            Self::I64 => Some(64),
            _ => None,
        }
    }

    pub fn is_pointer(self, ctx: &ModuleCtx) -> bool {
        ctx.with_ty_store(|s| s.is_ptr(self))
    }

    pub fn is_vector(self, ctx: &ModuleCtx) -> bool {
        ctx.with_ty_store(|s| s.is_vector(self))
    }

    pub fn resolve_compound(self, ctx: &ModuleCtx) -> Option<CompoundType> {
        let Self::Compound(cmpd_ref) = self else {
            return None;
        };

        Some(ctx.with_ty_store(|s| s.resolve_compound(cmpd_ref).clone()))
    }

    pub fn to_ptr(self, ctx: &ModuleCtx) -> Type {
        ctx.with_ty_store_mut(|s| s.make_ptr(self))
    }

    pub fn display(self, ctx: &ModuleCtx) -> DisplayType<'_> {
        DisplayType { ty: self, ctx }
    }
}

/// An opaque reference to [`CompoundType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundTypeRef(u32);
cranelift_entity::entity_impl!(CompoundTypeRef);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompoundType {
    Vector {
        elem: Type,
        lanes: usize,
    },
    Ptr {
        pointee: Type,
        addr_space: u32,
    },
    Func {
        params: SmallVec<[Type; 8]>,
        ret_ty: Type,
        variadic: bool,
    },
    Array {
        elem: Type,
        len: usize,
    },
    Struct(StructData),
}

impl CompoundType {
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr { .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Self::Func { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(..))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructData {
    /// `None` for the anonymous (literal) structs produced by global
    /// flattening.
    pub name: Option<String>,
    pub fields: Vec<Type>,
    pub packed: bool,
}

pub struct DisplayType<'a> {
    ty: Type,
    ctx: &'a ModuleCtx,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { ty, ctx } = *self;
        match ty {
            Type::Void => write!(f, "void"),
            Type::I1 => write!(f, "i1"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Metadata => write!(f, "metadata"),
            Type::Compound(cmpd_ref) => {
                let cmpd = ctx.with_ty_store(|s| s.resolve_compound(cmpd_ref).clone());
                match cmpd {
                    CompoundType::Vector { elem, lanes } => {
                        write!(f, "<{lanes} x {}>", elem.display(ctx))
                    }
                    CompoundType::Ptr {
                        pointee,
                        addr_space,
                    } => {
                        if addr_space != 0 {
                            write!(f, "{} addrspace({addr_space})*", pointee.display(ctx))
                        } else {
                            write!(f, "{}*", pointee.display(ctx))
                        }
                    }
                    CompoundType::Func {
                        params,
                        ret_ty,
                        variadic,
                    } => {
                        write!(f, "{} (", ret_ty.display(ctx))?;
                        for (i, param) in params.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", param.display(ctx))?;
                        }
                        if variadic {
                            if !params.is_empty() {
                                write!(f, ", ")?;
                            }
                            write!(f, "...")?;
                        }
                        write!(f, ")")
                    }
                    CompoundType::Array { elem, len } => {
                        write!(f, "[{len} x {}]", elem.display(ctx))
                    }
                    CompoundType::Struct(data) => {
                        if let Some(name) = &data.name {
                            return write!(f, "%{name}");
                        }
                        if data.packed {
                            write!(f, "<{{ ")?;
                        } else {
                            write!(f, "{{ ")?;
                        }
                        for (i, field) in data.fields.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", field.display(ctx))?;
                        }
                        if data.packed {
                            write!(f, " }}>")
                        } else {
                            write!(f, " }}")
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups_compounds() {
        let ctx = ModuleCtx::new();
        let p0 = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I32));
        let p1 = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I32));
        assert_eq!(p0, p1);

        let v0 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I32, 4));
        let v1 = ctx.with_ty_store_mut(|s| s.make_vector(Type::I32, 8));
        assert_ne!(v0, v1);
    }

    #[test]
    fn display_types() {
        let ctx = ModuleCtx::new();
        let ptr = ctx.with_ty_store_mut(|s| s.make_ptr(Type::I8));
        assert_eq!(ptr.display(&ctx).to_string(), "i8*");

        let vec = ctx.with_ty_store_mut(|s| s.make_vector(Type::Float, 4));
        assert_eq!(vec.display(&ctx).to_string(), "<4 x float>");

        let fn_ty = ctx.with_ty_store_mut(|s| s.make_func(&[Type::I32, Type::Double], Type::Void));
        assert_eq!(fn_ty.display(&ctx).to_string(), "void (i32, double)");

        let packed = ctx.with_ty_store_mut(|s| s.make_struct(&[Type::I32, Type::I32], true));
        assert_eq!(packed.display(&ctx).to_string(), "<{ i32, i32 }>");
    }
}
