//! Module-level constants.
//!
//! Global initializers are built from these; the flattened-form checker in
//! the verifier distinguishes exactly these shapes.

use std::fmt;

use crate::{module::Module, value::GlobalRef, Immediate, Type};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// A constant integer or floating-point scalar.
    Imm(Immediate),

    Undef(Type),

    /// The null pointer constant.
    Null(Type),

    /// `zeroinitializer` of an aggregate type.
    AggregateZero(Type),

    /// A byte-array literal, `[N x i8] c"..."`.
    DataArray { bytes: Vec<u8>, ty: Type },

    /// A struct literal; the struct shape (packed, anonymous) lives on the
    /// interned type.
    Struct { fields: Vec<Constant>, ty: Type },

    /// A constant vector literal.
    Vector { elems: Vec<Constant>, ty: Type },

    /// A constant expression.
    Expr { expr: ConstExpr, ty: Type },
}

impl Constant {
    pub fn make_imm(imm: impl Into<Immediate>) -> Self {
        Self::Imm(imm.into())
    }

    pub fn ty(&self) -> Type {
        match self {
            Self::Imm(imm) => imm.ty(),
            Self::Undef(ty)
            | Self::Null(ty)
            | Self::AggregateZero(ty)
            | Self::DataArray { ty, .. }
            | Self::Struct { ty, .. }
            | Self::Vector { ty, .. }
            | Self::Expr { ty, .. } => *ty,
        }
    }

    pub fn display<'a>(&'a self, module: &'a Module) -> DisplayConstant<'a> {
        DisplayConstant { constant: self, module }
    }
}

/// Constant expressions.
///
/// Only the shapes produced by global flattening are modeled precisely; the
/// verifier rejects everything else by shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstExpr {
    /// `ptrtoint (@global to <ty>)`.
    PtrToInt(GlobalRef),

    /// `add (<lhs>, <rhs>)`.
    Add(Box<Constant>, Box<Constant>),
}

pub struct DisplayConstant<'a> {
    constant: &'a Constant,
    module: &'a Module,
}

impl fmt::Display for DisplayConstant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { constant, module } = *self;
        let ctx = &module.ctx;
        match constant {
            Constant::Imm(imm) => write!(f, "{} {imm}", imm.ty().display(ctx)),
            Constant::Undef(ty) => write!(f, "{} undef", ty.display(ctx)),
            Constant::Null(ty) => write!(f, "{} null", ty.display(ctx)),
            Constant::AggregateZero(ty) => {
                write!(f, "{} zeroinitializer", ty.display(ctx))
            }
            Constant::DataArray { bytes, ty } => {
                write!(f, "{} c\"", ty.display(ctx))?;
                for byte in bytes {
                    if byte.is_ascii_graphic() && *byte != b'"' && *byte != b'\\' {
                        write!(f, "{}", *byte as char)?;
                    } else {
                        write!(f, "\\{byte:02X}")?;
                    }
                }
                write!(f, "\"")
            }
            Constant::Struct { fields, ty } => {
                let packed = ctx
                    .with_ty_store(|s| s.struct_def(*ty).map(|def| def.packed))
                    .unwrap_or(false);
                if packed {
                    write!(f, "<{{ ")?;
                } else {
                    write!(f, "{{ ")?;
                }
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field.display(module))?;
                }
                if packed {
                    write!(f, " }}>")
                } else {
                    write!(f, " }}")
                }
            }
            Constant::Vector { elems, ty: _ } => {
                write!(f, "<")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem.display(module))?;
                }
                write!(f, ">")
            }
            Constant::Expr { expr, ty } => match expr {
                ConstExpr::PtrToInt(gv) => {
                    write!(
                        f,
                        "ptrtoint (@{} to {})",
                        module.global_ref_name(*gv),
                        ty.display(ctx)
                    )
                }
                ConstExpr::Add(lhs, rhs) => {
                    write!(
                        f,
                        "add ({}, {})",
                        lhs.display(module),
                        rhs.display(module)
                    )
                }
            },
        }
    }
}
