pub mod builder;
pub mod constant;
pub mod dfg;
pub mod function;
pub mod global_variable;
pub mod inst;
pub mod layout;
pub mod linkage;
pub mod metadata;
pub mod module;
pub mod types;
pub mod value;

pub use builder::{FunctionBuilder, ModuleBuilder};
pub use constant::{Constant, ConstExpr};
pub use dfg::{Block, BlockId, DataFlowGraph};
pub use function::{Function, Signature};
pub use global_variable::{GlobalVariable, GlobalVariableData};
pub use inst::{ArithFlags, BinaryOp, CastOp, FcmpCond, IcmpCond, InstData, InstId, Opcode};
pub use layout::Layout;
pub use linkage::{CallConv, Linkage, Visibility};
pub use metadata::{MdKind, MdNode, MdNodeId, NamedMdNode, MD_DBG};
pub use module::{AliasData, FuncRef, Module, ModuleCtx};
pub use types::{CompoundType, CompoundTypeRef, StructData, Type};
pub use value::{GlobalRef, Immediate, Value, ValueId};
