use std::sync::{Arc, RwLock};

use cranelift_entity::PrimaryMap;

use crate::{
    global_variable::GlobalVariableStore,
    metadata::{MdKind, MdNode, MdNodeId, NamedMdNode},
    types::TypeStore,
    value::GlobalRef,
    Function, Type,
};

/// An opaque reference to a [`Function`] in a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuncRef(u32);
cranelift_entity::entity_impl!(FuncRef);

/// Shared module context: the interned type store and the global-variable
/// store. Cheap to clone; each function's data flow graph keeps a handle.
#[derive(Debug, Clone, Default)]
pub struct ModuleCtx {
    inner: Arc<CtxInner>,
}

#[derive(Debug, Default)]
struct CtxInner {
    ty_store: RwLock<TypeStore>,
    gv_store: RwLock<GlobalVariableStore>,
}

impl ModuleCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ty_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TypeStore) -> R,
    {
        f(&self.inner.ty_store.read().unwrap())
    }

    pub fn with_ty_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TypeStore) -> R,
    {
        f(&mut self.inner.ty_store.write().unwrap())
    }

    pub fn with_gv_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GlobalVariableStore) -> R,
    {
        f(&self.inner.gv_store.read().unwrap())
    }

    pub fn with_gv_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut GlobalVariableStore) -> R,
    {
        f(&mut self.inner.gv_store.write().unwrap())
    }
}

/// An alias to another global value. The stable subset forbids these, but
/// the consumed dialect can express them.
#[derive(Debug, Clone)]
pub struct AliasData {
    pub name: String,
    pub ty: Type,
    pub aliasee: GlobalRef,
}

#[derive(Debug)]
pub struct Module {
    pub ctx: ModuleCtx,

    /// All functions in the module, in declaration order.
    pub funcs: PrimaryMap<FuncRef, Function>,

    pub aliases: Vec<AliasData>,

    pub named_metadata: Vec<NamedMdNode>,
    pub md_nodes: PrimaryMap<MdNodeId, MdNode>,
    md_kind_names: Vec<String>,

    /// Top-level inline assembly; empty when absent.
    pub inline_asm: String,
}

impl Module {
    pub fn new(ctx: ModuleCtx) -> Self {
        Self {
            ctx,
            funcs: PrimaryMap::default(),
            aliases: Vec::new(),
            named_metadata: Vec::new(),
            md_nodes: PrimaryMap::default(),
            md_kind_names: vec!["dbg".to_string()],
            inline_asm: String::new(),
        }
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = FuncRef> {
        self.funcs.keys()
    }

    pub fn func_name(&self, func: FuncRef) -> &str {
        self.funcs[func].sig.name()
    }

    pub fn global_ref_name(&self, gv: GlobalRef) -> String {
        match gv {
            GlobalRef::Var(gv) => self.ctx.with_gv_store(|s| s.gv_data(gv).symbol.clone()),
            GlobalRef::Func(func) => self.func_name(func).to_string(),
        }
    }

    pub fn register_md_kind(&mut self, name: &str) -> MdKind {
        if let Some(pos) = self.md_kind_names.iter().position(|n| n == name) {
            return MdKind(pos as u32);
        }
        self.md_kind_names.push(name.to_string());
        MdKind((self.md_kind_names.len() - 1) as u32)
    }

    pub fn md_kind_name(&self, kind: MdKind) -> Option<&str> {
        self.md_kind_names.get(kind.0 as usize).map(String::as_str)
    }

    pub fn make_md_node(&mut self, node: MdNode) -> MdNodeId {
        self.md_nodes.push(node)
    }
}
