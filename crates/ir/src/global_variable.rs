use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;

use crate::{constant::Constant, Linkage, Type, Visibility};

#[derive(Debug, Default)]
pub struct GlobalVariableStore {
    gv_data: PrimaryMap<GlobalVariable, GlobalVariableData>,
    symbols: FxHashMap<String, GlobalVariable>,
}

impl GlobalVariableStore {
    pub fn make_gv(&mut self, gv_data: GlobalVariableData) -> GlobalVariable {
        match self.symbols.entry(gv_data.symbol.to_string()) {
            std::collections::hash_map::Entry::Occupied(_) => {
                panic!("duplicate global symbol `{}`", gv_data.symbol);
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                let gv = self.gv_data.push(gv_data);
                v.insert(gv);
                gv
            }
        }
    }

    pub fn gv_data(&self, gv: GlobalVariable) -> &GlobalVariableData {
        &self.gv_data[gv]
    }

    pub fn gv_data_mut(&mut self, gv: GlobalVariable) -> &mut GlobalVariableData {
        &mut self.gv_data[gv]
    }

    pub fn gv_by_symbol(&self, symbol: &str) -> Option<GlobalVariable> {
        self.symbols.get(symbol).copied()
    }

    pub fn ty(&self, gv: GlobalVariable) -> Type {
        self.gv_data[gv].ty
    }

    /// All globals in declaration order.
    pub fn all_gvs(&self) -> Vec<GlobalVariable> {
        self.gv_data.keys().collect()
    }
}

/// An opaque reference to [`GlobalVariableData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalVariable(pub u32);
cranelift_entity::entity_impl!(GlobalVariable);

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariableData {
    pub symbol: String,
    pub ty: Type,
    pub linkage: Linkage,
    pub visibility: Visibility,
    pub section: Option<String>,
    pub addr_space: u32,
    pub unnamed_addr: bool,
    /// Explicit alignment; 0 means unspecified.
    pub align: u64,
    pub thread_local: bool,
    pub externally_initialized: bool,
    pub initializer: Option<Constant>,
}

impl GlobalVariableData {
    pub fn new(symbol: impl Into<String>, ty: Type, linkage: Linkage) -> Self {
        Self {
            symbol: symbol.into(),
            ty,
            linkage,
            visibility: Visibility::Default,
            section: None,
            addr_space: 0,
            unnamed_addr: false,
            align: 0,
            thread_local: false,
            externally_initialized: false,
            initializer: None,
        }
    }

    pub fn with_init(
        symbol: impl Into<String>,
        ty: Type,
        linkage: Linkage,
        initializer: Constant,
    ) -> Self {
        let mut data = Self::new(symbol, ty, linkage);
        data.initializer = Some(initializer);
        data
    }
}
