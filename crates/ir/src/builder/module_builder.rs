use crate::{
    global_variable::{GlobalVariable, GlobalVariableData},
    metadata::{MdNode, MdNodeId, NamedMdNode},
    module::{AliasData, FuncRef, Module, ModuleCtx},
    value::GlobalRef,
    Function, Signature, Type,
};

use super::FunctionBuilder;

pub struct ModuleBuilder {
    pub module: Module,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            module: Module::new(ModuleCtx::new()),
        }
    }

    pub fn ctx(&self) -> &ModuleCtx {
        &self.module.ctx
    }

    pub fn make_global(&mut self, data: GlobalVariableData) -> GlobalVariable {
        self.module.ctx.with_gv_store_mut(|s| s.make_gv(data))
    }

    pub fn declare_function(&mut self, sig: Signature) -> FuncRef {
        let func = Function::new(&self.module.ctx, sig);
        self.module.funcs.push(func)
    }

    pub fn func_mut(&mut self, func: FuncRef) -> &mut Function {
        &mut self.module.funcs[func]
    }

    pub fn func_builder(&mut self, func: FuncRef) -> FunctionBuilder<'_> {
        FunctionBuilder::new(&mut self.module.funcs[func])
    }

    pub fn make_alias(&mut self, name: &str, ty: Type, aliasee: GlobalRef) {
        self.module.aliases.push(AliasData {
            name: name.to_string(),
            ty,
            aliasee,
        });
    }

    pub fn add_named_metadata(&mut self, name: &str, operands: Vec<MdNodeId>) {
        self.module.named_metadata.push(NamedMdNode {
            name: name.to_string(),
            operands,
        });
    }

    pub fn make_md_node(&mut self, node: MdNode) -> MdNodeId {
        self.module.make_md_node(node)
    }

    pub fn set_inline_asm(&mut self, asm: &str) {
        self.module.inline_asm = asm.to_string();
    }

    pub fn build(self) -> Module {
        self.module
    }
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
