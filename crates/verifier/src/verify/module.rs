//! Module-level ABI checks: everything that does not require looking at
//! function bodies.

use pexe_ir::{
    constant::ConstExpr, global_variable::GlobalVariableData, module::FuncRef, Constant, Function,
    GlobalVariable, Linkage, Module, Type, Visibility,
};

use crate::{
    config::VerifierConfig,
    diagnostic::{Diagnostic, Location},
    intrinsics::AllowedIntrinsics,
    report::VerificationReport,
    types::is_valid_function_type,
};

pub(crate) fn collect_module_diagnostics(
    module: &Module,
    cfg: &VerifierConfig,
    report: &mut VerificationReport,
) {
    let intrinsics = AllowedIntrinsics::new(&module.ctx);
    let mut verifier = ModuleVerifier {
        module,
        cfg,
        intrinsics,
        seen_entry_point: false,
        report,
    };
    verifier.run();
}

struct ModuleVerifier<'a> {
    module: &'a Module,
    cfg: &'a VerifierConfig,
    intrinsics: AllowedIntrinsics,
    seen_entry_point: bool,
    report: &'a mut VerificationReport,
}

/// The attribute surface shared by global variables and functions.
struct GlobalValueView<'a> {
    is_function: bool,
    is_intrinsic: bool,
    name: &'a str,
    linkage: Linkage,
    visibility: Visibility,
    section: Option<&'a str>,
    addr_space: u32,
    unnamed_addr: bool,
    location: Location,
}

impl GlobalValueView<'_> {
    fn kind_word(&self) -> &'static str {
        if self.is_function {
            "Function"
        } else {
            "Variable"
        }
    }
}

impl ModuleVerifier<'_> {
    fn run(&mut self) {
        if !self.module.inline_asm.is_empty() {
            self.error(
                "Module contains disallowed top-level inline assembly",
                Location::Module,
            );
        }

        let gvs: Vec<(GlobalVariable, GlobalVariableData)> = self.module.ctx.with_gv_store(|s| {
            s.all_gvs()
                .into_iter()
                .map(|gv| (gv, s.gv_data(gv).clone()))
                .collect()
        });
        for (gv, data) in &gvs {
            self.check_global_is_flattened(*gv, data);
            self.check_global_value(&GlobalValueView {
                is_function: false,
                is_intrinsic: false,
                name: &data.symbol,
                linkage: data.linkage,
                visibility: data.visibility,
                section: data.section.as_deref(),
                addr_space: data.addr_space,
                unnamed_addr: data.unnamed_addr,
                location: Location::Global(*gv),
            });

            if data.thread_local {
                self.error(
                    format!(
                        "Variable {} has disallowed \"thread_local\" attribute",
                        data.symbol
                    ),
                    Location::Global(*gv),
                );
            }
            if data.externally_initialized {
                self.error(
                    format!(
                        "Variable {} has disallowed \"externally_initialized\" attribute",
                        data.symbol
                    ),
                    Location::Global(*gv),
                );
            }
        }

        // No aliases for now.
        for alias in &self.module.aliases {
            self.error(
                format!("Variable {} is an alias (disallowed)", alias.name),
                Location::Module,
            );
        }

        for func_ref in self.module.iter_functions() {
            self.check_function(func_ref, &self.module.funcs[func_ref]);
        }

        for named_md in &self.module.named_metadata {
            let whitelisted =
                named_md.name.starts_with("llvm.dbg.") && self.cfg.allow_debug_metadata;
            if !whitelisted {
                self.error(
                    format!("Named metadata node {} is disallowed", named_md.name),
                    Location::Module,
                );
            }
        }

        if !self.seen_entry_point {
            self.error("Module has no entry point (disallowed)", Location::Module);
        }
    }

    fn error(&mut self, message: impl Into<String>, location: Location) {
        self.report.push(
            Diagnostic::error(message, location),
            self.cfg.max_diagnostics,
        );
    }

    /// Linkage, visibility and section-like attributes are checked the same
    /// way for variables and functions.
    fn check_global_value(&mut self, view: &GlobalValueView<'_>) {
        match view.linkage {
            Linkage::External => self.check_external_symbol(view),
            Linkage::Internal => {}
            other => {
                self.error(
                    format!(
                        "{} {} has disallowed linkage type: {}",
                        view.kind_word(),
                        view.name,
                        other
                    ),
                    view.location,
                );
            }
        }

        if view.visibility != Visibility::Default {
            self.error(
                format!(
                    "{} {} has disallowed visibility: {}",
                    view.kind_word(),
                    view.name,
                    view.visibility
                ),
                view.location,
            );
        }
        if view.section.is_some() {
            self.error(
                format!(
                    "{} {} has disallowed \"section\" attribute",
                    view.kind_word(),
                    view.name
                ),
                view.location,
            );
        }
        if view.addr_space != 0 {
            self.error(
                format!(
                    "{} {} has addrspace attribute (disallowed)",
                    view.kind_word(),
                    view.name
                ),
                view.location,
            );
        }
        // "unnamed_addr" would let the translator merge duplicate
        // definitions; that belongs in user-toolchain optimization.
        if view.unnamed_addr {
            self.error(
                format!(
                    "{} {} has disallowed \"unnamed_addr\" attribute",
                    view.kind_word(),
                    view.name
                ),
                view.location,
            );
        }
    }

    /// Only `_start` (a function) and `__pnacl_pso_root` (a variable) may be
    /// external, and only one of them per module.
    fn check_external_symbol(&mut self, view: &GlobalValueView<'_>) {
        if view.is_function && view.is_intrinsic {
            return;
        }

        let valid_entry = (view.is_function && view.name == "_start")
            || (!view.is_function && view.name == "__pnacl_pso_root");
        if !valid_entry {
            self.error(
                format!("{} is not a valid external symbol (disallowed)", view.name),
                view.location,
            );
        } else {
            if self.seen_entry_point {
                self.error("Module has multiple entry points (disallowed)", Location::Module);
            }
            self.seen_entry_point = true;
        }
    }

    /// Initializers must have the normal form produced by global flattening.
    fn check_global_is_flattened(&mut self, gv: GlobalVariable, data: &GlobalVariableData) {
        let Some(init) = &data.initializer else {
            self.error(
                format!(
                    "Global variable {} has no initializer (disallowed)",
                    data.symbol
                ),
                Location::Global(gv),
            );
            return;
        };

        if self.is_simple_element(init) || self.is_compound_element(init) {
            return;
        }
        self.error(
            format!(
                "Global variable {} has non-flattened initializer (disallowed): {}",
                data.symbol,
                init.display(self.module)
            ),
            Location::Global(gv),
        );
    }

    /// A SimpleElement is an `[N x i8]` literal or zeroinitializer, or an
    /// i32 relocation: `ptrtoint (@g)`, optionally with a constant addend
    /// `add (ptrtoint (@g), ADDEND)`.
    fn is_simple_element(&self, init: &Constant) -> bool {
        let ty = init.ty();
        if let Some((elem, _)) = self.module.ctx.with_ty_store(|s| s.array_def(ty)) {
            return elem == Type::I8
                && matches!(
                    init,
                    Constant::AggregateZero(..) | Constant::DataArray { .. }
                );
        }

        if ty == Type::I32 {
            if let Constant::Expr { expr, .. } = init {
                match expr {
                    ConstExpr::PtrToInt(_) => return true,
                    ConstExpr::Add(lhs, rhs) => {
                        return is_ptrtoint_of_global(lhs) && is_constant_int(rhs);
                    }
                }
            }
        }
        false
    }

    /// A CompoundElement is a packed, anonymous struct of two or more
    /// SimpleElements.
    fn is_compound_element(&self, init: &Constant) -> bool {
        let Constant::Struct { fields, ty } = init else {
            return false;
        };

        let shape_ok = self.module.ctx.with_ty_store(|s| {
            s.struct_def(*ty)
                .map(|def| def.packed && def.name.is_none())
                .unwrap_or(false)
        });
        if !shape_ok || fields.len() <= 1 {
            return false;
        }
        fields.iter().all(|field| self.is_simple_element(field))
    }

    fn check_function(&mut self, func_ref: FuncRef, func: &Function) {
        let name = func.sig.name();

        if func.is_intrinsic() {
            if !self
                .intrinsics
                .is_allowed(&self.module.ctx, func, self.cfg)
            {
                self.error(
                    format!("Function {name} is a disallowed LLVM intrinsic"),
                    Location::Function(func_ref),
                );
            }
        } else {
            // Intrinsic types are fixed and carry argument types (such as
            // i8) that the subset otherwise rejects, so only non-intrinsics
            // get the function-type check.
            let fn_ty = func.sig.func_ty(&self.module.ctx);
            if !is_valid_function_type(&self.module.ctx, fn_ty) {
                self.error(
                    format!(
                        "Function {name} has disallowed type: {}",
                        fn_ty.display(&self.module.ctx)
                    ),
                    Location::Function(func_ref),
                );
            }
            // Declarations would be rejected here, but in streaming mode a
            // function that is defined may simply not be read in yet.
            if !self.cfg.streaming_mode && func.is_declaration() {
                self.error(
                    format!("Function {name} is declared but not defined (disallowed)"),
                    Location::Function(func_ref),
                );
            }
            if !func.attributes.is_empty() {
                let mut attrs = String::new();
                for attr in &func.attributes {
                    attrs.push(' ');
                    attrs.push_str(attr);
                }
                self.error(
                    format!("Function {name} has disallowed attributes:{attrs}"),
                    Location::Function(func_ref),
                );
            }
            if func.calling_conv != pexe_ir::CallConv::C {
                self.error(
                    format!(
                        "Function {name} has disallowed calling convention: {}",
                        func.calling_conv
                    ),
                    Location::Function(func_ref),
                );
            }
        }

        self.check_global_value(&GlobalValueView {
            is_function: true,
            is_intrinsic: func.is_intrinsic(),
            name,
            linkage: func.sig.linkage(),
            visibility: func.visibility,
            section: func.section.as_deref(),
            addr_space: func.addr_space,
            unnamed_addr: func.unnamed_addr,
            location: Location::Function(func_ref),
        });

        if func.gc_name.is_some() {
            self.error(
                format!("Function {name} has disallowed \"gc\" attribute"),
                Location::Function(func_ref),
            );
        }
        // Useful function alignments are architecture- and sandbox-specific,
        // so the subset does not let modules specify them.
        if func.align != 0 {
            self.error(
                format!("Function {name} has disallowed \"align\" attribute"),
                Location::Function(func_ref),
            );
        }
    }
}

fn is_ptrtoint_of_global(constant: &Constant) -> bool {
    matches!(
        constant,
        Constant::Expr {
            expr: ConstExpr::PtrToInt(_),
            ..
        }
    )
}

fn is_constant_int(constant: &Constant) -> bool {
    matches!(constant, Constant::Imm(imm) if imm.is_integer())
}
