use pexe_ir::{module::FuncRef, Module};

use crate::{config::VerifierConfig, report::VerificationReport};

mod function;
mod module;

/// Runs the module pass and then the function pass over every defined
/// function, in declaration order. Verification is synchronous and
/// single-threaded; diagnostics appear in visit order.
pub fn verify_module(module: &Module, cfg: &VerifierConfig) -> VerificationReport {
    let mut report = VerificationReport::default();
    verify_module_into(module, cfg, &mut report);
    report
}

/// Same as [`verify_module`], accumulating into a caller-owned report.
pub fn verify_module_into(module: &Module, cfg: &VerifierConfig, report: &mut VerificationReport) {
    module::collect_module_diagnostics(module, cfg, report);

    for func_ref in module.iter_functions() {
        let func = &module.funcs[func_ref];
        if func.is_declaration() {
            continue;
        }
        function::collect_function_diagnostics(module, func_ref, func, cfg, report);
    }
}

/// Module-level checks only; function bodies are not visited.
pub fn verify_module_only(module: &Module, cfg: &VerifierConfig) -> VerificationReport {
    let mut report = VerificationReport::default();
    module::collect_module_diagnostics(module, cfg, &mut report);
    report
}

/// Checks a single function body.
pub fn verify_function(
    module: &Module,
    func_ref: FuncRef,
    cfg: &VerifierConfig,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    function::collect_function_diagnostics(
        module,
        func_ref,
        &module.funcs[func_ref],
        cfg,
        &mut report,
    );
    report
}

/// The fatal-escalation entry point: prints the report to stderr and panics
/// when any error was recorded.
pub fn verify_module_or_panic(module: &Module, cfg: &VerifierConfig) {
    let report = verify_module(module, cfg);
    if report.has_errors() {
        eprintln!("PEXE_ABI_VERIFY_FAILURE: module");
        eprintln!("{report}");
        panic!("PEXE_ABI_VERIFY_FAILURE");
    }
}
