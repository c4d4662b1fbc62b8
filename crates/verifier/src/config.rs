/// Verifier configuration, constructed at pass creation and threaded
/// through the checkers. There is no process-wide state.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Accept `llvm.dbg.declare`/`llvm.dbg.value`, named metadata whose
    /// name starts with `llvm.dbg.`, and per-instruction `dbg` attachments.
    pub allow_debug_metadata: bool,

    /// Tolerate function declarations without bodies; in streaming mode
    /// bodies arrive incrementally.
    pub streaming_mode: bool,

    /// Upper bound on recorded diagnostics; 0 means unbounded.
    pub max_diagnostics: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            allow_debug_metadata: false,
            streaming_mode: false,
            max_diagnostics: 200,
        }
    }
}
