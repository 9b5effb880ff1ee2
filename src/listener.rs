use crate::config_set::AtnConfigSet;
use crate::{ConsoleErrorListener, IErrorListener, SilentErrorListener};
use bit_set::BitSet;

impl IErrorListener for ConsoleErrorListener {
    fn report_ambiguity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        exact: bool,
        ambig_alts: &BitSet,
        _configs: &AtnConfigSet,
    ) {
        println!(
            "Ambiguity in decision {} between alternatives {:?} for input {}..{} (exact: {})",
            decision,
            ambig_alts.iter().collect::<Vec<usize>>(),
            start_index,
            stop_index,
            exact
        );
    }

    fn report_attempting_full_context(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        conflicting_alts: &BitSet,
        _configs: &AtnConfigSet,
    ) {
        println!(
            "Local prediction conflicted in decision {} on alternatives {:?} for input {}..{}; retrying with full context",
            decision,
            conflicting_alts.iter().collect::<Vec<usize>>(),
            start_index,
            stop_index
        );
    }

    fn report_context_sensitivity(
        &mut self,
        decision: usize,
        start_index: usize,
        stop_index: usize,
        prediction: usize,
        _configs: &AtnConfigSet,
    ) {
        println!(
            "Decision {} is context sensitive for input {}..{}; full context predicted alternative {}",
            decision, start_index, stop_index, prediction
        );
    }
}

impl IErrorListener for SilentErrorListener {
    fn report_ambiguity(
        &mut self,
        _decision: usize,
        _start_index: usize,
        _stop_index: usize,
        _exact: bool,
        _ambig_alts: &BitSet,
        _configs: &AtnConfigSet,
    ) {
    }

    fn report_attempting_full_context(
        &mut self,
        _decision: usize,
        _start_index: usize,
        _stop_index: usize,
        _conflicting_alts: &BitSet,
        _configs: &AtnConfigSet,
    ) {
    }

    fn report_context_sensitivity(
        &mut self,
        _decision: usize,
        _start_index: usize,
        _stop_index: usize,
        _prediction: usize,
        _configs: &AtnConfigSet,
    ) {
    }
}
