/// Returned when no usable final text was produced.
pub const FALLBACK_RESPONSE: &str =
    "I wasn't able to finish this request within the allowed number of steps. Please try again or narrow the request.";

pub(super) fn final_round_instruction(max_rounds: usize) -> String {
    format!(
        "You have reached the maximum of {max_rounds} tool rounds for this turn. \
         Do not call any more tools. Reply now with a plain-text summary of what you found \
         and what remains to be done."
    )
}

pub(super) fn loop_warning(reason: &str) -> String {
    format!(
        "Warning: {reason}. Change your approach or answer with what you already have instead of repeating the same tool calls."
    )
}

pub(super) fn skipped_call(reason: &str) -> String {
    format!("Skipped: the run was stopped because the agent {reason}.")
}
