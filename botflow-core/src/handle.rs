//! Control-flow handle grammar.
//!
//! Edge endpoints in a persisted graph document carry handle identifiers.
//! Source handles of the form `t<signed-int>` (plus the bare sentinel `-`,
//! shorthand for `-1`) mark control-flow outcomes; the fixed target handle
//! `in` is the unique control-flow entry. Every other handle string belongs
//! to the data/variable layer and is invisible to the state-machine
//! compiler. The grammar must stay byte-for-byte compatible with documents
//! already persisted by the editor.

/// Decode a source-handle string into a control-flow outcome number.
///
/// Returns `Some(-1)` for the bare sentinel `-`, `Some(n)` for `t<n>`,
/// and `None` for anything else. A non-match is a normal outcome, not an
/// error: data-layer handles flow through here too.
pub fn decode_control_flow(handle: &str) -> Option<i64> {
    if handle == "-" {
        return Some(-1);
    }
    handle.strip_prefix('t')?.parse::<i64>().ok()
}

/// True iff `handle` is the control-flow entry handle on the target side.
pub fn is_entry_handle(handle: &str) -> bool {
    handle == "in"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_signed_outcomes() {
        assert_eq!(decode_control_flow("t-1"), Some(-1));
        assert_eq!(decode_control_flow("t0"), Some(0));
        assert_eq!(decode_control_flow("t3"), Some(3));
        assert_eq!(decode_control_flow("t42"), Some(42));
    }

    #[test]
    fn bare_dash_is_minus_one() {
        assert_eq!(decode_control_flow("-"), Some(-1));
    }

    #[test]
    fn data_layer_handles_do_not_decode() {
        assert_eq!(decode_control_flow("in"), None);
        assert_eq!(decode_control_flow("out"), None);
        assert_eq!(decode_control_flow("t"), None);
        assert_eq!(decode_control_flow("tx"), None);
        assert_eq!(decode_control_flow("var-url"), None);
        assert_eq!(decode_control_flow(""), None);
    }

    #[test]
    fn entry_handle_is_exactly_in() {
        assert!(is_entry_handle("in"));
        assert!(!is_entry_handle("In"));
        assert!(!is_entry_handle("out"));
        assert!(!is_entry_handle("t0"));
    }
}
