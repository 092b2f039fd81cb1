//! Deterministic mapping from a Slack thread to an agent-runtime conversation.

use uuid::Uuid;

/// Derives the stable conversation id for a thread. Name-based (uuid v5),
/// so the same `(thread_ts, channel)` pair yields the same id across
/// calls and process restarts. The composition order of the name string
/// is fixed forever: changing it would fork every existing thread into a
/// fresh agent conversation.
pub(crate) fn thread_conversation_id(thread_ts: &str, channel: &str) -> String {
    let name = format!("SLACK:{thread_ts}-{channel}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_always_yield_same_id() {
        let first = thread_conversation_id("1700000000.123456", "C0123456789");
        let second = thread_conversation_id("1700000000.123456", "C0123456789");
        assert_eq!(first, second);
    }

    #[test]
    fn ids_are_stable_across_process_restarts() {
        // Fixtures computed independently with RFC 4122 uuid5 over the
        // DNS namespace.
        assert_eq!(
            thread_conversation_id("1700000000.123456", "C0123456789"),
            "89895492-ab3f-5962-b5f3-36a4a3199342"
        );
        assert_eq!(
            thread_conversation_id("42.0", "D024BE91L"),
            "9efc946d-9e76-5814-97b9-7574cb25078e"
        );
    }

    #[test]
    fn distinct_pairs_yield_distinct_ids() {
        let base = thread_conversation_id("1.0", "C1");
        assert_ne!(base, thread_conversation_id("1.0", "C2"));
        assert_ne!(base, thread_conversation_id("2.0", "C1"));
        assert_ne!(base, thread_conversation_id("1.1", "C1"));
    }
}
