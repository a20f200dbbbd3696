//! redb table definitions for the upwatch state store.

use redb::TableDefinition;

/// Manual-test results keyed by `{endpoint_id}`, JSON-encoded values.
pub const MANUAL_TESTS: TableDefinition<&str, &[u8]> = TableDefinition::new("manual_tests");
