//! Fixed test IDs for deterministic tests
//!
//! Using fixed values prevents flaky tests caused by random data. Key ids
//! only need to be unique strings; the cache itself generates UUIDs.

// Signing Key IDs
pub const TEST_KEY_ID_1: &str = "00000000-0000-4000-8000-000000000001";
pub const TEST_KEY_ID_2: &str = "00000000-0000-4000-8000-000000000002";
pub const TEST_KEY_ID_UNKNOWN: &str = "00000000-0000-4000-8000-0000000000ff";

// Tenants
pub const TEST_TENANT_ACME: &str = "tenant-acme";
pub const TEST_TENANT_GLOBEX: &str = "tenant-globex";

// Subjects
pub const TEST_SUBJECT_ALICE: &str = "alice@acme.test";
pub const TEST_SUBJECT_BOB: &str = "bob@globex.test";

// Issuer settings
pub const TEST_ISSUER: &str = "https://issuer.test";
pub const TEST_AUDIENCE: &str = "urn:keyward:test";

// Scopes and groups
pub const SCOPE_READ: &str = "read";
pub const SCOPE_WRITE: &str = "write";
pub const GROUP_ADMIN: &str = "admin";
pub const GROUP_USER: &str = "user";

/// Fixed instant for `*_at` tests: 2023-11-14T22:13:20Z.
pub const TEST_EPOCH: i64 = 1_700_000_000;
