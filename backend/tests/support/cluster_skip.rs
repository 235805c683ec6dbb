//! Skip policy for suites that need embedded PostgreSQL.
//!
//! Cluster failures fail the test by default. Environments that cannot start
//! PostgreSQL opt out with `SKIP_TEST_CLUSTER=1`.

/// True when `SKIP_TEST_CLUSTER` is `1`, `true`, or `yes` (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Report a cluster setup failure.
///
/// Prints a skip marker and returns `None` when `SKIP_TEST_CLUSTER` is truthy;
/// panics otherwise so a broken cluster never reports as a pass.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
