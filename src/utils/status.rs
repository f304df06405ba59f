use tracing::warn;

/// Retained for compatibility with scripts written for the hosted platform
///
/// Reporting a run status has no destination outside that platform, so this
/// only emits a deprecation warning.
pub fn status(kind: &str, message: Option<&str>) {
    warn!(
        "status({}, {:?}) is no longer in use following the hosted platform shutdown",
        kind, message
    );
}
