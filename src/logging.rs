use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the process-wide logger. Later calls are no-ops.
///
/// Modules log under a category target (`payment`, `booking`, `contact`,
/// `auth`, `email`, `server`) so one filter can select a category, e.g.
/// `RUST_LOG=info,payment=debug`.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_target(true)
            .try_init();
    });
}
