use tracing::info;

/// Full-page navigation, owned by the host application.
///
/// Used for the maintenance page, the login redirect and the post-logout
/// return to the home route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);
}

/// Navigator for hosts without a page to move: records the target in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, target: &str) {
        info!(target = %target, "Navigation requested");
    }
}
