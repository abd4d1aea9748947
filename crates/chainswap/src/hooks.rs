use crate::core::env::Env;

/// Teardown run when the module is uninstalled: every action that opens the
/// swap wizard is removed, whichever swapper created it. Returns the number
/// of actions removed.
pub fn uninstall_hook(env: &mut Env) -> usize {
    let removed = env.remove_all_bound_actions();
    tracing::info!(removed, "uninstall hook ran");

    removed
}
