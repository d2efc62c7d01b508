//! Hook execution inside a running instance.
//!
//! The protocol is fixed: copy the script to a temporary guest path, execute
//! it with the mode as its single argument under the administrative account,
//! then remove the copy regardless of exit status. Hooks are an external
//! contract and must be idempotent per mode; the executor never retries.

use std::path::Path;

use anyhow::Result;

use crate::application::ports::GuestExecutor;
use crate::domain::error::HookError;

/// Fixed guest-side path the hook script is staged at.
pub const HOOK_GUEST_PATH: &str = "/tmp/.cabin-hook";

/// Mode argument passed to a hook script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    /// Apply hardening configuration.
    Enable,
    /// Roll hardening configuration back.
    Disable,
    /// Report current hardening posture on stdout.
    Status,
    /// First-boot provisioning.
    Run,
    /// Re-apply after restart without touching existing config.
    Resume,
}

impl HookMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HookMode::Enable => "enable",
            HookMode::Disable => "disable",
            HookMode::Status => "status",
            HookMode::Run => "run",
            HookMode::Resume => "resume",
        }
    }
}

/// Execute `script` inside `container` with `mode` as its sole argument.
///
/// Returns the hook's stdout on success.
///
/// # Errors
///
/// Returns [`HookError::ScriptMissing`] when the script does not exist on
/// the host, [`HookError::CopyFailed`] when staging fails, and
/// [`HookError::Failed`] when the hook exits non-zero. No automatic retry.
pub async fn run_hook(
    rt: &impl GuestExecutor,
    container: &str,
    script: &Path,
    mode: HookMode,
) -> Result<String> {
    if !script.exists() {
        return Err(HookError::ScriptMissing(script.display().to_string()).into());
    }

    let local = script.display().to_string();
    let copied = rt.copy_in(container, &local, HOOK_GUEST_PATH).await?;
    if !copied.status.success() {
        return Err(HookError::CopyFailed(super::stderr_of(&copied)).into());
    }

    let chmod = rt
        .exec(container, &["chmod", "700", HOOK_GUEST_PATH])
        .await?;
    if !chmod.status.success() {
        return Err(HookError::CopyFailed(super::stderr_of(&chmod)).into());
    }

    let result = rt.exec(container, &[HOOK_GUEST_PATH, mode.as_str()]).await;

    // The staged copy is removed no matter how execution went.
    let _ = rt.exec(container, &["rm", "-f", HOOK_GUEST_PATH]).await;

    let out = result?;
    if out.status.success() {
        Ok(super::stdout_of(&out))
    } else {
        Err(HookError::Failed {
            mode: mode.as_str(),
            code: out.status.code().unwrap_or(-1),
            stderr: super::stderr_of(&out),
        }
        .into())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::services::test_support::StubRuntime;
    use tempfile::TempDir;

    fn script_in(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("harden.sh");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write script");
        path
    }

    #[tokio::test]
    async fn copies_executes_and_removes_the_staged_script() {
        let dir = TempDir::new().expect("tempdir");
        let rt = StubRuntime::new();
        run_hook(&rt, "cabin-demo", &script_in(&dir), HookMode::Enable)
            .await
            .expect("hook");
        let calls = rt.calls();
        assert!(calls.iter().any(|c| c.starts_with("copy_in cabin-demo")));
        assert!(
            calls
                .iter()
                .any(|c| c == &format!("exec cabin-demo {HOOK_GUEST_PATH} enable"))
        );
        assert_eq!(
            calls.last().expect("calls"),
            &format!("exec cabin-demo rm -f {HOOK_GUEST_PATH}")
        );
    }

    #[tokio::test]
    async fn missing_script_fails_before_touching_the_instance() {
        let rt = StubRuntime::new();
        let err = run_hook(
            &rt,
            "cabin-demo",
            Path::new("/nonexistent/harden.sh"),
            HookMode::Enable,
        )
        .await
        .expect_err("must fail");
        assert!(err.to_string().contains("not found"), "got: {err}");
        assert!(rt.calls().is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_surfaces_as_hook_failure_and_still_cleans_up() {
        let dir = TempDir::new().expect("tempdir");
        let rt = StubRuntime::new();
        rt.fail_on("exec-hook");
        let err = run_hook(&rt, "cabin-demo", &script_in(&dir), HookMode::Enable)
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("enable"), "got: {err}");
        assert!(
            rt.calls()
                .last()
                .expect("calls")
                .contains(&format!("rm -f {HOOK_GUEST_PATH}"))
        );
    }

    #[tokio::test]
    async fn enable_twice_stages_exactly_one_copy_each_time() {
        // The guest path is fixed, so a second enable overwrites rather than
        // accumulating configuration artifacts.
        let dir = TempDir::new().expect("tempdir");
        let rt = StubRuntime::new();
        let script = script_in(&dir);
        run_hook(&rt, "cabin-demo", &script, HookMode::Enable)
            .await
            .expect("first");
        run_hook(&rt, "cabin-demo", &script, HookMode::Enable)
            .await
            .expect("second");
        let copies = rt
            .calls()
            .iter()
            .filter(|c| c.starts_with("copy_in"))
            .count();
        let removals = rt
            .calls()
            .iter()
            .filter(|c| c.contains("rm -f"))
            .count();
        assert_eq!(copies, 2);
        assert_eq!(removals, 2, "every staging is paired with a removal");
    }

    #[test]
    fn mode_strings_match_the_script_contract() {
        assert_eq!(HookMode::Enable.as_str(), "enable");
        assert_eq!(HookMode::Disable.as_str(), "disable");
        assert_eq!(HookMode::Status.as_str(), "status");
        assert_eq!(HookMode::Run.as_str(), "run");
        assert_eq!(HookMode::Resume.as_str(), "resume");
    }
}
