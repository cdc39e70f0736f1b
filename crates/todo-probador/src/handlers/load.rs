//! Load command handler

use super::auth::base_client;
use super::print_summary;
use crate::commands::{LoadArgs, LoadKind};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use todo_probar::report::{load_summary, update_performance_md, write_json};
use todo_probar::{HarnessConfig, LoadProfile, LoadTest};

/// Pick the profile to run from the arguments.
pub fn resolve_profile(args: &LoadArgs) -> CliResult<LoadProfile> {
    if !(args.duration_scale.is_finite() && args.duration_scale > 0.0) {
        return Err(CliError::invalid_argument(format!(
            "--duration-scale must be a positive number, got {}",
            args.duration_scale
        )));
    }
    let profile = match &args.profile {
        Some(path) => LoadProfile::load(path)?,
        None => match args.kind {
            LoadKind::Read => LoadProfile::uniform_read(),
            LoadKind::Mixed => LoadProfile::mixed(),
        },
    };
    if (args.duration_scale - 1.0).abs() < f64::EPSILON {
        Ok(profile)
    } else {
        Ok(profile.scaled(args.duration_scale))
    }
}

/// Execute `todo-probador load`.
pub async fn execute_load(config: &CliConfig, args: &LoadArgs) -> CliResult<()> {
    let profile = resolve_profile(args)?;
    let harness = HarnessConfig::from_env()?;
    let credentials = harness.require_credentials()?.clone();
    let client = base_client(&harness)?;

    let result = LoadTest::new(client, credentials, profile).run().await?;

    print_summary(config, &load_summary(&result), result.passed());
    if let Some(path) = &config.output {
        write_json(path, &result)?;
        tracing::info!(path = %path.display(), "load result written");
    }
    if let Some(path) = &args.performance_md {
        update_performance_md(path, std::slice::from_ref(&result))?;
    }

    if result.passed() {
        return Ok(());
    }
    let reason = if !result.token_acquired {
        "no token was obtained".to_string()
    } else if result.total_requests == 0 {
        format!(
            "the service answered none of {} requests",
            result.transport_errors
        )
    } else {
        let failed: Vec<&str> = result
            .thresholds
            .iter()
            .filter(|t| !t.passed)
            .map(|t| t.description.as_str())
            .collect();
        format!("thresholds crossed: {}", failed.join(", "))
    };
    Err(CliError::LoadFailed {
        profile: result.profile_name,
        reason,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn args(kind: LoadKind, scale: f64) -> LoadArgs {
        LoadArgs {
            kind,
            profile: None,
            duration_scale: scale,
            performance_md: None,
        }
    }

    #[test]
    fn test_builtin_profiles() {
        let read = resolve_profile(&args(LoadKind::Read, 1.0)).unwrap();
        assert_eq!(read, LoadProfile::uniform_read());
        let mixed = resolve_profile(&args(LoadKind::Mixed, 1.0)).unwrap();
        assert_eq!(mixed.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_duration_scale() {
        let profile = resolve_profile(&args(LoadKind::Mixed, 0.1)).unwrap();
        assert_eq!(profile.duration(), Duration::from_secs(6));
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        assert!(resolve_profile(&args(LoadKind::Read, 0.0)).is_err());
        assert!(resolve_profile(&args(LoadKind::Read, f64::NAN)).is_err());
    }

    #[test]
    fn test_yaml_profile_overrides_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.yaml");
        let mut custom = LoadProfile::mixed();
        custom.name = "custom".to_string();
        std::fs::write(&path, custom.to_yaml().unwrap()).unwrap();

        let mut load_args = args(LoadKind::Read, 1.0);
        load_args.profile = Some(path);
        assert_eq!(resolve_profile(&load_args).unwrap().name, "custom");
    }

    #[test]
    fn test_missing_yaml_profile_is_error() {
        let mut load_args = args(LoadKind::Read, 1.0);
        load_args.profile = Some("/nonexistent/profile.yaml".into());
        assert!(resolve_profile(&load_args).is_err());
    }
}
