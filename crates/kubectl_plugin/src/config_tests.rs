use super::*;
use serial_test::serial;
use std::io::Write;

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn cli_with_command(command: &str) -> Cli {
    Cli {
        kubectl: Some(command.to_string()),
        ..Cli::default()
    }
}

// ================================
// Cli parsing
// ================================

#[test]
fn test_cli_parses_all_flags() {
    let cli = Cli::parse_from([
        "kubectl-plugin",
        "--dry-run",
        "--files",
        "a.yaml,b.yaml",
        "--kubectl",
        "apply",
        "--namespace",
        "drone",
        "--templates",
        "deploy.yaml",
        "--debug",
        "--strict-templates",
    ]);

    assert!(cli.dry_run);
    assert_eq!(cli.files, vec!["a.yaml", "b.yaml"]);
    assert_eq!(cli.kubectl.as_deref(), Some("apply"));
    assert_eq!(cli.namespace.as_deref(), Some("drone"));
    assert_eq!(cli.templates, vec![PathBuf::from("deploy.yaml")]);
    assert!(cli.debug);
    assert!(cli.strict_templates);
}

#[test]
fn test_cli_defaults_when_no_flags() {
    let cli = Cli::parse_from(["kubectl-plugin"]);
    assert!(!cli.dry_run);
    assert!(cli.files.is_empty());
    assert!(cli.kubectl.is_none());
    assert!(cli.templates.is_empty());
}

// ================================
// resolve
// ================================

#[test]
fn test_resolve_requires_kubectl_command() {
    let result = PluginConfig::resolve(&Cli::default(), &env(&[]));
    match result {
        Err(Error::Config(message)) => assert!(message.contains("no kubectl command")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_resolve_empty_command_is_missing() {
    let result = PluginConfig::resolve(&cli_with_command(""), &env(&[("PLUGIN_KUBECTL", "")]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_resolve_reads_plugin_variables() {
    let config = PluginConfig::resolve(
        &Cli::default(),
        &env(&[
            ("PLUGIN_KUBECTL", "apply"),
            ("PLUGIN_FILES", "a.yaml, b.yaml,,"),
            ("PLUGIN_NAMESPACE", "drone"),
            ("PLUGIN_TEMPLATES", "deploy.yaml"),
            ("PLUGIN_DRY_RUN", "true"),
            ("PLUGIN_DEBUG", "1"),
            ("PLUGIN_STRICT_TEMPLATES", "T"),
        ]),
    )
    .unwrap();

    assert_eq!(
        config,
        PluginConfig {
            dry_run: true,
            files: vec!["a.yaml".to_string(), "b.yaml".to_string()],
            kubectl: "apply".to_string(),
            namespace: "drone".to_string(),
            templates: vec![PathBuf::from("deploy.yaml")],
            debug: true,
            strict_templates: true,
        }
    );
}

#[test]
fn test_resolve_falls_back_to_legacy_names() {
    let config = PluginConfig::resolve(
        &Cli::default(),
        &env(&[
            ("KUBECTL", "get pods"),
            ("NAMESPACE", "legacy"),
            ("FILES", "pod.yaml"),
            ("DRY_RUN", "False"),
        ]),
    )
    .unwrap();

    assert_eq!(config.kubectl, "get pods");
    assert_eq!(config.namespace, "legacy");
    assert_eq!(config.files, vec!["pod.yaml"]);
    assert!(!config.dry_run);
}

#[test]
fn test_resolve_plugin_prefix_wins_over_legacy() {
    let config = PluginConfig::resolve(
        &Cli::default(),
        &env(&[
            ("PLUGIN_KUBECTL", "apply"),
            ("KUBECTL", "delete"),
            ("PLUGIN_NAMESPACE", ""),
            ("NAMESPACE", "legacy"),
        ]),
    )
    .unwrap();

    assert_eq!(config.kubectl, "apply");
    // An empty PLUGIN_ value counts as unset
    assert_eq!(config.namespace, "legacy");
}

#[test]
fn test_resolve_flags_win_over_environment() {
    let cli = Cli {
        kubectl: Some("apply".to_string()),
        files: vec!["flag.yaml".to_string()],
        namespace: Some("flag-ns".to_string()),
        ..Cli::default()
    };
    let config = PluginConfig::resolve(
        &cli,
        &env(&[
            ("PLUGIN_KUBECTL", "delete"),
            ("PLUGIN_FILES", "env.yaml"),
            ("PLUGIN_NAMESPACE", "env-ns"),
        ]),
    )
    .unwrap();

    assert_eq!(config.kubectl, "apply");
    assert_eq!(config.files, vec!["flag.yaml"]);
    assert_eq!(config.namespace, "flag-ns");
}

#[test]
fn test_resolve_set_flag_ignores_bad_environment_boolean() {
    let cli = Cli {
        dry_run: true,
        ..cli_with_command("apply")
    };
    let config = PluginConfig::resolve(&cli, &env(&[("PLUGIN_DRY_RUN", "maybe")])).unwrap();
    assert!(config.dry_run);
}

#[test]
fn test_resolve_rejects_unparseable_boolean() {
    let result = PluginConfig::resolve(&cli_with_command("apply"), &env(&[("DEBUG", "yes")]));
    match result {
        Err(Error::Config(message)) => {
            assert!(message.contains("DEBUG"));
            assert!(message.contains("yes"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_resolve_defaults() {
    let config = PluginConfig::resolve(&cli_with_command("apply"), &env(&[])).unwrap();
    assert!(!config.dry_run);
    assert!(!config.debug);
    assert!(!config.strict_templates);
    assert!(config.files.is_empty());
    assert!(config.templates.is_empty());
    assert_eq!(config.namespace, "");
}

#[test]
fn test_debug_requested_tolerates_bad_values() {
    assert!(!debug_requested(&Cli::default(), &env(&[("DEBUG", "yes")])));
    assert!(debug_requested(&Cli::default(), &env(&[("PLUGIN_DEBUG", "true")])));
    assert!(debug_requested(
        &Cli {
            debug: true,
            ..Cli::default()
        },
        &env(&[])
    ));
}

// ================================
// parsing helpers
// ================================

#[test]
fn test_parse_bool_spellings() {
    for value in ["1", "t", "T", "TRUE", "true", "True"] {
        assert_eq!(parse_bool(value), Some(true), "{value}");
    }
    for value in ["0", "f", "F", "FALSE", "false", "False"] {
        assert_eq!(parse_bool(value), Some(false), "{value}");
    }
    for value in ["", "yes", "on", "tRuE", " true"] {
        assert_eq!(parse_bool(value), None, "{value:?}");
    }
}

#[test]
fn test_parse_list_trims_and_drops_empty_entries() {
    assert_eq!(parse_list(" a.yaml , ,b.yaml,"), vec!["a.yaml", "b.yaml"]);
    assert!(parse_list("").is_empty());
    assert!(parse_list(" , ").is_empty());
}

// ================================
// env file
// ================================

#[test]
fn test_load_env_file_without_variable_is_noop() {
    assert_eq!(load_env_file(&env(&[])).unwrap(), None);
    assert_eq!(load_env_file(&env(&[(ENV_FILE_VAR, "")])).unwrap(), None);
}

#[test]
fn test_load_env_file_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.env");
    let result = load_env_file(&env(&[(ENV_FILE_VAR, missing.to_str().unwrap())]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_env_file_does_not_override_existing_variables() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "KUBECTL_PLUGIN_TEST_NEW=from-file").unwrap();
    writeln!(file, "KUBECTL_PLUGIN_TEST_EXISTING=from-file").unwrap();

    std::env::set_var("KUBECTL_PLUGIN_TEST_EXISTING", "from-process");
    std::env::remove_var("KUBECTL_PLUGIN_TEST_NEW");

    let loaded = load_env_file(&env(&[(ENV_FILE_VAR, file.path().to_str().unwrap())])).unwrap();

    assert_eq!(loaded.as_deref(), Some(file.path()));
    assert_eq!(
        ProcessEnv.var("KUBECTL_PLUGIN_TEST_NEW").as_deref(),
        Some("from-file")
    );
    assert_eq!(
        ProcessEnv.var("KUBECTL_PLUGIN_TEST_EXISTING").as_deref(),
        Some("from-process")
    );

    std::env::remove_var("KUBECTL_PLUGIN_TEST_NEW");
    std::env::remove_var("KUBECTL_PLUGIN_TEST_EXISTING");
}

#[test]
#[serial]
fn test_process_env_snapshot_contains_set_variable() {
    std::env::set_var("KUBECTL_PLUGIN_TEST_SNAPSHOT", "present");
    let snapshot = ProcessEnv.snapshot();
    std::env::remove_var("KUBECTL_PLUGIN_TEST_SNAPSHOT");

    assert!(snapshot
        .iter()
        .any(|(name, value)| name == "KUBECTL_PLUGIN_TEST_SNAPSHOT" && value == "present"));
}
