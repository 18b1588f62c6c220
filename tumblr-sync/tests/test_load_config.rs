use std::collections::HashMap;
use std::env;

use serial_test::serial;
use tumblr_sync::load_config::{load_settings, load_settings_from, ConfigError};

const REQUIRED: [(&str, &str); 10] = [
    ("TUMBLR_PORT", "8080"),
    ("TUMBLR_GITHUB_TOKEN", "ghp_token"),
    ("TUMBLR_GITHUB_USER", "octocat"),
    ("TUMBLR_GITHUB_AUTHOR_NAME", "Octo Cat"),
    ("TUMBLR_GITHUB_AUTHOR_EMAIL", "octo@example.com"),
    ("TUMBLR_CONSUMER_KEY", "ck"),
    ("TUMBLR_CONSUMER_SECRET", "cs"),
    ("TUMBLR_USER_TOKEN", "ut"),
    ("TUMBLR_USER_TOKEN_SECRET", "uts"),
    ("TUMBLR_BLOG_ID", "example.tumblr.com"),
];

fn env_with(extra: &[(&str, &str)]) -> HashMap<String, String> {
    REQUIRED
        .iter()
        .chain(extra.iter())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn load(vars: &HashMap<String, String>) -> Result<tumblr_sync_core::config::Settings, ConfigError> {
    load_settings_from(|key| vars.get(key).cloned())
}

#[test]
fn test_load_settings_applies_defaults() {
    let settings = load(&env_with(&[])).expect("settings should load");

    assert_eq!(settings.port, 8080);
    assert_eq!(settings.github_user, "octocat");
    assert_eq!(settings.github_repo, None);
    assert_eq!(settings.github_branch, "master");
    assert_eq!(settings.post_limit, 5);
    assert_eq!(settings.default_repo, "colinseymour.co.uk");
    assert_eq!(
        settings.routes,
        vec![
            ("run".to_string(), "gonefora.run".to_string()),
            ("tech".to_string(), "lildude.co.uk".to_string()),
        ]
    );
    assert_eq!(settings.webhook_secret, None);
}

#[test]
fn test_load_settings_reads_optional_values() {
    let settings = load(&env_with(&[
        ("TUMBLR_GITHUB_REPO", "pinned.example"),
        ("TUMBLR_GITHUB_BRANCH", "main"),
        ("TUMBLR_POST_LIMIT", "20"),
        ("TUMBLR_REPO_ROUTES", "cook=recipes.example"),
        ("TUMBLR_DEFAULT_REPO", "blog.example"),
        ("TUMBLR_WEBHOOK_SECRET", "hook"),
    ]))
    .expect("settings should load");

    assert_eq!(settings.github_repo.as_deref(), Some("pinned.example"));
    assert_eq!(settings.github_branch, "main");
    assert_eq!(settings.post_limit, 20);
    assert_eq!(
        settings.routes,
        vec![("cook".to_string(), "recipes.example".to_string())]
    );
    assert_eq!(settings.default_repo, "blog.example");
    assert_eq!(settings.webhook_secret.as_deref(), Some("hook"));
    assert_eq!(settings.router().route(&["cook".to_string()]), "pinned.example");
}

#[test]
fn test_port_falls_back_to_plain_port() {
    let mut vars = env_with(&[("PORT", "9090")]);
    vars.remove("TUMBLR_PORT");
    let settings = load(&vars).expect("settings should load");
    assert_eq!(settings.port, 9090);
}

#[test]
fn test_every_missing_key_is_reported_at_once() {
    let mut vars = env_with(&[]);
    vars.remove("TUMBLR_GITHUB_TOKEN");
    vars.remove("TUMBLR_BLOG_ID");
    vars.insert("TUMBLR_CONSUMER_KEY".to_string(), "   ".to_string());

    let err = load(&vars).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Missing(vec![
            "TUMBLR_GITHUB_TOKEN".to_string(),
            "TUMBLR_CONSUMER_KEY".to_string(),
            "TUMBLR_BLOG_ID".to_string(),
        ])
    );
    assert!(err.to_string().contains("TUMBLR_GITHUB_TOKEN, TUMBLR_CONSUMER_KEY"));
}

#[test]
fn test_bad_port_does_not_hide_missing_keys() {
    let mut vars = env_with(&[("TUMBLR_PORT", "http")]);
    vars.remove("TUMBLR_USER_TOKEN");

    let err = load(&vars).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Missing(vec!["TUMBLR_USER_TOKEN".to_string()])
    );
}

#[test]
fn test_malformed_optional_values_are_rejected() {
    let err = load(&env_with(&[("TUMBLR_POST_LIMIT", "five")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "TUMBLR_POST_LIMIT"));

    let err = load(&env_with(&[("TUMBLR_REPO_ROUTES", "run")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "TUMBLR_REPO_ROUTES"));

    let err = load(&env_with(&[("TUMBLR_PORT", "http")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
}

#[test]
#[serial]
fn test_load_settings_from_process_environment() {
    for (key, value) in REQUIRED {
        env::set_var(key, value);
    }
    env::set_var("TUMBLR_POST_LIMIT", "3");

    let settings = load_settings().expect("settings should load from env");
    assert_eq!(settings.post_limit, 3);
    assert_eq!(settings.blog_id, "example.tumblr.com");

    for (key, _) in REQUIRED {
        env::remove_var(key);
    }
    env::remove_var("TUMBLR_POST_LIMIT");
}
