use postflow_core::config::PostflowConfig;
use postflow_core::workflow::RejectPolicy;
use std::io::Write;
use std::time::Duration;

const MINIMAL: &str = r#"{
    "slack": {
        "bot_token": "xoxb-1",
        "signing_secret": "shh",
        "channel_id": "C1"
    },
    "openai": {
        "api_key": "sk-1"
    }
}"#;

#[test]
fn test_parse_minimal_config() {
    let config = PostflowConfig::from_json_str(MINIMAL).expect("Failed to parse config");

    assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
    assert_eq!(config.approval.timeout(), Duration::from_secs(3600), "Approval should wait one hour by default");
    assert_eq!(config.approval.max_attempts, 3);
    assert_eq!(config.approval.replay_window(), Duration::from_secs(300));
    assert_eq!(config.approval.reject_policy, RejectPolicy::Regenerate);

    assert_eq!(config.slack.api_base, "https://slack.com/api");
    assert_eq!(config.openai.model, "gpt-3.5-turbo");
    assert!(config.openai.generate_images);

    assert!(config.linkedin.is_none());
    assert!(config.sheets.is_none());
    assert!(config.telegram.is_none());
}

#[test]
fn test_parse_full_config_with_aliases() {
    let json = r#"{
        "server": { "bind_addr": "127.0.0.1:8080" },
        "approval": {
            "timeout_secs": 120,
            "max_attempts": 5,
            "replay_window_secs": 60,
            "reject_policy": "abort"
        },
        "slack": {
            "bot_token": "xoxb-1",
            "signing_secret": "shh",
            "channel_id": "C1"
        },
        "openai": {
            "api_key": "sk-1",
            "model": "gpt-4o",
            "generate_images": false,
            "api_base": "http://localhost:9999/v1"
        },
        "linkedin": {
            "access_token": "li",
            "person_urn": "urn:li:person:1"
        },
        "sheets": {
            "access_token": "ya29",
            "spreadsheet_id": "sheet",
            "range": "Audit!A:D"
        },
        "telegram": {
            "bot_token": "123:abc",
            "chat_id": "-100"
        }
    }"#;

    let config = PostflowConfig::from_json_str(json).expect("Failed to parse config");

    assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    assert_eq!(config.approval.timeout(), Duration::from_secs(120));
    assert_eq!(config.approval.max_attempts, 5);
    assert_eq!(config.approval.reject_policy, RejectPolicy::Abort);
    assert_eq!(config.openai.base_url, "http://localhost:9999/v1", "api_base should map to base_url");
    assert!(!config.openai.generate_images);

    let linkedin = config.linkedin.expect("linkedin section");
    assert_eq!(linkedin.author_urn, "urn:li:person:1", "person_urn should map to author_urn");
    assert_eq!(linkedin.base_url, "https://api.linkedin.com/v2");

    let sheets = config.sheets.expect("sheets section");
    assert_eq!(sheets.audit_range, "Audit!A:D", "range should map to audit_range");
    assert_eq!(sheets.campaign_range, "Campaigns!A2:N");

    assert_eq!(config.telegram.expect("telegram section").base_url, "https://api.telegram.org");
}

#[test]
fn test_missing_required_fields() {
    let json = r#"{
        "slack": {
            "bot_token": "",
            "signing_secret": "shh",
            "channel_id": "C1"
        },
        "openai": { "api_key": "sk-1" }
    }"#;

    let err = PostflowConfig::from_json_str(json).unwrap_err();
    assert!(err.to_string().contains("required"), "unexpected error: {}", err);

    // No openai section at all
    let json = r#"{ "slack": { "bot_token": "x", "signing_secret": "y", "channel_id": "z" } }"#;
    assert!(PostflowConfig::from_json_str(json).is_err());
}

#[test]
fn test_invalid_approval_settings() {
    let json = MINIMAL.replacen('{', r#"{ "approval": { "max_attempts": 0 },"#, 1);
    let err = PostflowConfig::from_json_str(&json).unwrap_err();
    assert!(err.to_string().contains("must be"), "unexpected error: {}", err);

    let json = MINIMAL.replacen('{', r#"{ "approval": { "timeout_secs": 0 },"#, 1);
    assert!(PostflowConfig::from_json_str(&json).is_err());
}

#[test]
fn test_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(MINIMAL.as_bytes()).unwrap();

    let config = PostflowConfig::from_file(file.path()).expect("Failed to load config file");
    assert_eq!(config.slack.channel_id, "C1");
}

#[test]
fn test_from_missing_file() {
    let err = PostflowConfig::from_file("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
