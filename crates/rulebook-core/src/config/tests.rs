use std::io::Write;

use serial_test::serial;

use super::*;
use crate::vault::MockVaultProvider;

const ENV_KEYS: [&str; 16] = [
    "OPENAI_MODEL",
    "PORT",
    "RULEBOOK_LLM_BASE_URL",
    "RULEBOOK_EMBEDDING_MODEL",
    "RULEBOOK_LLM_TIMEOUT",
    "RULEBOOK_LLM_MAX_RETRIES",
    "RULEBOOK_DOCUMENT_PATH",
    "RULEBOOK_CHUNK_SIZE",
    "RULEBOOK_CHUNK_OVERLAP",
    "RULEBOOK_TOP_K",
    "RULEBOOK_EMBED_BATCH_SIZE",
    "RULEBOOK_WARM_UP",
    "RULEBOOK_BIND",
    "RULEBOOK_MAX_BODY_SIZE",
    "OPENAI_API_KEY",
    "RULEBOOK_CONFIG",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn missing_path() -> std::path::PathBuf {
    std::path::PathBuf::from("/nonexistent/rulebook/config.toml")
}

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
    assert_eq!(config.llm.timeout_secs, 60);
    assert_eq!(config.document.path, "westin_rulebook.txt");
    assert_eq!(config.index.chunk_size, 1000);
    assert_eq!(config.index.chunk_overlap, 200);
    assert_eq!(config.index.top_k, 4);
    assert!(!config.index.warm_up);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.gateway.port, 3000);
    assert_eq!(config.gateway.max_body_size, 1_048_576);
    assert!(config.secrets.openai_api_key.is_none());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let config = Config::load(&missing_path()).unwrap();
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.gateway.port, 3000);
}

#[test]
#[serial]
fn load_parses_partial_toml() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[llm]
model = "gpt-4o-mini"

[document]
path = "rules/westin.txt"

[index]
chunk_size = 500
chunk_overlap = 50
warm_up = true

[gateway]
port = 8080
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
    assert_eq!(config.document.path, "rules/westin.txt");
    assert_eq!(config.index.chunk_size, 500);
    assert_eq!(config.index.chunk_overlap, 50);
    assert_eq!(config.index.top_k, 4);
    assert!(config.index.warm_up);
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "127.0.0.1");
}

#[test]
#[serial]
fn load_rejects_malformed_toml() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[index\nchunk_size = ").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides_model_and_port() {
    clear_env();
    unsafe {
        std::env::set_var("OPENAI_MODEL", "gpt-4.1");
        std::env::set_var("PORT", "4321");
        std::env::set_var("RULEBOOK_BIND", "0.0.0.0");
    }
    let config = Config::load(&missing_path()).unwrap();
    clear_env();

    assert_eq!(config.llm.model, "gpt-4.1");
    assert_eq!(config.gateway.port, 4321);
    assert_eq!(config.gateway.bind, "0.0.0.0");
}

#[test]
#[serial]
fn env_overrides_index_settings() {
    clear_env();
    unsafe {
        std::env::set_var("RULEBOOK_DOCUMENT_PATH", "/srv/rules.txt");
        std::env::set_var("RULEBOOK_CHUNK_SIZE", "800");
        std::env::set_var("RULEBOOK_CHUNK_OVERLAP", "100");
        std::env::set_var("RULEBOOK_TOP_K", "6");
        std::env::set_var("RULEBOOK_WARM_UP", "true");
        std::env::set_var("RULEBOOK_EMBEDDING_MODEL", "text-embedding-3-large");
    }
    let config = Config::load(&missing_path()).unwrap();
    clear_env();

    assert_eq!(config.document.path, "/srv/rules.txt");
    assert_eq!(config.index.chunk_size, 800);
    assert_eq!(config.index.chunk_overlap, 100);
    assert_eq!(config.index.top_k, 6);
    assert!(config.index.warm_up);
    assert_eq!(config.llm.embedding_model, "text-embedding-3-large");

    let settings = config.index_settings();
    assert_eq!(settings.document_path, std::path::PathBuf::from("/srv/rules.txt"));
    assert_eq!(settings.splitter.chunk_size, 800);
    assert_eq!(config.retrieval_config().top_k, 6);
}

#[test]
#[serial]
fn env_invalid_numbers_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("RULEBOOK_TOP_K", "-1");
        std::env::set_var("RULEBOOK_WARM_UP", "maybe");
    }
    let config = Config::load(&missing_path()).unwrap();
    clear_env();

    assert_eq!(config.gateway.port, 3000);
    assert_eq!(config.index.top_k, 4);
    assert!(!config.index.warm_up);
}

#[test]
#[serial]
fn env_blank_model_keeps_default() {
    clear_env();
    unsafe { std::env::set_var("OPENAI_MODEL", "  ") };
    let config = Config::load(&missing_path()).unwrap();
    clear_env();
    assert_eq!(config.llm.model, "gpt-4o");
}

#[test]
fn validate_rejects_overlap_not_below_size() {
    let mut config = Config::default();
    config.index.chunk_overlap = config.index.chunk_size;
    assert!(config.validate().is_err());

    config.index.chunk_size = 0;
    config.index.chunk_overlap = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_top_k_and_batch() {
    let mut config = Config::default();
    config.index.top_k = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.index.embed_batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_empty_model() {
    let mut config = Config::default();
    config.llm.model = String::new();
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn resolve_secrets_reads_api_key() {
    let mut config = Config::default();
    let vault = MockVaultProvider::new().with_secret(OPENAI_API_KEY, "sk-test");
    config.resolve_secrets(&vault).await.unwrap();
    assert_eq!(config.require_api_key().unwrap().expose(), "sk-test");
}

#[tokio::test]
async fn require_api_key_fails_when_absent() {
    let mut config = Config::default();
    config.resolve_secrets(&MockVaultProvider::new()).await.unwrap();
    let err = config.require_api_key().unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn require_api_key_rejects_blank() {
    let mut config = Config::default();
    config.secrets.openai_api_key = Some(crate::vault::Secret::new(" "));
    assert!(config.require_api_key().is_err());
}

#[test]
fn debug_output_redacts_api_key() {
    let mut config = Config::default();
    config.secrets.openai_api_key = Some(crate::vault::Secret::new("sk-very-secret"));
    let debug = format!("{config:?}");
    assert!(!debug.contains("sk-very-secret"));
    assert!(debug.contains("[REDACTED]"));
}
