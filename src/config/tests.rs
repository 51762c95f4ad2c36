use super::*;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_ragcore_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("RAGCORE_EMBEDDING_PRIMARY_PROVIDER");
        env::remove_var("RAGCORE_EMBEDDING_REMOTE_API_KEY");
        env::remove_var("RAGCORE_EMBEDDING_REMOTE_BASE_URL");
        env::remove_var("RAGCORE_EMBEDDING_REMOTE_MODEL");
        env::remove_var("RAGCORE_EMBEDDING_LOCAL_MODEL_NAME");
        env::remove_var("RAGCORE_EMBEDDING_TIMEOUT_SEC");
        env::remove_var("RAGCORE_EMBEDDING_BATCH_SIZE");
        env::remove_var("RAGCORE_VECTOR_DIMENSION");
        env::remove_var("RAGCORE_VECTOR_METRIC");
        env::remove_var("RAGCORE_VECTOR_COLLECTION_NAME");
        env::remove_var("RAGCORE_VECTOR_STORE_URL");
        env::remove_var("RAGCORE_ROUTER_STRATEGY");
        env::remove_var("RAGCORE_ROUTER_CONFIDENCE_THRESHOLD");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(matches!(
        config.embedding.primary_provider,
        PrimaryProvider::Remote
    ));
    assert_eq!(config.embedding.timeout_sec, 10);
    assert_eq!(config.embedding.batch_size, 50);
    assert_eq!(config.vector.dimension, 1536);
    assert!(matches!(config.vector.metric, Metric::Cosine));
    assert!(matches!(config.router.strategy, Strategy::Auto));
    assert_eq!(config.router.confidence_threshold, 0.70);
    assert_eq!(config.search_deadline_sec, 5);
    assert_eq!(config.lexical_max_vocab_size, 5000);
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_ragcore_env();

    let config = Config::from_env().expect("should parse with defaults");
    assert_eq!(config.vector.dimension, 1536);
    assert!(matches!(config.router.strategy, Strategy::Auto));
}

#[test]
#[serial]
fn test_from_env_custom_strategy() {
    clear_ragcore_env();

    with_env_vars(&[("RAGCORE_ROUTER_STRATEGY", "hybrid")], || {
        let config = Config::from_env().expect("should parse");
        assert!(matches!(config.router.strategy, Strategy::Hybrid));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_strategy() {
    clear_ragcore_env();

    with_env_vars(&[("RAGCORE_ROUTER_STRATEGY", "bogus")], || {
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::UnknownStrategy { .. })));
    });
}

#[test]
#[serial]
fn test_from_env_custom_metric() {
    clear_ragcore_env();

    with_env_vars(&[("RAGCORE_VECTOR_METRIC", "dot")], || {
        let config = Config::from_env().expect("should parse");
        assert!(matches!(config.vector.metric, Metric::Dot));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_metric() {
    clear_ragcore_env();

    with_env_vars(&[("RAGCORE_VECTOR_METRIC", "manhattan")], || {
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::UnknownMetric { .. })));
    });
}

#[test]
#[serial]
fn test_from_env_remote_provider_requires_all_fields() {
    clear_ragcore_env();

    with_env_vars(
        &[
            ("RAGCORE_EMBEDDING_PRIMARY_PROVIDER", "remote"),
            ("RAGCORE_EMBEDDING_REMOTE_API_KEY", "sk-test"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            // base_url and model are missing, so `remote` stays None.
            assert!(config.embedding.remote.is_none());
        },
    );
}

#[test]
#[serial]
fn test_from_env_remote_provider_full() {
    clear_ragcore_env();

    with_env_vars(
        &[
            ("RAGCORE_EMBEDDING_PRIMARY_PROVIDER", "remote"),
            ("RAGCORE_EMBEDDING_REMOTE_API_KEY", "sk-test"),
            ("RAGCORE_EMBEDDING_REMOTE_BASE_URL", "https://api.example.com"),
            ("RAGCORE_EMBEDDING_REMOTE_MODEL", "text-embedding-3-small"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            let remote = config.embedding.remote.expect("remote config present");
            assert_eq!(remote.api_key, "sk-test");
            assert_eq!(remote.model, "text-embedding-3-small");
        },
    );
}

#[test]
#[serial]
fn test_from_env_local_provider_paths() {
    clear_ragcore_env();

    with_env_vars(
        &[
            ("RAGCORE_EMBEDDING_LOCAL_MODEL_NAME", "qwen2-0.5b"),
            ("RAGCORE_EMBEDDING_LOCAL_MODEL_PATH", "/models/qwen2.gguf"),
            ("RAGCORE_EMBEDDING_LOCAL_TOKENIZER_PATH", "/models/tokenizer.json"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            let local = config.embedding.local.expect("local config present");
            assert_eq!(local.model_name, "qwen2-0.5b");
            assert_eq!(local.model_path, std::path::PathBuf::from("/models/qwen2.gguf"));
            assert_eq!(local.tokenizer_path, std::path::PathBuf::from("/models/tokenizer.json"));
        },
    );
}

#[test]
#[serial]
fn test_from_env_local_provider_without_paths_defaults_empty() {
    clear_ragcore_env();

    with_env_vars(&[("RAGCORE_EMBEDDING_LOCAL_MODEL_NAME", "qwen2-0.5b")], || {
        let config = Config::from_env().expect("should parse");
        let local = config.embedding.local.expect("local config present");
        assert_eq!(local.model_path, std::path::PathBuf::new());
        assert_eq!(local.tokenizer_path, std::path::PathBuf::new());
    });
}

#[test]
fn test_validate_zero_dimension() {
    let config = Config {
        vector: VectorConfig {
            dimension: 0,
            ..VectorConfig::default()
        },
        ..Config::default()
    };

    let err = config.validate(0).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDimension { .. }));
}

#[test]
fn test_validate_dimension_mismatch() {
    let config = Config {
        vector: VectorConfig {
            dimension: 1536,
            collection_name: "docs".to_string(),
            store_url: "http://localhost:6334".to_string(),
            ..VectorConfig::default()
        },
        embedding: EmbeddingConfig {
            primary_provider: PrimaryProvider::Mock,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };

    let err = config.validate(768).unwrap_err();
    assert!(matches!(err, ConfigError::DimensionMismatch { .. }));
}

#[test]
fn test_validate_missing_collection_name() {
    let config = Config {
        vector: VectorConfig {
            dimension: 8,
            store_url: "http://localhost:6334".to_string(),
            ..VectorConfig::default()
        },
        embedding: EmbeddingConfig {
            primary_provider: PrimaryProvider::Mock,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };

    let err = config.validate(8).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCollectionName));
}

#[test]
fn test_validate_remote_provider_missing_credentials() {
    let config = Config {
        vector: VectorConfig {
            dimension: 8,
            collection_name: "docs".to_string(),
            store_url: "http://localhost:6334".to_string(),
            ..VectorConfig::default()
        },
        embedding: EmbeddingConfig {
            primary_provider: PrimaryProvider::Remote,
            remote: None,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };

    let err = config.validate(8).unwrap_err();
    assert!(matches!(err, ConfigError::MissingRemoteField { .. }));
}

#[test]
fn test_validate_success() {
    let config = Config {
        vector: VectorConfig {
            dimension: 8,
            collection_name: "docs".to_string(),
            store_url: "http://localhost:6334".to_string(),
            ..VectorConfig::default()
        },
        embedding: EmbeddingConfig {
            primary_provider: PrimaryProvider::Mock,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    };

    assert!(config.validate(8).is_ok());
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = ConfigError::MissingCollectionName;
    assert!(err.to_string().contains("collection-name"));

    let err = ConfigError::DimensionMismatch {
        collection_dim: 1536,
        provider_dim: 768,
    };
    assert!(err.to_string().contains("1536"));
    assert!(err.to_string().contains("768"));

    let err = ConfigError::MissingEnvVar {
        name: "RAGCORE_VECTOR_STORE_URL",
    };
    assert!(err.to_string().contains("RAGCORE_VECTOR_STORE_URL"));
}
