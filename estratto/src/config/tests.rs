#[cfg(test)]
mod tests {
    use crate::config::{ConfigError, ConfigLoader, LogFormat, LogLevel, PipelineConfig, validate_config};
    use crate::types::Source;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.regex_confidence, 0.95);
        assert_eq!(config.ner_confidence, 0.70);
        assert_eq!(config.lexicon_confidence, 0.90);
        assert_eq!(config.min_text_length_for_ner, 20);
        assert_eq!(config.ner_timeout_seconds, 2.0);
        assert_eq!(config.max_text_length, 100_000);
        assert!(config.supported_ner_languages.contains("it"));
        assert!(config.supported_ner_languages.contains("en"));
        assert_eq!(
            config.source_priority,
            vec![Source::Regex, Source::Ner, Source::Lexicon]
        );
        assert!(config.engine_regex_enabled);
        assert!(config.engine_ner_enabled);
        assert!(config.engine_lexicon_enabled);
        assert!(config.blacklist_values.is_empty());
        assert_eq!(config.ner_model_name, "");
        assert_eq!(config.regex_rule_version, "regex-v1.0");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_source_rank_follows_priority_order() {
        let config = PipelineConfig {
            source_priority: vec![Source::Lexicon, Source::Regex],
            ..Default::default()
        };
        assert_eq!(config.source_rank(Source::Lexicon), 0);
        assert_eq!(config.source_rank(Source::Regex), 1);
        // Sources missing from the order rank last.
        assert_eq!(config.source_rank(Source::Ner), 2);
    }

    #[test]
    fn test_entity_type_flags_default_on() {
        let mut config = PipelineConfig::default();
        assert!(config.entity_type_enabled("IBAN"));
        config.entity_types_enabled.insert("IBAN".to_string(), false);
        assert!(!config.entity_type_enabled("IBAN"));
        assert!(config.entity_type_enabled("QUALSIASI"));
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("NER_REGEX_CONFIDENCE", "0.5");
            jail.set_env("NER_SUPPORTED_LANGUAGES", "it,en,fr");
            jail.set_env("NER_SOURCE_PRIORITY", "lexicon,regex,ner");
            jail.set_env("NER_BLACKLIST", "spam,ignoto");
            jail.set_env("NER_MODEL_NAME", "it-ner-base");
            jail.set_env("NER_ENGINE_LEXICON_ENABLED", "false");

            let mut loader = ConfigLoader::new();
            loader.load_env();
            let config = loader.extract().expect("env config must parse");

            assert_eq!(config.regex_confidence, 0.5);
            assert!(config.supported_ner_languages.contains("fr"));
            assert_eq!(
                config.source_priority,
                vec![Source::Lexicon, Source::Regex, Source::Ner]
            );
            assert_eq!(config.blacklist_values, vec!["spam", "ignoto"]);
            assert_eq!(config.ner_model_name, "it-ner-base");
            assert!(!config.engine_lexicon_enabled);
            // Untouched fields keep their defaults.
            assert_eq!(config.max_text_length, 100_000);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file_then_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "pipeline.yaml",
                r#"
regex_confidence: 0.80
max_text_length: 5000
blacklist_values:
  - riservato
lexicon:
  "acme s.p.a.": AZIENDA
"#,
            )?;
            jail.set_env("NER_MAX_TEXT_LENGTH", "9000");

            let mut loader = ConfigLoader::new();
            loader
                .load_file(jail.directory().join("pipeline.yaml"))
                .expect("yaml file must load");
            loader.load_env();
            let config = loader.extract().expect("layered config must parse");

            // File overrides defaults, env overrides the file.
            assert_eq!(config.regex_confidence, 0.80);
            assert_eq!(config.max_text_length, 9000);
            assert_eq!(config.blacklist_values, vec!["riservato"]);
            assert_eq!(
                config.lexicon.get("acme s.p.a."),
                Some(&"AZIENDA".to_string())
            );
            Ok(())
        });
    }

    #[test]
    fn test_from_env_honors_config_file_variable() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "triage.json",
                r#"{"ner_confidence": 0.6, "engine_ner_enabled": false}"#,
            )?;
            jail.set_env(
                "NER_CONFIG_FILE",
                jail.directory().join("triage.json").display().to_string(),
            );
            jail.set_env("NER_NER_CONFIDENCE", "0.65");

            let config = PipelineConfig::from_env().expect("from_env must succeed");
            assert_eq!(config.ner_confidence, 0.65);
            assert!(!config.engine_ner_enabled);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut loader = ConfigLoader::new();
        let err = loader.load_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileLoadError(_)));
    }

    #[test]
    fn test_unsupported_extension_is_an_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "regex_confidence = 0.5")?;
            let mut loader = ConfigLoader::new();
            let err = loader
                .load_file(jail.directory().join("config.toml"))
                .unwrap_err();
            assert!(matches!(err, ConfigError::FileLoadError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_confidence = PipelineConfig {
            regex_confidence: 1.5,
            ..Default::default()
        };
        assert!(validate_config(&bad_confidence).is_err());

        let bad_timeout = PipelineConfig {
            ner_timeout_seconds: 0.0,
            ..Default::default()
        };
        assert!(validate_config(&bad_timeout).is_err());

        let empty_priority = PipelineConfig {
            source_priority: Vec::new(),
            ..Default::default()
        };
        assert!(validate_config(&empty_priority).is_err());

        let duplicated_priority = PipelineConfig {
            source_priority: vec![Source::Regex, Source::Regex],
            ..Default::default()
        };
        assert!(validate_config(&duplicated_priority).is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = PipelineConfig::default();
        config.blacklist_values.push("spam".to_string());
        config
            .lexicon
            .insert("acme".to_string(), "AZIENDA".to_string());

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_unknown_source_in_priority_fails_parsing() {
        let err =
            serde_json::from_str::<PipelineConfig>(r#"{"source_priority": "regex,telepathy"}"#)
                .unwrap_err();
        assert!(err.to_string().contains("telepathy") || err.to_string().contains("data"));
    }
}
