use super::*;
use crate::testing::RecordingProvider;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::io::Write;

fn registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(RecordingProvider::new()));
    registry
}

#[test]
fn test_parse_toml() {
    let config = ClientConfig::from_toml_str(indoc! {r#"
        [connection_strings]
        DefaultConnection = "Data Source=app.db"
        Reporting = ":memory:"

        [app_settings]
        db_provider_factory = "sqlite"
    "#})
    .unwrap();

    assert_eq!(
        config,
        ClientConfig::new()
            .with_connection_string("DefaultConnection", "Data Source=app.db")
            .with_connection_string("Reporting", ":memory:")
            .with_provider("sqlite")
    );
}

#[test]
fn test_parse_json_with_pascal_case_sections() {
    let config = ClientConfig::from_json_str(indoc! {r#"
        {
            "ConnectionStrings": { "DefaultConnection": "orders.db" },
            "AppSettings": { "DbProviderFactory": "Recording" }
        }
    "#})
    .unwrap();

    assert_eq!(
        config.connection_strings.get("DefaultConnection").map(String::as_str),
        Some("orders.db")
    );
    assert_eq!(config.app_settings.db_provider_factory.as_deref(), Some("Recording"));
}

#[test]
fn test_missing_sections_default_to_empty() {
    let config = ClientConfig::from_toml_str("").unwrap();
    assert_eq!(config, ClientConfig::default());
}

#[test]
fn test_malformed_input_is_configuration_error() {
    assert!(ClientConfig::from_toml_str("[connection_strings").unwrap_err().is_configuration());
    assert!(ClientConfig::from_json_str("{").unwrap_err().is_configuration());
}

#[test]
fn test_load_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("client.toml");
    std::fs::write(&toml_path, "[app_settings]\ndb_provider_factory = \"sqlite\"\n").unwrap();
    let json_path = dir.path().join("client.JSON");
    std::fs::write(&json_path, r#"{"app_settings": {"db_provider_factory": "odbc"}}"#).unwrap();

    assert_eq!(
        ClientConfig::load(&toml_path).unwrap().app_settings.db_provider_factory.as_deref(),
        Some("sqlite")
    );
    assert_eq!(
        ClientConfig::load(&json_path).unwrap().app_settings.db_provider_factory.as_deref(),
        Some("odbc")
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(ClientConfig::load(&path).unwrap_err().is_configuration());
    assert_eq!(ClientConfig::load_optional(&path).unwrap(), ClientConfig::default());
}

#[test]
fn test_load_optional_reads_existing_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[connection_strings]\nDefaultConnection = \"a.db\"").unwrap();

    let config = ClientConfig::load_optional(file.path()).unwrap();
    assert_eq!(config.connection_strings.len(), 1);
}

#[test]
fn test_from_config_resolves_provider_case_insensitively() {
    let config = ClientConfig::new()
        .with_connection_string("DefaultConnection", "memory://a")
        .with_provider("RECORDING");

    let settings = ConnectionSettings::from_config(&config, &registry()).unwrap();

    assert_eq!(settings.resolve_provider_factory().unwrap().name(), "recording");
    assert_eq!(
        settings.resolve_connection_string("defaultconnection").unwrap(),
        "memory://a"
    );
}

#[test]
fn test_from_config_without_provider() {
    let config = ClientConfig::new().with_connection_string("DefaultConnection", "a");
    let err = ConnectionSettings::from_config(&config, &registry()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_from_config_unknown_provider_lists_registered() {
    let config = ClientConfig::new().with_provider("oracle");
    let err = ConnectionSettings::from_config(&config, &registry()).unwrap_err();

    match err {
        DbClientError::Configuration(message) => {
            assert!(message.contains("oracle"));
            assert!(message.contains("recording"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unknown_connection_name() {
    let settings = ConnectionSettings::new(Arc::new(RecordingProvider::new()));
    let err = settings.resolve_connection_string("Missing").unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_default_settings_have_no_provider() {
    let settings = ConnectionSettings::default();
    assert!(settings.resolve_provider_factory().err().unwrap().is_configuration());
}

#[test]
fn test_debug_hides_connection_strings() {
    let settings = ConnectionSettings::new(Arc::new(RecordingProvider::new()))
        .with_connection_string("DefaultConnection", "Password=hunter2");
    let rendered = format!("{:?}", settings);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("recording"));
}

#[test]
fn test_registry_aliases() {
    let mut registry = registry();
    registry.register_as("SqlClient", Arc::new(RecordingProvider::new()));

    assert!(registry.has("sqlclient"));
    assert!(registry.has("Recording"));
    assert!(registry.get("odbc").is_none());
    assert_eq!(registry.list(), vec!["recording", "sqlclient"]);
}
