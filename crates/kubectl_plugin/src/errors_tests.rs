use super::*;
use base64::Engine as _;

#[test]
fn test_config_error_display() {
    let error = Error::Config("no kubectl command specified".to_string());
    assert_eq!(
        error.to_string(),
        "Configuration error: no kubectl command specified"
    );
}

#[test]
fn test_credential_decode_error_from() {
    let decode_error = base64::engine::general_purpose::STANDARD
        .decode("!!!")
        .unwrap_err();
    let error: Error = decode_error.into();
    assert!(matches!(error, Error::CredentialDecode(_)));
    assert!(error
        .to_string()
        .starts_with("Failed to base64 decode kubeconfig: "));
}

#[test]
fn test_command_template_error_display() {
    let error = Error::CommandTemplate(template_engine::Error::Parse {
        message: "unclosed block".to_string(),
    });
    assert_eq!(
        error.to_string(),
        "Failed to render kubectl command: Failed to parse template: unclosed block"
    );
}

#[test]
fn test_file_io_error_display() {
    let error = Error::FileIo {
        operation: "Failed to write to tmp kubeconfig file",
        source: io::Error::new(io::ErrorKind::Other, "disk full"),
    };
    assert_eq!(
        error.to_string(),
        "Failed to write to tmp kubeconfig file: disk full"
    );
}

#[test]
fn test_spawn_error_display() {
    let error = Error::Spawn {
        binary: "kubectl".to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "not found"),
    };
    assert_eq!(error.to_string(), "Failed to start kubectl: not found");
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
