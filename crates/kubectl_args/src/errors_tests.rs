use super::*;

#[test]
fn test_read_error_display() {
    let error = ManifestError::Read {
        path: PathBuf::from("deploy.yaml"),
        source: io::Error::new(io::ErrorKind::NotFound, "No such file"),
    };
    assert_eq!(
        error.to_string(),
        "Failed to read template file \"deploy.yaml\": No such file"
    );
}

#[test]
fn test_render_error_display() {
    let error = ManifestError::Render {
        path: PathBuf::from("svc.yaml"),
        source: template_engine::Error::Parse {
            message: "unclosed block".to_string(),
        },
    };
    assert_eq!(
        error.to_string(),
        "Failed to render template file \"svc.yaml\": Failed to parse template: unclosed block"
    );
}

#[test]
fn test_path_accessor() {
    let error = ManifestError::Write {
        path: PathBuf::from("a/b.yaml"),
        source: io::Error::new(io::ErrorKind::Other, "disk full"),
    };
    assert_eq!(error.path(), Path::new("a/b.yaml"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ManifestError>();
}
