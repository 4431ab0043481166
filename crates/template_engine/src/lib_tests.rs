use super::*;
use std::cell::Cell;

/// Renderer that counts calls and echoes a fixed result.
struct CountingRenderer {
    calls: Cell<usize>,
}

impl CountingRenderer {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl TemplateRenderer for CountingRenderer {
    fn render(&self, _body: &str, _context: &TemplateContext) -> Result<String, Error> {
        self.calls.set(self.calls.get() + 1);
        Ok("rendered".to_string())
    }
}

fn drone_context() -> TemplateContext {
    TemplateContext::from_env_vars(vec![("DRONE_COMMIT".to_string(), "v1.2.3".to_string())])
}

#[test]
fn test_has_template_markers() {
    assert!(has_template_markers("{{ .X }}"));
    assert!(has_template_markers("a }} b {{"));
    assert!(!has_template_markers("get nodes"));
    assert!(!has_template_markers("only {{ open"));
    assert!(!has_template_markers("only }} close"));
}

#[test]
fn test_render_command_without_markers_skips_renderer() {
    let renderer = CountingRenderer::new();

    let result = render_command("get nodes", &renderer, &drone_context()).unwrap();

    assert_eq!(result, "get nodes");
    assert_eq!(renderer.calls.get(), 0);
}

#[test]
fn test_render_command_with_one_marker_skips_renderer() {
    let renderer = CountingRenderer::new();

    let result = render_command("get {{ nodes", &renderer, &drone_context()).unwrap();

    assert_eq!(result, "get {{ nodes");
    assert_eq!(renderer.calls.get(), 0);
}

#[test]
fn test_render_command_with_markers_calls_renderer_once() {
    let renderer = CountingRenderer::new();

    let result = render_command("get {{ X }}", &renderer, &drone_context()).unwrap();

    assert_eq!(result, "rendered");
    assert_eq!(renderer.calls.get(), 1);
}

#[test]
fn test_render_command_substitutes_drone_commit() {
    let engine = HandlebarsTemplateEngine::new();

    let result = render_command(
        "set image deployment/foo container=bar/baz:{{ .DroneCommit }}",
        &engine,
        &drone_context(),
    )
    .unwrap();

    assert_eq!(result, "set image deployment/foo container=bar/baz:v1.2.3");
}

#[test]
fn test_render_command_deploy_image() {
    let engine = HandlebarsTemplateEngine::new();

    let result = render_command("deploy img:{{ .DroneCommit }}", &engine, &drone_context()).unwrap();

    assert_eq!(result, "deploy img:v1.2.3");
}

#[test]
fn test_render_command_invalid_template_is_parse_error() {
    let engine = HandlebarsTemplateEngine::new();

    let result = render_command("apply {{#if DroneCommit}}", &engine, &drone_context());

    assert!(matches!(result, Err(Error::Parse { .. })));
}
