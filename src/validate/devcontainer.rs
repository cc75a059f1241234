use serde_json::Value;

use super::Check;

/// Port the notebook server is expected on. Compared as a JSON number, so
/// `8888.0` matches too.
const JUPYTER_PORT: f64 = 8888.0;

fn extensions(config: &Value) -> Vec<&str> {
    config
        .pointer("/customizations/vscode/extensions")
        .and_then(Value::as_array)
        .map(|exts| exts.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Requirements on `devcontainer.json` itself.
pub fn config_checks(config: &Value) -> Vec<Check> {
    let str_field = |key: &str| config.get(key).and_then(Value::as_str);
    let exts = extensions(config);

    vec![
        Check::new(
            "Python Base Image",
            str_field("image").is_some_and(|image| image.contains("python")),
        ),
        Check::new(
            "Jupyter Extensions",
            exts.iter().any(|ext| ext.contains("jupyter")),
        ),
        Check::new("Python Extension", exts.contains(&"ms-python.python")),
        Check::new(
            "Port Forwarding",
            config
                .get("forwardPorts")
                .and_then(Value::as_array)
                .is_some_and(|ports| ports.iter().any(|p| p.as_f64() == Some(JUPYTER_PORT))),
        ),
        Check::new(
            "Setup Script",
            str_field("postCreateCommand").is_some_and(|cmd| cmd.ends_with("setup.sh")),
        ),
        Check::new("Workspace User", str_field("remoteUser") == Some("vscode")),
    ]
}

/// Substrings the post-create setup script must contain.
pub fn setup_checks(script: &str) -> Vec<Check> {
    let has = |needle: &str| script.contains(needle);
    vec![
        Check::new("Video2X Installation", has("video2x")),
        Check::new("Jupyter Installation", has("jupyter")),
        Check::new("Python Packages", has("pip3 install")),
        Check::new("Widget Support", has("ipywidgets")),
        Check::new("OpenCV Support", has("opencv")),
        Check::new("Directory Creation", has("mkdir") && has("input")),
    ]
}
