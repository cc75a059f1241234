use serde_json::Value;

use super::Check;

/// Checks over the notebook. The first check reports the cell count and
/// always passes; the rest look for substrings in the serialized notebook.
pub fn notebook_checks(notebook: &Value) -> Vec<Check> {
    let cells = notebook
        .get("cells")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    // Serializing a parsed Value cannot fail.
    let content = serde_json::to_string(notebook).unwrap_or_default();
    let has = |needle: &str| content.contains(needle);

    vec![
        Check::new("Notebook cells", true).with_detail(format!("{cells} cells")),
        Check::new("System Check", has("nvidia-smi")),
        Check::new("Video2X Installation", has("video2x")),
        Check::new("File Management", has("pathlib") && has("input_dir")),
        Check::new("Interactive Widgets", has("ipywidgets")),
        Check::new("Processing Logic", has("realesrgan")),
        Check::new("Results Management", has("output_dir")),
    ]
}
