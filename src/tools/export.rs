//! Writing research artifacts under the export directory.

use super::{SAVE_JSON_TOOL, SAVE_TEXT_TOOL};
use crate::error::ToolError;
use chrono::Local;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub const DEFAULT_TEXT_FILE: &str = "research_output.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTo {
    pub saved_to: String,
}

/// Writes `data` as pretty JSON. Strings are parsed as JSON when possible and
/// otherwise stored as `{"raw": data}`.
pub async fn save_json(
    export_dir: &Path,
    data: Value,
    filename: Option<&str>,
) -> Result<PathBuf, ToolError> {
    let data = match data {
        Value::String(text) => serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text })),
        other => other,
    };
    let filename = match filename {
        Some(name) => safe_file_name(SAVE_JSON_TOOL, name)?,
        None => format!("research_{}.json", Local::now().format("%Y%m%d_%H%M%S")),
    };

    fs::create_dir_all(export_dir).await?;
    let path = export_dir.join(filename);
    fs::write(&path, serde_json::to_vec_pretty(&data)?).await?;
    info!(path = %path.display(), "saved research JSON");
    Ok(path)
}

/// Appends a timestamped block to a text file and returns its absolute path.
pub async fn append_text(export_dir: &Path, data: &str, filename: &str) -> Result<PathBuf, ToolError> {
    let filename = safe_file_name(SAVE_TEXT_TOOL, filename)?;
    fs::create_dir_all(export_dir).await?;
    let path = export_dir.join(filename);

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let block = format!("--- Research Output --- \nTimestamp: {timestamp}\n\n{data}\n\n");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(block.as_bytes()).await?;
    file.flush().await?;

    let path = fs::canonicalize(&path).await?;
    info!(path = %path.display(), "appended research text");
    Ok(path)
}

/// Keeps only the final path component so writes stay inside the export directory.
fn safe_file_name(tool: &str, name: &str) -> Result<String, ToolError> {
    Path::new(name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(tool, format!("unusable filename `{name}`")))
}

#[derive(Debug, Clone)]
pub struct SaveJson {
    export_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveJsonArgs {
    pub data: Value,
    #[serde(default)]
    pub filename: Option<String>,
}

impl SaveJson {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }
}

impl Tool for SaveJson {
    const NAME: &'static str = SAVE_JSON_TOOL;

    type Error = ToolError;
    type Args = SaveJsonArgs;
    type Output = SavedTo;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Save structured research output as JSON into the exports folder. \
                Pass the full final JSON in the 'data' field, optionally a 'filename'."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": ["object", "string"],
                        "description": "Structured research output to save (object or JSON string)"
                    },
                    "filename": {
                        "type": "string",
                        "description": "Optional filename like research_YYYYmmdd.json"
                    }
                },
                "required": ["data"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let path = save_json(&self.export_dir, args.data, args.filename.as_deref()).await?;
        Ok(SavedTo {
            saved_to: path.display().to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SaveText {
    export_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTextArgs {
    pub data: String,
    #[serde(default = "default_text_file")]
    pub filename: String,
}

fn default_text_file() -> String {
    DEFAULT_TEXT_FILE.to_string()
}

impl SaveText {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }
}

impl Tool for SaveText {
    const NAME: &'static str = SAVE_TEXT_TOOL;

    type Error = ToolError;
    type Args = SaveTextArgs;
    type Output = SavedTo;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Append text to a .txt file. Provide 'data' and optional 'filename'."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "string",
                        "description": "Text to append to the file."
                    },
                    "filename": {
                        "type": "string",
                        "description": "Name of the .txt file"
                    }
                },
                "required": ["data"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let path = append_text(&self.export_dir, &args.data, &args.filename).await?;
        Ok(SavedTo {
            saved_to: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_objects_and_wraps_raw_strings() {
        let dir = tempfile::tempdir().unwrap();

        let path = save_json(dir.path(), json!({"topic": "x"}), Some("a.json"))
            .await
            .unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved, json!({"topic": "x"}));

        let path = save_json(dir.path(), json!("{\"topic\": \"y\"}"), Some("b.json"))
            .await
            .unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved, json!({"topic": "y"}));

        let path = save_json(dir.path(), json!("plain notes"), None).await.unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved, json!({"raw": "plain notes"}));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("research_") && name.ends_with(".json"));
    }

    #[tokio::test]
    async fn filenames_cannot_escape_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exports = dir.path().join("exports");
        let path = save_json(&exports, json!({}), Some("../../outside.json"))
            .await
            .unwrap();
        assert_eq!(path, exports.join("outside.json"));

        let err = save_json(&exports, json!({}), Some("..")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn appends_timestamped_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveText::new(dir.path());
        let first = tool
            .call(SaveTextArgs {
                data: "first".into(),
                filename: default_text_file(),
            })
            .await
            .unwrap();
        tool.call(SaveTextArgs {
            data: "second".into(),
            filename: default_text_file(),
        })
        .await
        .unwrap();

        assert!(Path::new(&first.saved_to).is_absolute());
        let contents = std::fs::read_to_string(&first.saved_to).unwrap();
        assert_eq!(contents.matches("--- Research Output --- \nTimestamp: ").count(), 2);
        assert!(contents.contains("\n\nfirst\n\n"));
        assert!(contents.ends_with("\n\nsecond\n\n"));
    }

    #[test]
    fn text_args_default_filename() {
        let args: SaveTextArgs = serde_json::from_str(r#"{"data": "x"}"#).unwrap();
        assert_eq!(args.filename, DEFAULT_TEXT_FILE);
    }
}
