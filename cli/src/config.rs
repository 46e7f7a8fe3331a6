use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use chat_input_protocol::EditorMode;
use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::Table as TomlTable;
use toml_edit::value;

use crate::atomic_write::write_atomic_text;

const MESSAGE_INPUT_TABLE: &str = "message_input";

/// Defaults for the message input read from `config.toml`. Every field is
/// optional; command-line flags win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInputDefaults {
    pub mode: Option<EditorMode>,
    pub placeholder: Option<String>,
    pub fancy_scroll: Option<bool>,
    pub send_on_return_disabled: Option<bool>,
    pub allowed_mime_types: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads `[message_input]`. A missing file yields empty defaults; invalid
    /// TOML falls back to a line scan that only understands scalar values.
    pub fn message_input_defaults(&self) -> anyhow::Result<MessageInputDefaults> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(MessageInputDefaults::default());
        };

        match content.parse::<DocumentMut>() {
            Ok(doc) => Ok(read_message_input(&doc)),
            Err(err) => {
                tracing::warn!("{} is not valid TOML ({err}); using line scan", self.path.display());
                Ok(parse_message_input_fallback(&content))
            }
        }
    }

    /// Persists the default editor mode, keeping the rest of the file.
    pub fn set_mode(&self, mode: EditorMode) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();

        let updated = match content.parse::<DocumentMut>() {
            Ok(mut doc) => {
                let table = ensure_table_for_write(&mut doc, MESSAGE_INPUT_TABLE)?;
                table["mode"] = value(mode.to_string());
                doc.to_string()
            }
            Err(_) => append_mode_fallback(&content, mode),
        };

        write_atomic_text(&self.path, &updated)
            .with_context(|| format!("write {}", self.path.display()))
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".chat-input").join("config.toml")
}

fn read_message_input(doc: &DocumentMut) -> MessageInputDefaults {
    let Some(table) = doc.get(MESSAGE_INPUT_TABLE).and_then(TomlItem::as_table) else {
        return MessageInputDefaults::default();
    };
    let str_value = |key: &str| {
        table
            .get(key)
            .and_then(TomlItem::as_str)
            .map(str::to_string)
    };
    let bool_value = |key: &str| table.get(key).and_then(TomlItem::as_bool);

    MessageInputDefaults {
        mode: str_value("mode").and_then(|mode| parse_mode(&mode)),
        placeholder: str_value("placeholder"),
        fancy_scroll: bool_value("fancy_scroll"),
        send_on_return_disabled: bool_value("send_on_return_disabled"),
        allowed_mime_types: table
            .get("allowed_mime_types")
            .and_then(TomlItem::as_array)
            .map(|array| {
                array
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            }),
    }
}

fn parse_mode(raw: &str) -> Option<EditorMode> {
    let mode = EditorMode::parse(raw);
    if mode.is_none() {
        tracing::warn!("unknown editor mode {raw:?} in config");
    }
    mode
}

fn parse_message_input_fallback(contents: &str) -> MessageInputDefaults {
    let mut in_table = false;
    let mut defaults = MessageInputDefaults::default();

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_table = matches!(parse_table_header_name(trimmed), Some(MESSAGE_INPUT_TABLE));
            continue;
        }
        if !in_table {
            continue;
        }

        let Some(line) = strip_toml_comment(trimmed) else {
            continue;
        };
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim() {
            "mode" => defaults.mode = unquote(raw).and_then(parse_mode),
            "placeholder" => defaults.placeholder = unquote(raw).map(str::to_string),
            "fancy_scroll" => defaults.fancy_scroll = parse_bool_token(raw),
            "send_on_return_disabled" => {
                defaults.send_on_return_disabled = parse_bool_token(raw);
            }
            _ => {}
        }
    }

    defaults
}

fn unquote(raw: &str) -> Option<&str> {
    raw.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
}

fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.split_whitespace().next() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

fn parse_table_header_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    let name = rest[..end].trim();
    if name.is_empty() { None } else { Some(name) }
}

/// Drops a trailing `#` comment. Only used by the fallback scan, where a
/// `#` inside a quoted string is rare enough to ignore.
fn strip_toml_comment(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn ensure_table_for_write<'a>(
    doc: &'a mut DocumentMut,
    key: &str,
) -> anyhow::Result<&'a mut TomlTable> {
    if doc.get(key).is_none_or(|item| !item.is_table()) {
        let mut table = TomlTable::new();
        table.set_implicit(false);
        doc[key] = TomlItem::Table(table);
    }
    doc[key]
        .as_table_mut()
        .with_context(|| format!("`{key}` is not a table"))
}

fn append_mode_fallback(existing: &str, mode: EditorMode) -> String {
    let mut out = existing.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format!("[{MESSAGE_INPUT_TABLE}]\n"));
    out.push_str(&format!("mode = \"{mode}\"\n"));
    out
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}
