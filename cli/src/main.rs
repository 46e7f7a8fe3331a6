mod app;
mod atomic_write;
mod config;
mod logging;
mod terminal;

use std::path::PathBuf;

use anyhow::Context;
use chat_input_protocol::AllowedFileTypes;
use chat_input_protocol::EditorMode;
use chat_input_tui::MessageInputProps;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use crate::config::ConfigStore;
use crate::config::MessageInputDefaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
enum CliMode {
    Rich,
    Plain,
    Custom,
}

impl CliMode {
    fn as_editor_mode(self) -> EditorMode {
        match self {
            CliMode::Rich => EditorMode::Rich,
            CliMode::Plain => EditorMode::Plain,
            CliMode::Custom => EditorMode::Custom,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Type chat messages in the terminal and print them as JSON lines")]
struct Cli {
    /// Editor back-end. Defaults to `[message_input] mode` in the config, then `plain`.
    #[arg(long, value_enum, env = "CHAT_INPUT_MODE")]
    mode: Option<CliMode>,

    /// Text shown while the editor is empty.
    #[arg(long)]
    placeholder: Option<String>,

    /// Plain scroll wrapper instead of the scrollbar container.
    #[arg(long)]
    no_fancy_scroll: bool,

    /// Enter inserts a newline; only the send button submits.
    #[arg(long)]
    send_on_return_disabled: bool,

    /// Start with a caller-controlled value.
    #[arg(long)]
    value: Option<String>,

    /// Config file path. Defaults to `~/.chat-input/config.toml`.
    #[arg(long, env = "CHAT_INPUT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for `chat-input.log`. Defaults to `~/.chat-input/log`.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Edit the persistent defaults.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Store the default editor mode.
    SetMode {
        #[arg(value_enum)]
        mode: CliMode,
    },
}

impl Cli {
    fn config_store(&self) -> anyhow::Result<ConfigStore> {
        match &self.config {
            Some(path) => Ok(ConfigStore::new(path.clone())),
            None => ConfigStore::new_default(),
        }
    }

    fn log_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().context("cannot determine home directory for logs")?;
        Ok(home.join(".chat-input").join("log"))
    }

    /// Flags win over the config file.
    fn message_input_props(&self, defaults: MessageInputDefaults) -> MessageInputProps {
        let allowed_files = defaults
            .allowed_mime_types
            .map_or_else(AllowedFileTypes::default, AllowedFileTypes::from_mime_types);
        MessageInputProps {
            value: self.value.clone(),
            placeholder: self
                .placeholder
                .clone()
                .or(defaults.placeholder)
                .unwrap_or_else(|| "Type a message".to_string()),
            send_on_return_disabled: self.send_on_return_disabled
                || defaults.send_on_return_disabled.unwrap_or(false),
            fancy_scroll: !self.no_fancy_scroll && defaults.fancy_scroll.unwrap_or(true),
            auto_focus: true,
            mode: self
                .mode
                .map(CliMode::as_editor_mode)
                .or(defaults.mode)
                .unwrap_or_default(),
            allowed_files,
            ..MessageInputProps::default()
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store = cli.config_store()?;

    if let Some(CliCommand::Config {
        action: ConfigAction::SetMode { mode },
    }) = &cli.command
    {
        let mode = mode.as_editor_mode();
        store.set_mode(mode).context("update config")?;
        println!("default mode set to {mode} in {}", store.path().display());
        return Ok(());
    }

    let _log_guard = logging::init(&cli.log_dir()?).context("initialize logging")?;
    let defaults = match store.message_input_defaults() {
        Ok(defaults) => defaults,
        Err(err) => {
            tracing::warn!("ignoring config: {err:#}");
            MessageInputDefaults::default()
        }
    };
    let props = cli.message_input_props(defaults);
    tracing::info!("starting chat input in {} mode", props.mode);

    let sent = app::run(props).await?;
    for event in &sent {
        let line = serde_json::to_string(event).context("serialize sent message")?;
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_set_mode_parses() {
        let cli =
            Cli::try_parse_from(["chat-input", "config", "set-mode", "rich"]).expect("parse args");
        let Some(CliCommand::Config {
            action: ConfigAction::SetMode { mode },
        }) = cli.command
        else {
            panic!("expected config command, got: {:?}", cli.command);
        };
        assert_eq!(mode, CliMode::Rich);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["chat-input", "--mode", "fancy"]).is_err());
    }

    #[test]
    fn flags_override_config_defaults() {
        let cli = Cli::try_parse_from([
            "chat-input",
            "--mode",
            "custom",
            "--placeholder",
            "Say hi",
            "--no-fancy-scroll",
        ])
        .expect("parse args");
        let props = cli.message_input_props(MessageInputDefaults {
            mode: Some(EditorMode::Rich),
            placeholder: Some("from config".to_string()),
            fancy_scroll: Some(true),
            send_on_return_disabled: Some(true),
            allowed_mime_types: Some(vec!["image/png".to_string()]),
        });
        assert_eq!(props.mode, EditorMode::Custom);
        assert_eq!(props.placeholder, "Say hi");
        assert!(!props.fancy_scroll);
        assert!(props.send_on_return_disabled);
        assert!(props.allowed_files.is_allowed("image/png"));
        assert!(!props.allowed_files.is_allowed("application/pdf"));
        assert_eq!(props.value, None);
    }

    #[test]
    fn config_fills_in_missing_flags() {
        let cli = Cli::try_parse_from(["chat-input", "--value", "draft"]).expect("parse args");
        let props = cli.message_input_props(MessageInputDefaults {
            mode: Some(EditorMode::Rich),
            ..MessageInputDefaults::default()
        });
        assert_eq!(props.mode, EditorMode::Rich);
        assert_eq!(props.placeholder, "Type a message");
        assert!(props.fancy_scroll);
        assert_eq!(props.value.as_deref(), Some("draft"));
    }
}
