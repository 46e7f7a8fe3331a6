//! The demo application: one message input in an inline viewport, sent
//! messages pushed into scrollback above it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use chat_input_protocol::EditorMode;
use chat_input_protocol::PickedFile;
use chat_input_protocol::SendEvent;
use chat_input_protocol::file_label::format_size_mb;
use chat_input_protocol::file_label::mime_short_label;
use chat_input_tui::FilePickError;
use chat_input_tui::InputResult;
use chat_input_tui::MessageInput;
use chat_input_tui::MessageInputHandlers;
use chat_input_tui::MessageInputProps;
use chat_input_tui::PasteResult;
use chat_input_tui::PickRequest;
use chat_input_tui::PickTicket;
use chat_input_tui::Renderable;
use chat_input_tui::pasted_path;
use chat_input_tui::read_picked_file;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use ratatui::widgets::Wrap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::StreamExt;

use crate::terminal;
use crate::terminal::Terminal;

const VIEWPORT_HEIGHT: u16 = 10;
const HINT: &str = "enter send · shift+enter newline · ctrl+o attach · esc quit";
const PROMPT_TITLE: &str = "attach a file · enter to attach · esc to cancel";

/// Where a file read should land once it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickTarget {
    /// Answer to the input's own file action.
    Ticket(PickTicket),
    /// Attach button or Ctrl+O outside rich mode.
    Direct,
}

/// Callback output, queued while the input is borrowed and handled right
/// after the call that produced it.
#[derive(Debug)]
enum UiEvent {
    Changed(String),
    Sent(SendEvent),
    OpenPicker(Option<PickRequest>),
}

/// Completions of background work.
#[derive(Debug)]
enum AppEvent {
    FileRead {
        target: PickTarget,
        path: PathBuf,
        result: Result<PickedFile, FilePickError>,
    },
}

struct PathPrompt {
    input: MessageInput,
    target: PickTarget,
}

impl PathPrompt {
    fn new(target: PickTarget) -> Self {
        let props = MessageInputProps {
            placeholder: "path of the file".to_string(),
            attach_button: false,
            send_label: Some("attach".to_string()),
            fancy_scroll: false,
            max_editor_rows: 1,
            auto_focus: true,
            mode: EditorMode::Plain,
            ..MessageInputProps::default()
        };
        Self {
            input: MessageInput::new(props, MessageInputHandlers::new()),
            target,
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        1 + self.input.desired_height(width)
    }
}

struct App {
    input: MessageInput,
    prompt: Option<PathPrompt>,
    ui_events: Rc<RefCell<VecDeque<UiEvent>>>,
    file_events: UnboundedSender<AppEvent>,
    controlled: bool,
    sent: Vec<SendEvent>,
    history: Vec<Vec<Line<'static>>>,
    status: Option<String>,
    exit: bool,
}

impl App {
    fn new(props: MessageInputProps, file_events: UnboundedSender<AppEvent>) -> Self {
        let ui_events = Rc::new(RefCell::new(VecDeque::new()));
        let controlled = props.value.is_some();

        let on_change = Rc::clone(&ui_events);
        let on_send = Rc::clone(&ui_events);
        let on_attach = Rc::clone(&ui_events);
        let on_pick = Rc::clone(&ui_events);
        let handlers = MessageInputHandlers::new()
            .on_change(move |event| {
                if controlled {
                    on_change
                        .borrow_mut()
                        .push_back(UiEvent::Changed(event.raw_value.clone()));
                }
            })
            .on_send(move |event| on_send.borrow_mut().push_back(UiEvent::Sent(event.clone())))
            .on_attach_click(move || on_attach.borrow_mut().push_back(UiEvent::OpenPicker(None)))
            .on_file_pick(move |request| {
                on_pick
                    .borrow_mut()
                    .push_back(UiEvent::OpenPicker(Some(request)));
            })
            .on_file_upload(|file, all| {
                tracing::info!("attached {} ({} pending)", file.name, all.len());
            })
            .on_file_remove(|id, all| {
                tracing::info!("removed {id} ({} pending)", all.len());
            });

        Self {
            input: MessageInput::new(props, handlers),
            prompt: None,
            ui_events,
            file_events,
            controlled,
            sent: Vec::new(),
            history: Vec::new(),
            status: None,
            exit: false,
        }
    }

    fn should_exit(&self) -> bool {
        self.exit
    }

    fn into_sent(self) -> Vec<SendEvent> {
        self.sent
    }

    fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Paste(pasted) => self.handle_paste(pasted),
            Event::Mouse(mouse) if self.prompt.is_none() => {
                // Sends arrive through `on_send`.
                let _ = self.input.handle_mouse(mouse);
            }
            _ => {}
        }
        self.drain_ui_events();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.exit = true;
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        match key.code {
            KeyCode::Esc if self.input.notice().is_some() => self.input.dismiss_notice(),
            KeyCode::Esc => self.exit = true,
            KeyCode::Char('o')
                if key.modifiers == KeyModifiers::CONTROL && self.input.mode() != EditorMode::Rich =>
            {
                self.open_prompt(PickTarget::Direct);
            }
            _ => {
                let (result, _) = self.input.handle_key_event(key);
                if let InputResult::Submitted(event) = result {
                    tracing::debug!("submitted {} bytes", event.raw_value.len());
                }
            }
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        if key.code == KeyCode::Esc {
            let target = prompt.target;
            self.prompt = None;
            if let PickTarget::Ticket(ticket) = target {
                let _ = self.input.complete_file_pick(ticket, None);
            }
            return;
        }
        let (result, _) = prompt.input.handle_key_event(key);
        let InputResult::Submitted(event) = result else {
            return;
        };
        let typed = event.content.text.unwrap_or(event.raw_value);
        match pasted_path(&typed) {
            Some(path) => {
                let target = prompt.target;
                self.prompt = None;
                self.spawn_read(target, path);
            }
            None => self.status = Some(format!("not a path: {}", typed.trim())),
        }
    }

    fn handle_paste(&mut self, pasted: String) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.input.handle_paste(pasted);
            return;
        }
        if let PasteResult::Attach { request, path } = self.input.handle_paste(pasted) {
            self.spawn_read(PickTarget::Ticket(request.ticket), path);
        }
    }

    fn open_prompt(&mut self, target: PickTarget) {
        if target == PickTarget::Direct && self.input.controller().is_attach_disabled() {
            return;
        }
        if let Some(PathPrompt {
            target: PickTarget::Ticket(previous),
            ..
        }) = self.prompt.replace(PathPrompt::new(target))
        {
            tracing::debug!("path prompt for {previous:?} replaced");
        }
        self.status = None;
    }

    fn spawn_read(&mut self, target: PickTarget, path: PathBuf) {
        self.status = Some(format!("reading {}…", path.display()));
        let tx = self.file_events.clone();
        tokio::spawn(async move {
            let result = read_picked_file(&path).await;
            let _ = tx.send(AppEvent::FileRead {
                target,
                path,
                result,
            });
        });
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        let AppEvent::FileRead {
            target,
            path,
            result,
        } = event;
        self.status = None;
        let file = match result {
            Ok(file) => Some(file),
            Err(err) => {
                tracing::warn!("failed to read {}: {err}", path.display());
                self.status = Some(err.to_string());
                None
            }
        };
        let attached = match (target, file) {
            (PickTarget::Ticket(ticket), file) => self.input.complete_file_pick(ticket, file),
            (PickTarget::Direct, Some(file)) => self.input.attach_file(file).map(Some),
            (PickTarget::Direct, None) => Ok(None),
        };
        // A rejection is shown by the input's own notice.
        if let Err(rejected) = attached {
            tracing::info!("{} rejected: {}", path.display(), rejected.mime_type);
        }
        self.drain_ui_events();
    }

    fn drain_ui_events(&mut self) {
        loop {
            let Some(event) = self.ui_events.borrow_mut().pop_front() else {
                break;
            };
            match event {
                UiEvent::Changed(raw) => self.input.set_value(Some(raw)),
                UiEvent::Sent(event) => {
                    if self.controlled {
                        self.input.set_value(Some(String::new()));
                    }
                    self.history.push(history_lines(&event));
                    self.sent.push(event);
                }
                UiEvent::OpenPicker(request) => {
                    let target = request.map_or(PickTarget::Direct, |request| {
                        PickTarget::Ticket(request.ticket)
                    });
                    self.open_prompt(target);
                }
            }
        }
    }

    /// Pushes sent messages into the scrollback above the viewport.
    fn flush_history(&mut self, terminal: &mut Terminal) -> anyhow::Result<()> {
        if self.history.is_empty() {
            return Ok(());
        }
        let width = terminal.size().context("query terminal size")?.width;
        for lines in self.history.drain(..) {
            let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
            let height = u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX);
            terminal
                .insert_before(height, |buf| paragraph.render(buf.area, buf))
                .context("write history")?;
        }
        Ok(())
    }

    /// Input at the top, the path prompt under it, the footer on the last row.
    fn layout(&self, area: Rect) -> (Rect, Rect, Rect) {
        let footer = Rect {
            y: area.bottom().saturating_sub(1),
            height: area.height.min(1),
            ..area
        };
        let body_height = area.height - footer.height;
        let prompt_height = self
            .prompt
            .as_ref()
            .map_or(0, |prompt| prompt.desired_height(area.width))
            .min(body_height);
        let input_height = self
            .input
            .desired_height(area.width)
            .min(body_height - prompt_height);
        let input = Rect {
            height: input_height,
            ..area
        };
        let prompt = Rect {
            y: area.y + input_height,
            height: prompt_height,
            ..area
        };
        (input, prompt, footer)
    }

    fn draw(&self, frame: &mut Frame) {
        let (input_area, prompt_area, footer_area) = self.layout(frame.area());
        let buf = frame.buffer_mut();
        self.input.render(input_area, buf);

        let cursor = if let Some(prompt) = self.prompt.as_ref() {
            Line::from(PROMPT_TITLE.cyan()).render(prompt_area, buf);
            let field = Rect {
                y: prompt_area.y.saturating_add(1),
                height: prompt_area.height.saturating_sub(1),
                ..prompt_area
            };
            prompt.input.render(field, buf);
            prompt.input.cursor_pos(field)
        } else {
            self.input.cursor_pos(input_area)
        };

        let footer = match self.status.as_deref() {
            Some(status) => Line::from(status.to_string().red()),
            None => Line::from(HINT.dim()),
        };
        footer.render(footer_area, buf);

        if let Some(position) = cursor {
            frame.set_cursor_position(position);
        }
    }
}

/// Scrollback rendition of a sent message.
fn history_lines(event: &SendEvent) -> Vec<Line<'static>> {
    let text = event
        .content
        .display_text
        .as_deref()
        .or(event.content.text.as_deref())
        .unwrap_or(&event.raw_value);
    let mut lines: Vec<Line<'static>> = text
        .trim_end_matches('\n')
        .split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let prefix = if idx == 0 { "› " } else { "  " };
            Line::from(vec![prefix.dim(), Span::from(line.to_string())])
        })
        .collect();
    for file in &event.files {
        lines.push(Line::from(vec![
            "  + ".dim(),
            Span::from(file.name.clone()).bold(),
            format!(
                " {} · {}",
                mime_short_label(&file.mime_type),
                format_size_mb(file.size_bytes)
            )
            .dim(),
        ]));
    }
    lines
}

/// Runs the input until Esc or Ctrl+C and returns what was sent.
pub(crate) async fn run(props: MessageInputProps) -> anyhow::Result<Vec<SendEvent>> {
    let mut terminal = terminal::init(VIEWPORT_HEIGHT).context("initialize terminal")?;
    let result = run_with_terminal(&mut terminal, props).await;
    let _ = terminal.clear();
    terminal::restore().context("restore terminal")?;
    result
}

async fn run_with_terminal(
    terminal: &mut Terminal,
    props: MessageInputProps,
) -> anyhow::Result<Vec<SendEvent>> {
    let (tx, mut rx) = unbounded_channel();
    let mut app = App::new(props, tx);
    let mut events = EventStream::new();

    while !app.should_exit() {
        app.flush_history(terminal)?;
        terminal
            .draw(|frame| app.draw(frame))
            .context("draw frame")?;

        tokio::select! {
            Some(event) = rx.recv() => app.handle_app_event(event),
            event = events.next() => match event {
                Some(Ok(event)) => app.handle_terminal_event(event),
                Some(Err(err)) => return Err(err).context("read terminal event"),
                None => break,
            },
        }
    }
    app.flush_history(terminal)?;
    Ok(app.into_sent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_input_protocol::FileBlob;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn app(props: MessageInputProps) -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        let props = MessageInputProps {
            auto_focus: true,
            ..props
        };
        (App::new(props, tx), rx)
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_terminal_event(key(KeyCode::Char(c)));
        }
    }

    fn rendered_rows(app: &App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = ratatui::Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| app.draw(frame)).expect("draw");
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn enter_records_the_message_and_its_history() {
        let (mut app, _rx) = app(MessageInputProps::default());
        type_text(&mut app, "hi");
        app.handle_terminal_event(key(KeyCode::Enter));

        assert_eq!(app.sent.len(), 1);
        assert_eq!(app.sent[0].raw_value, "hi");
        let history: Vec<String> = app.history[0].iter().map(ToString::to_string).collect();
        assert_eq!(history, vec!["› hi".to_string()]);
        assert_eq!(app.input.value(), "");
    }

    #[test]
    fn controlled_value_follows_changes_and_clears_after_send() {
        let (mut app, _rx) = app(MessageInputProps {
            value: Some(String::new()),
            ..MessageInputProps::default()
        });
        type_text(&mut app, "ok");
        assert_eq!(app.input.value(), "ok");

        app.handle_terminal_event(key(KeyCode::Enter));
        assert_eq!(app.sent.len(), 1);
        assert_eq!(app.sent[0].raw_value, "ok");
        assert_eq!(app.input.value(), "");
    }

    #[test]
    fn escape_dismisses_prompt_before_exiting() {
        let (mut app, _rx) = app(MessageInputProps::default());
        app.handle_terminal_event(Event::Key(KeyEvent::new(
            KeyCode::Char('o'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.prompt.is_some());

        app.handle_terminal_event(key(KeyCode::Esc));
        assert!(app.prompt.is_none());
        assert!(!app.should_exit());

        app.handle_terminal_event(key(KeyCode::Esc));
        assert!(app.should_exit());
    }

    #[test]
    fn rich_file_action_opens_prompt_with_ticket() {
        let (mut app, _rx) = app(MessageInputProps {
            mode: EditorMode::Rich,
            ..MessageInputProps::default()
        });
        app.handle_terminal_event(Event::Key(KeyEvent::new(
            KeyCode::Char('o'),
            KeyModifiers::CONTROL,
        )));
        let target = app.prompt.as_ref().map(|prompt| prompt.target);
        assert!(matches!(target, Some(PickTarget::Ticket(_))));
    }

    #[tokio::test]
    async fn prompted_path_is_read_and_attached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.7").expect("write file");

        let (mut app, mut rx) = app(MessageInputProps::default());
        app.handle_terminal_event(Event::Key(KeyEvent::new(
            KeyCode::Char('o'),
            KeyModifiers::CONTROL,
        )));
        app.handle_terminal_event(Event::Paste(path.display().to_string()));
        app.handle_terminal_event(key(KeyCode::Enter));
        assert!(app.prompt.is_none());

        let event = rx.recv().await.expect("file read");
        app.handle_app_event(event);
        let names: Vec<_> = app.input.attachments().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["notes.pdf".to_string()]);
        assert_eq!(app.status, None);
    }

    #[tokio::test]
    async fn unreadable_path_reports_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut app, mut rx) = app(MessageInputProps::default());
        app.spawn_read(PickTarget::Direct, dir.path().join("missing.pdf"));

        let event = rx.recv().await.expect("file read");
        app.handle_app_event(event);
        assert!(app.input.attachments().is_empty());
        assert!(
            app.status
                .as_deref()
                .is_some_and(|status| status.starts_with("failed to read"))
        );
    }

    #[test]
    fn history_lists_attachments() {
        let (mut app, _rx) = app(MessageInputProps::default());
        app.input
            .attach_file(PickedFile::new(
                "a.png",
                "image/png",
                FileBlob::new(vec![0_u8; 4]),
            ))
            .expect("attach");
        type_text(&mut app, "see");
        app.handle_terminal_event(key(KeyCode::Enter));

        let history: Vec<String> = app.history[0].iter().map(ToString::to_string).collect();
        assert_eq!(
            history,
            vec!["› see".to_string(), "  + a.png PNG · 0.00 MB".to_string()]
        );
    }

    #[test]
    fn draws_input_and_hint() {
        let (app, _rx) = app(MessageInputProps {
            placeholder: "Type a message".to_string(),
            ..MessageInputProps::default()
        });
        let rows = rendered_rows(&app, 60, 4);
        assert_eq!(rows[0], format!("[+] Type a message{}[>]", " ".repeat(39)));
        assert_eq!(rows[3], HINT);
    }
}
