//! Toolbar and format configuration of the rich editor.
//!
//! A registry is built once per process ([`RichEditorRegistry::shared`]) and
//! handed to every rich editor as an `Arc`, instead of being installed into
//! the editor engine as global state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;

use super::block_editor::FormatCommand;
use super::block_editor::ListKind;

const FONTS: &[&str] = &[
    "arial",
    "comic-sans",
    "courier-new",
    "georgia",
    "helvetica",
    "lucida",
    "times-new-roman",
    "verdana",
];

/// `None` is the editor's normal size.
const SIZES: &[Option<&str>] = &[Some("small"), None, Some("large"), Some("huge")];

const PALETTE: &[&str] = &[
    "#000000", "#e60000", "#ff9900", "#ffff00", "#008a00", "#0066cc", "#9933ff", "#ffffff",
    "#facccc", "#ffebcc", "#ffffcc", "#cce8cc", "#cce0f5", "#ebd6ff", "#bbbbbb", "#f06666",
    "#ffc266", "#ffff66", "#66b966", "#66a3e0", "#c285ff", "#888888", "#a10000", "#b26b00",
    "#b2b200", "#006100", "#0047b2", "#6b24b2", "#444444", "#5c0000", "#663d00", "#666600",
    "#003700", "#002966", "#3d1466", "remove",
];

const FORMATS: &[&str] = &[
    "font",
    "size",
    "bold",
    "italic",
    "underline",
    "strike",
    "color",
    "background",
    "link",
    "list",
    "bullet",
    "file",
];

/// One entry of the color and background pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteEntry {
    Color(String),
    /// Clears the format instead of setting a color.
    Remove,
}

impl PaletteEntry {
    fn parse(value: &str) -> Self {
        if value == "remove" {
            Self::Remove
        } else {
            Self::Color(value.to_string())
        }
    }

    /// The format command this entry applies to text color (`background ==
    /// false`) or highlight.
    pub fn command(&self, background: bool) -> FormatCommand {
        let value = match self {
            PaletteEntry::Color(color) => Some(color.clone()),
            PaletteEntry::Remove => None,
        };
        if background {
            FormatCommand::Background(value)
        } else {
            FormatCommand::Color(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolbarItem {
    Font,
    Size,
    Bold,
    Italic,
    Underline,
    Strike,
    Color,
    Background,
    Link,
    OrderedList,
    BulletList,
    Clean,
    File,
}

impl ToolbarItem {
    /// Format name this item needs in the registry's format list. `Clean`
    /// needs none.
    pub fn format_name(self) -> Option<&'static str> {
        Some(match self {
            ToolbarItem::Font => "font",
            ToolbarItem::Size => "size",
            ToolbarItem::Bold => "bold",
            ToolbarItem::Italic => "italic",
            ToolbarItem::Underline => "underline",
            ToolbarItem::Strike => "strike",
            ToolbarItem::Color => "color",
            ToolbarItem::Background => "background",
            ToolbarItem::Link => "link",
            ToolbarItem::OrderedList => "list",
            ToolbarItem::BulletList => "bullet",
            ToolbarItem::File => "file",
            ToolbarItem::Clean => return None,
        })
    }

    fn default_icon(self) -> &'static str {
        match self {
            ToolbarItem::Font => "Aa",
            ToolbarItem::Size => "↕",
            ToolbarItem::Bold => "B",
            ToolbarItem::Italic => "I",
            ToolbarItem::Underline => "U",
            ToolbarItem::Strike => "S",
            ToolbarItem::Color => "A",
            ToolbarItem::Background => "▌",
            ToolbarItem::Link => "⛓",
            ToolbarItem::OrderedList => "1.",
            ToolbarItem::BulletList => "•",
            ToolbarItem::Clean => "Tx",
            ToolbarItem::File => "+file",
        }
    }

    /// Keyboard shortcut that activates this item.
    pub fn shortcut(self) -> KeyEvent {
        let (code, modifiers) = match self {
            ToolbarItem::Font => (KeyCode::Char('f'), KeyModifiers::ALT),
            ToolbarItem::Size => (KeyCode::Char('z'), KeyModifiers::ALT),
            ToolbarItem::Bold => (KeyCode::Char('b'), KeyModifiers::CONTROL),
            ToolbarItem::Italic => (KeyCode::Char('i'), KeyModifiers::ALT),
            ToolbarItem::Underline => (KeyCode::Char('u'), KeyModifiers::CONTROL),
            ToolbarItem::Strike => (KeyCode::Char('s'), KeyModifiers::ALT),
            ToolbarItem::Color => (KeyCode::Char('c'), KeyModifiers::ALT),
            ToolbarItem::Background => (KeyCode::Char('g'), KeyModifiers::ALT),
            ToolbarItem::Link => (KeyCode::Char('k'), KeyModifiers::ALT),
            ToolbarItem::OrderedList => (KeyCode::Char('o'), KeyModifiers::ALT),
            ToolbarItem::BulletList => (KeyCode::Char('l'), KeyModifiers::ALT),
            ToolbarItem::Clean => (KeyCode::Char('x'), KeyModifiers::ALT),
            ToolbarItem::File => (KeyCode::Char('o'), KeyModifiers::CONTROL),
        };
        KeyEvent::new(code, modifiers)
    }
}

/// Fonts, sizes, palette, enabled formats, toolbar layout and icon overrides
/// for the rich editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichEditorRegistry {
    pub fonts: Vec<String>,
    pub sizes: Vec<Option<String>>,
    pub palette: Vec<PaletteEntry>,
    pub formats: Vec<String>,
    /// Toolbar items in groups, rendered left to right.
    pub toolbar: Vec<Vec<ToolbarItem>>,
    /// Icon overrides keyed by toolbar item.
    pub icons: BTreeMap<ToolbarItem, String>,
}

impl Default for RichEditorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RichEditorRegistry {
    /// The standard chat toolbar.
    pub fn standard() -> Self {
        Self {
            fonts: FONTS.iter().map(ToString::to_string).collect(),
            sizes: SIZES
                .iter()
                .map(|size| size.map(ToString::to_string))
                .collect(),
            palette: PALETTE.iter().map(|value| PaletteEntry::parse(value)).collect(),
            formats: FORMATS.iter().map(ToString::to_string).collect(),
            toolbar: vec![
                vec![ToolbarItem::Font],
                vec![ToolbarItem::Size],
                vec![
                    ToolbarItem::Bold,
                    ToolbarItem::Italic,
                    ToolbarItem::Underline,
                    ToolbarItem::Strike,
                ],
                vec![ToolbarItem::Color, ToolbarItem::Background],
                vec![ToolbarItem::Link],
                vec![ToolbarItem::OrderedList, ToolbarItem::BulletList],
                vec![ToolbarItem::Clean],
                vec![ToolbarItem::File],
            ],
            icons: BTreeMap::new(),
        }
    }

    /// The process-wide standard registry, built on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<RichEditorRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::standard())))
    }

    pub fn with_icons(mut self, icons: impl IntoIterator<Item = (ToolbarItem, String)>) -> Self {
        self.icons.extend(icons);
        self
    }

    pub fn icon(&self, item: ToolbarItem) -> &str {
        self.icons
            .get(&item)
            .map_or_else(|| item.default_icon(), String::as_str)
    }

    /// Whether the item's format is enabled.
    pub fn allows(&self, item: ToolbarItem) -> bool {
        item.format_name()
            .is_none_or(|name| self.formats.iter().any(|format| format == name))
    }

    /// Enabled toolbar items in layout order.
    pub fn items(&self) -> impl Iterator<Item = ToolbarItem> + '_ {
        self.toolbar
            .iter()
            .flatten()
            .copied()
            .filter(|item| self.allows(*item))
    }

    /// The enabled toolbar item bound to `key`, if any.
    pub fn item_for_shortcut(&self, key: &KeyEvent) -> Option<ToolbarItem> {
        self.items().find(|item| {
            let shortcut = item.shortcut();
            shortcut.code == key.code && key.modifiers == shortcut.modifiers
        })
    }

    /// The font after `current` in the whitelist, wrapping back to the
    /// default font.
    pub fn next_font(&self, current: Option<&str>) -> Option<String> {
        next_in(&self.fonts, current.map(ToString::to_string))
    }

    pub fn next_size(&self, current: Option<&str>) -> Option<String> {
        let sizes = &self.sizes;
        let position = sizes
            .iter()
            .position(|size| size.as_deref() == current)
            .map_or(0, |idx| idx + 1);
        sizes.get(position % sizes.len().max(1)).cloned().flatten()
    }

    /// The palette entry after index `current`, wrapping around.
    pub fn next_palette_index(&self, current: Option<usize>) -> usize {
        match current {
            Some(idx) if idx + 1 < self.palette.len() => idx + 1,
            _ => 0,
        }
    }

    /// The command that opens the list kind for an item.
    pub fn list_command(item: ToolbarItem) -> Option<FormatCommand> {
        match item {
            ToolbarItem::OrderedList => Some(FormatCommand::List(ListKind::Ordered)),
            ToolbarItem::BulletList => Some(FormatCommand::List(ListKind::Bullet)),
            _ => None,
        }
    }
}

fn next_in(values: &[String], current: Option<String>) -> Option<String> {
    match current {
        None => values.first().cloned(),
        Some(current) => values
            .iter()
            .position(|value| *value == current)
            .and_then(|idx| values.get(idx + 1))
            .cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_registry_matches_chat_toolbar() {
        let registry = RichEditorRegistry::standard();
        assert_eq!(registry.fonts.len(), 8);
        assert_eq!(registry.palette.len(), 36);
        assert_eq!(registry.palette.last(), Some(&PaletteEntry::Remove));
        assert_eq!(registry.items().count(), 13);
        assert_eq!(registry.items().last(), Some(ToolbarItem::File));
    }

    #[test]
    fn shared_registry_is_built_once() {
        assert!(Arc::ptr_eq(
            &RichEditorRegistry::shared(),
            &RichEditorRegistry::shared()
        ));
    }

    #[test]
    fn remove_entry_clears_the_format() {
        assert_eq!(PaletteEntry::Remove.command(false), FormatCommand::Color(None));
        assert_eq!(
            PaletteEntry::Color("#0066cc".to_string()).command(true),
            FormatCommand::Background(Some("#0066cc".to_string()))
        );
    }

    #[test]
    fn fonts_and_sizes_cycle_back_to_default() {
        let registry = RichEditorRegistry::standard();
        assert_eq!(registry.next_font(None).as_deref(), Some("arial"));
        assert_eq!(registry.next_font(Some("verdana")), None);
        assert_eq!(registry.next_size(None).as_deref(), Some("large"));
        assert_eq!(registry.next_size(Some("huge")).as_deref(), Some("small"));
        assert_eq!(registry.next_size(Some("small")), None);
        assert_eq!(registry.next_palette_index(Some(35)), 0);
    }

    #[test]
    fn disabled_formats_drop_their_items_and_shortcuts() {
        let mut registry = RichEditorRegistry::standard();
        registry.formats.retain(|format| format != "bold");
        assert!(!registry.allows(ToolbarItem::Bold));
        assert!(registry.allows(ToolbarItem::Clean));
        let ctrl_b = KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL);
        assert_eq!(registry.item_for_shortcut(&ctrl_b), None);
        let ctrl_o = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL);
        assert_eq!(registry.item_for_shortcut(&ctrl_o), Some(ToolbarItem::File));
    }

    #[test]
    fn icon_overrides_replace_defaults() {
        let registry =
            RichEditorRegistry::standard().with_icons([(ToolbarItem::File, "📎".to_string())]);
        assert_eq!(registry.icon(ToolbarItem::File), "📎");
        assert_eq!(registry.icon(ToolbarItem::Bold), "B");
    }
}
