use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::catalog::Catalog;
use crate::ui::theme::Theme;

pub struct MenuItem {
    pub language: usize,
    pub writing_system: usize,
    pub label: String,
    pub description: String,
}

/// One entry per language / writing system pair, in catalog order.
pub struct Menu<'a> {
    pub items: Vec<MenuItem>,
    pub selected: usize,
    pub theme: &'a Theme,
}

impl<'a> Menu<'a> {
    pub fn new(catalog: &Catalog, theme: &'a Theme) -> Self {
        let items = catalog
            .languages()
            .iter()
            .enumerate()
            .flat_map(|(l, language)| {
                language
                    .writing_systems
                    .iter()
                    .enumerate()
                    .map(move |(w, ws)| MenuItem {
                        language: l,
                        writing_system: w,
                        label: format!("{} {}", language.name, ws.name),
                        description: format!("{} characters · {}", ws.len(), language.code),
                    })
            })
            .collect();
        Self {
            items,
            selected: 0,
            theme,
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.items.len();
    }

    pub fn prev(&mut self) {
        if self.items.is_empty() {
            return;
        }
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = self.items.len() - 1;
        }
    }

    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.items.get(self.selected)
    }

    /// Move the cursor onto a given selection, if it is listed.
    pub fn focus(&mut self, language: usize, writing_system: usize) {
        if let Some(i) = self
            .items
            .iter()
            .position(|item| item.language == language && item.writing_system == writing_system)
        {
            self.selected = i;
        }
    }
}

impl Widget for &Menu<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(inner);

        let title_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                t!("menu.title").to_string(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                t!("menu.subtitle").to_string(),
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
        ];
        Paragraph::new(title_lines)
            .alignment(Alignment::Center)
            .render(layout[0], buf);

        let mut lines = Vec::with_capacity(self.items.len() * 2);
        for (i, item) in self.items.iter().enumerate() {
            let is_selected = i == self.selected;
            let indicator = if is_selected { ">" } else { " " };
            let style = if is_selected {
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };
            lines.push(Line::from(Span::styled(
                format!(" {indicator} {}", item.label),
                style,
            )));
            lines.push(Line::from(Span::styled(
                format!("     {}", item.description),
                Style::default().fg(colors.pending()),
            )));
        }

        // Keep the selected entry visible when the list is taller than the area.
        let height = layout[2].height as usize;
        let selected_line = self.selected * 2 + 1;
        let scroll = selected_line.saturating_sub(height.saturating_sub(1));
        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .render(layout[2], buf);

        Paragraph::new(Line::from(Span::styled(
            t!("menu.hint").to_string(),
            Style::default().fg(colors.pending()),
        )))
        .alignment(Alignment::Center)
        .render(layout[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_every_writing_system() {
        let catalog = Catalog::embedded().unwrap();
        let theme = Theme::default();
        let menu = Menu::new(&catalog, &theme);
        let expected: usize = catalog
            .languages()
            .iter()
            .map(|l| l.writing_systems.len())
            .sum();
        assert_eq!(menu.items.len(), expected);
        assert_eq!(menu.items[0].label, "Greek Uppercase");
    }

    #[test]
    fn test_menu_wraps() {
        let catalog = Catalog::embedded().unwrap();
        let theme = Theme::default();
        let mut menu = Menu::new(&catalog, &theme);
        menu.prev();
        assert_eq!(menu.selected, menu.items.len() - 1);
        menu.next();
        assert_eq!(menu.selected, 0);
    }

    #[test]
    fn test_focus_moves_to_selection() {
        let catalog = Catalog::embedded().unwrap();
        let theme = Theme::default();
        let mut menu = Menu::new(&catalog, &theme);
        let (l, w) = catalog.find("ja-JP", "Katakana").unwrap();
        menu.focus(l, w);
        let item = menu.selected_item().unwrap();
        assert_eq!((item.language, item.writing_system), (l, w));
    }

    #[test]
    fn test_empty_menu_navigation() {
        let catalog = Catalog::default();
        let theme = Theme::default();
        let mut menu = Menu::new(&catalog, &theme);
        menu.next();
        menu.prev();
        assert!(menu.selected_item().is_none());
    }
}
