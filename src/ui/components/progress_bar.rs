use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};
use rust_i18n::t;

use crate::session::quiz::SessionView;
use crate::ui::theme::Theme;

/// Position within the current pass.
pub struct PassProgress<'a> {
    position: usize,
    total: usize,
    theme: &'a Theme,
}

impl<'a> PassProgress<'a> {
    pub fn new(view: &SessionView<'_>, theme: &'a Theme) -> Self {
        Self {
            position: view.position,
            total: view.pass_len,
            theme,
        }
    }

    /// Share of the pass already behind the current character.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.position as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

impl Widget for PassProgress<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let label = t!(
            "quiz.pass",
            position = (self.position + 1).min(self.total),
            total = self.total
        );

        let block = Block::bordered()
            .title(format!(" {label} "))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let filled_width = (self.ratio() * inner.width as f64) as u16;
        for x in inner.x..inner.x + inner.width {
            let style = if x < inner.x + filled_width {
                Style::default().fg(colors.bg()).bg(colors.bar_filled())
            } else {
                Style::default().fg(colors.fg()).bg(colors.bar_empty())
            };
            buf[(x, inner.y)].set_style(style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(position: usize, total: usize, theme: &Theme) -> PassProgress<'_> {
        PassProgress {
            position,
            total,
            theme,
        }
    }

    #[test]
    fn test_ratio() {
        let theme = Theme::default();
        assert_eq!(progress(0, 0, &theme).ratio(), 0.0);
        assert_eq!(progress(0, 4, &theme).ratio(), 0.0);
        assert_eq!(progress(2, 4, &theme).ratio(), 0.5);
    }
}
