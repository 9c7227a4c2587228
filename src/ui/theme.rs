//! Prompt colours: magenta while a prompt is open, green once answered

use cliclack::{Theme, ThemeState};
use console::Style;

#[derive(Debug, Clone, Default)]
pub struct GistTheme;

fn by_state(state: &ThemeState, answered: Style) -> Style {
    match state {
        ThemeState::Active => Style::new().magenta(),
        ThemeState::Error(_) => Style::new().red(),
        ThemeState::Cancel => Style::new().dim(),
        ThemeState::Submit => answered,
    }
}

impl Theme for GistTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        by_state(state, Style::new().magenta().dim())
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        by_state(state, Style::new().green())
    }
}

pub fn init_theme() {
    cliclack::set_theme(GistTheme);
}
