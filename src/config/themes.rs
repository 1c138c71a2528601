use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub accent: Color,
    pub muted: Color,
    pub star: Color,
    pub highlight: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub danger: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.palettes.contains_key(theme)
    }

    pub fn palette(&self, theme: &ThemeName) -> Palette {
        self.palettes
            .get(theme)
            .or_else(|| self.palettes.get(&ThemeName::Dark))
            .copied()
            .unwrap_or(DARK)
    }
}

const DARK: Palette = Palette {
    accent: Color::Cyan,
    muted: Color::Gray,
    star: Color::Yellow,
    highlight: Color::Yellow,
    selection_bg: Color::Blue,
    selection_fg: Color::Black,
    danger: Color::Red,
};

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (
                ThemeName::Light,
                Palette {
                    accent: Color::Blue,
                    muted: Color::DarkGray,
                    star: Color::Rgb(230, 160, 0),
                    highlight: Color::Magenta,
                    selection_bg: Color::LightBlue,
                    selection_fg: Color::Black,
                    danger: Color::Red,
                },
            ),
            (
                ThemeName::HighContrast,
                Palette {
                    accent: Color::White,
                    muted: Color::White,
                    star: Color::LightYellow,
                    highlight: Color::LightYellow,
                    selection_bg: Color::White,
                    selection_fg: Color::Black,
                    danger: Color::LightRed,
                },
            ),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}
