//! Terminal styles for cache inspection output

use crate::value::AttrType;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub error: Style,
    pub warn: Style,
    pub icon: Style,
    pub label: Style,
    /// Lookups that found nothing
    pub miss: Style,
    attrs: Style,
    resolved: Style,
    failed: Style,
}

impl Theme {
    /// Colors on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        let colored = console::Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none();
        Self::new(colored)
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            heading: pick(Style::new().cyan().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            icon: pick(Style::new().magenta()),
            label: pick(Style::new().white().dimmed()),
            miss: pick(Style::new().bright_black()),
            attrs: pick(Style::new().cyan()),
            resolved: pick(Style::new().green()),
            failed: pick(Style::new().red()),
        }
    }

    /// Style for a cached value of type `ty`
    pub fn for_type(&self, ty: AttrType) -> Style {
        match ty {
            AttrType::Attrs => self.attrs.clone(),
            AttrType::String | AttrType::Bool => self.resolved.clone(),
            AttrType::Failed => self.failed.clone(),
            AttrType::Placeholder => self.warn.clone(),
            AttrType::Missing | AttrType::Misc => self.miss.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
