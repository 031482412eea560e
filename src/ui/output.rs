use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

const CHECK: &str = "✅";
const CROSS: &str = "❌";
const WARN: &str = "⚠️";
const INFO: &str = "ℹ️";
const DATABASE: &str = "🗄️";

#[derive(Debug, Clone)]
struct Theme {
    header: Style,
    success: Style,
    error: Style,
    warn: Style,
    dim: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal
    fn detect() -> Self {
        if console::Term::stdout().is_term() {
            Self {
                header: Style::new().cyan().bold(),
                success: Style::new().green().bold(),
                error: Style::new().red().bold(),
                warn: Style::new().yellow().bold(),
                dim: Style::new().white().dimmed(),
            }
        } else {
            Self {
                header: Style::new(),
                success: Style::new(),
                error: Style::new(),
                warn: Style::new(),
                dim: Style::new(),
            }
        }
    }
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

pub fn header(text: &str) {
    println!("{} {}", DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", INFO, label.style(theme().dim.clone()), value);
}
