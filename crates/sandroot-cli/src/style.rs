use std::env;

use color_eyre::owo_colors::OwoColorize;

use crate::dispatch::Status;

pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn new(force_no_color: bool, is_tty: bool) -> Self {
        let env_no_color = env::var_os("NO_COLOR").is_some();
        Self {
            enabled: !(force_no_color || env_no_color) && is_tty,
        }
    }

    pub fn status(&self, status: Status, text: &str) -> String {
        let (symbol, tone) = match status {
            Status::Ok => ("✔", Tone::Green),
            Status::UserError => ("✗", Tone::Yellow),
            Status::Failure => ("✖", Tone::Red),
        };
        let line = format!("{symbol} {text}");
        self.paint(&line, tone, true)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, Tone::Blue, false)
    }

    pub fn progress(&self, percent: i32, message: &str) -> String {
        if percent < 0 {
            return self.paint(message, Tone::Red, true);
        }
        let gauge = format!("[{percent:>3}%]");
        if !self.enabled {
            return format!("{gauge} {message}");
        }
        format!("{} {message}", gauge.dimmed())
    }

    fn paint(&self, text: &str, tone: Tone, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let painted = match tone {
            Tone::Green => text.green().to_string(),
            Tone::Yellow => text.yellow().to_string(),
            Tone::Red => text.red().to_string(),
            Tone::Blue => text.cyan().to_string(),
        };
        if bold {
            painted.bold().to_string()
        } else {
            painted
        }
    }
}

enum Tone {
    Green,
    Yellow,
    Red,
    Blue,
}
