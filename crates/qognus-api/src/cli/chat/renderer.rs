//! Terminal markdown rendering with syntax-highlighted code blocks.
//!
//! While streaming, visible tokens are printed raw. Replayed history is
//! rendered as markdown: `termimad` for prose and tables, `syntect` for
//! fenced code (copilot answers often carry SQL or JSON snippets).

use std::io::Write;

use crossterm::style::Color;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use qognus_types::llm::Usage;

const THEME: &str = "base16-ocean.dark";

pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl ChatRenderer {
    /// Create a renderer; `accent` colors headers and bold text.
    pub fn new(accent: Option<Color>) -> Self {
        let mut skin = MadSkin::default_dark();

        if let Some(color) = accent {
            let tc = Self::crossterm_to_termimad(color);
            skin.bold.set_fg(tc);
            skin.headers[0].set_fg(tc);
            skin.headers[1].set_fg(tc);
        }
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render a complete markdown answer.
    ///
    /// Prose between fences is rendered as one block so tables survive;
    /// an unclosed fence is still highlighted.
    pub fn render_final(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut prose = String::new();
        let mut code: Option<(String, String)> = None;

        for line in markdown.lines() {
            if line.trim_start().starts_with("```") {
                match code.take() {
                    Some((lang, buf)) => output.push_str(&self.highlight_code(&buf, &lang)),
                    None => {
                        self.flush_prose(&mut prose, &mut output);
                        let lang = line.trim_start().trim_start_matches('`').trim().to_string();
                        code = Some((lang, String::new()));
                    }
                }
            } else if let Some((_, buf)) = code.as_mut() {
                buf.push_str(line);
                buf.push('\n');
            } else {
                prose.push_str(line);
                prose.push('\n');
            }
        }

        self.flush_prose(&mut prose, &mut output);
        if let Some((lang, buf)) = code.filter(|(_, buf)| !buf.is_empty()) {
            output.push_str(&self.highlight_code(&buf, &lang));
        }

        output
    }

    fn flush_prose(&self, prose: &mut String, output: &mut String) {
        if prose.trim().is_empty() {
            prose.clear();
            return;
        }
        output.push_str(&self.skin.term_text(prose.as_str()).to_string());
        prose.clear();
    }

    /// Print a single streaming token (raw, no formatting).
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print the stats footer after an answer.
    ///
    /// Format: "| {in} in . {out} out . {time}s . {model}". Token counts
    /// are omitted when the transport reported none.
    pub fn print_stats_footer(&self, usage: Option<&Usage>, response_ms: u64, model: &str) {
        let dot = console::style("\u{00b7}").dim();
        let seconds = response_ms as f64 / 1000.0;
        let tokens = match usage {
            Some(u) => format!(
                "{} in {dot} {} out {dot} ",
                console::style(u.input_tokens).dim(),
                console::style(u.output_tokens).dim(),
            ),
            None => String::new(),
        };
        println!(
            "\n  {} {tokens}{} {dot} {}",
            console::style("|").dim(),
            console::style(format!("{seconds:.1}s")).dim(),
            console::style(model).dim(),
        );
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .filter(|_| !lang.is_empty())
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let label = if lang.is_empty() { "code" } else { lang };
        let mut output = format!("  {}\n", console::style(format!("--- {label} ---")).dim());

        let Some(theme) = self.theme_set.themes.get(THEME) else {
            for line in code.lines() {
                output.push_str(&format!("  {line}\n"));
            }
            return output;
        };

        let mut h = HighlightLines::new(syntax, theme);
        for line in code.lines() {
            let ranges: Vec<(Style, &str)> = h
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
            output.push_str(&format!("  {escaped}\x1b[0m\n"));
        }

        output
    }

    fn crossterm_to_termimad(color: Color) -> termimad::crossterm::style::Color {
        match color {
            Color::Cyan => termimad::crossterm::style::Color::Cyan,
            Color::Green => termimad::crossterm::style::Color::Green,
            Color::Yellow => termimad::crossterm::style::Color::Yellow,
            Color::Magenta => termimad::crossterm::style::Color::Magenta,
            Color::Blue => termimad::crossterm::style::Color::Blue,
            Color::Rgb { r, g, b } => termimad::crossterm::style::Color::Rgb { r, g, b },
            _ => termimad::crossterm::style::Color::Cyan,
        }
    }
}
