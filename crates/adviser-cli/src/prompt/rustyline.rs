use std::io::{self, Write};

use adviser::models::message::ChatMessage;
use adviser::models::role::Role;
use adviser::render::strip_citations;
use anyhow::Result;
use bat::WrappingMode;
use cliclack::spinner;
use console::style;
use rustyline::{Cmd, DefaultEditor, KeyCode, KeyEvent, Modifiers};

use super::{Input, InputType, Prompt, Theme};

const PROMPT: &str = "\x1b[1m\x1b[38;5;30mYou> \x1b[0m";

pub struct RustylinePrompt {
    editor: DefaultEditor,
    spinner: Option<cliclack::ProgressBar>,
    theme: Theme,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        // Enter sends the draft; Alt+Enter starts a new line in it
        editor.bind_sequence(KeyEvent(KeyCode::Enter, Modifiers::ALT), Cmd::Newline);

        Ok(RustylinePrompt {
            editor,
            spinner: None,
            theme: Theme::Dark,
        })
    }

    fn theme_name(&self) -> &'static str {
        match self.theme {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

fn print_markdown(content: &str, theme: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    if let Err(e) = printed {
        tracing::debug!("Falling back to plain output: {}", e);
        println!("{}", content);
    }
}

/// Classify one line read from the terminal
pub fn parse_input(text: &str) -> Input {
    let message_text = text.trim();

    if message_text.is_empty() {
        return Input {
            input_type: InputType::AskAgain,
            content: None,
        };
    }

    if message_text.eq_ignore_ascii_case("exit")
        || message_text.eq_ignore_ascii_case("/exit")
        || message_text.eq_ignore_ascii_case("/quit")
    {
        Input {
            input_type: InputType::Exit,
            content: None,
        }
    } else {
        Input {
            input_type: InputType::Message,
            content: Some(text.to_string()),
        }
    }
}

impl Prompt for RustylinePrompt {
    fn render(&mut self, message: &ChatMessage) {
        let speaker = match message.role {
            Role::User => style(message.role.speaker()).bold(),
            Role::Assistant => style(message.role.speaker()).cyan().bold(),
        };
        println!("{}", speaker);
        print_markdown(&strip_citations(&message.content), self.theme_name());
        println!();
        let _ = io::stdout().flush();
    }

    fn render_error(&mut self, message: &str) {
        println!("{} {}", style("Adviser").red().bold(), style(message).red());
        println!();
    }

    fn show_busy(&mut self) {
        let busy = spinner();
        busy.start("Typing...");
        self.spinner = Some(busy);
    }

    fn hide_busy(&mut self) {
        if let Some(busy) = self.spinner.take() {
            busy.stop("");
        }
    }

    fn get_input(&mut self) -> Result<Input> {
        let message_text = match self.editor.readline(PROMPT) {
            Ok(text) => text,
            Err(e) => {
                match e {
                    rustyline::error::ReadlineError::Interrupted
                    | rustyline::error::ReadlineError::Eof => (),
                    _ => eprintln!("Input error: {}", e),
                }
                return Ok(Input {
                    input_type: InputType::Exit,
                    content: None,
                });
            }
        };
        let _ = self.editor.add_history_entry(message_text.as_str());

        let trimmed = message_text.trim();
        if trimmed.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
            return Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            });
        }
        if trimmed.eq_ignore_ascii_case("/?") || trimmed.eq_ignore_ascii_case("/help") {
            println!("Commands:");
            println!("/exit - Exit the session");
            println!("/t - Toggle Light/Dark theme");
            println!("/? | /help - Display this help message");
            println!("Alt+Enter - Start a new line in the message");
            return Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            });
        }

        Ok(parse_input(&message_text))
    }

    fn close(&self) {
        // No cleanup required
    }
}
