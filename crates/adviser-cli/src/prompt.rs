use adviser::models::message::ChatMessage;
use anyhow::Result;

pub mod rustyline;

pub trait Prompt {
    fn render(&mut self, message: &ChatMessage);
    fn render_error(&mut self, message: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&self);
    fn adviser_ready(&self) {
        println!("\n");
        println!("Täcker försäkringen? Ask anything, or type /help for commands.");
        println!("\n");
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Only set for messages
}

#[derive(Debug, PartialEq)]
pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}
