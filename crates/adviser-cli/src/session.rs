use adviser::relay::MessageStreamer;
use adviser::surface::{ChatSurface, SubmitOutcome};
use anyhow::Result;

use crate::prompt::{InputType, Prompt};

pub struct Session<'a> {
    surface: ChatSurface,
    streamer: Box<dyn MessageStreamer + 'a>,
    prompt: Box<dyn Prompt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(streamer: Box<dyn MessageStreamer + 'a>, prompt: Box<dyn Prompt + 'a>) -> Self {
        Session {
            surface: ChatSurface::new(),
            streamer,
            prompt,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt.adviser_ready();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        self.surface.set_input(content);
                    }
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }

            self.prompt.show_busy();
            let outcome = self.surface.submit(self.streamer.as_ref()).await;
            self.prompt.hide_busy();
            self.show_outcome(outcome);
        }

        self.prompt.close();
        Ok(())
    }

    fn show_outcome(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Replied => {
                if let Some(reply) = self.surface.messages().last() {
                    self.prompt.render(reply);
                }
            }
            SubmitOutcome::NoReply => self.prompt.render_error("The adviser did not answer."),
            SubmitOutcome::Failed(e) => self.prompt.render_error(&e.to_string()),
            SubmitOutcome::Ignored => {}
        }
    }

    pub fn surface(&self) -> &ChatSurface {
        &self.surface
    }
}
