//! Line-oriented user I/O

use std::sync::mpsc as std_mpsc;
use std::thread;

use async_trait::async_trait;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;

/// Where the session reads input and writes output
#[async_trait]
pub trait Console: Send {
    /// Next input line, trimmed; `None` once the user closed the input
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn show(&mut self, text: &str);
}

type LineReply = std::result::Result<Option<String>, String>;

/// Terminal console with line editing and history
///
/// The editor runs on a dedicated input thread; `read_line` awaits its reply.
pub struct TerminalConsole {
    prompts: std_mpsc::Sender<String>,
    lines: mpsc::UnboundedReceiver<LineReply>,
}

impl TerminalConsole {
    pub fn new() -> Result<Self> {
        debug!("TerminalConsole::new: called");
        let (prompt_tx, prompt_rx) = std_mpsc::channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<std::result::Result<(), String>>(1);

        thread::Builder::new()
            .name("tripscout-input".to_string())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => {
                        let _ = ready_tx.send(Ok(()));
                        editor
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                input_loop(&mut editor, prompt_rx, line_tx);
            })
            .context("Failed to spawn input thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                prompts: prompt_tx,
                lines: line_rx,
            }),
            Ok(Err(e)) => Err(eyre!("Failed to initialize readline: {}", e)),
            Err(_) => Err(eyre!("Input thread exited during startup")),
        }
    }
}

/// Answer each prompt with one line until the input closes or the console is dropped
fn input_loop(
    editor: &mut DefaultEditor,
    prompts: std_mpsc::Receiver<String>,
    lines: mpsc::UnboundedSender<LineReply>,
) {
    while let Ok(prompt) = prompts.recv() {
        let reply = match editor.readline(&prompt) {
            Ok(line) => {
                let input = line.trim().to_string();
                if !input.is_empty() {
                    let _ = editor.add_history_entry(&input);
                }
                Ok(Some(input))
            }
            // Ctrl+C and Ctrl+D both end the session
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.to_string()),
        };
        let finished = !matches!(reply, Ok(Some(_)));
        if lines.send(reply).is_err() || finished {
            break;
        }
    }
    debug!("input_loop: finished");
}

#[async_trait]
impl Console for TerminalConsole {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.prompts.send(format!("{} ", prompt.bright_green())).is_err() {
            debug!("TerminalConsole::read_line: input thread gone");
            return Ok(None);
        }
        match self.lines.recv().await {
            Some(Ok(line)) => Ok(line),
            Some(Err(err)) => Err(eyre!("Readline error: {}", err)),
            None => {
                debug!("TerminalConsole::read_line: input closed");
                Ok(None)
            }
        }
    }

    fn show(&mut self, text: &str) {
        println!("{}", text);
    }
}
