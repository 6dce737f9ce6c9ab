use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lcui-clipboard", about = "X11 clipboard exchange")]
pub struct Cli {
    /// X display to connect to
    #[arg(long, env = "DISPLAY")]
    pub display: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the current clipboard text
    Get,

    /// Own the clipboard and serve TEXT until another client takes it
    Set {
        /// Text to place on the clipboard
        text: String,
    },
}
