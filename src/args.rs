use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub subcommand: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a rich menu and upload its image
    RichMenu {
        /// Rich menu definition as JSON
        #[clap(short, long, value_parser)]
        definition: PathBuf,
        /// PNG or JPEG image for the menu
        #[clap(short, long, value_parser)]
        image: PathBuf,
        /// Link the menu to every user
        #[clap(long)]
        default: bool,
    },
}
