mod extract;
mod process;

use extract::run_extract;
use process::run_process;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Process(args) => run_process(args, ctx),
        Command::Extract(args) => run_extract(args, ctx),
    }
}
