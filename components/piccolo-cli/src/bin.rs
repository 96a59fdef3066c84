#[macro_use]
mod macros;

mod frontend;

use frontend::cli;

fn main() {
    cli::main();
}
