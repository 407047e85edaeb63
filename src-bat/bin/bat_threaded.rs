//! Bat Algorithm optimizer
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use bat_algo::DriverKind;
use bat_algo::cli::{self, Args};
use clap::Parser;

/// Run the optimizer over a pool of worker threads
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: Args,
}

fn main() {
    cli::init_logging();
    let cli = Cli::parse();
    let threads = cli.args.threads.unwrap_or_else(num_cpus::get);
    cli::exit_on_error(cli::run_shared_memory(&cli.args, DriverKind::Threaded, threads));
}
