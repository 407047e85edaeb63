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

use std::env;
use std::net::TcpListener;
use std::process::Command;

use bat_algo::cli::{self, Args};
use bat_algo::comm::{TcpTransport, peer_addresses};
use bat_algo::{BatError, CommError, DriverKind, run_distributed, run_distributed_local};
use clap::Parser;

/// Run the optimizer as a set of ranks exchanging messages
///
/// Without `--rank`, `--procs` ranks run as threads of this process.
/// With `--rank`/`--world`, this process is one rank of a TCP job whose rank
/// `r` listens on `--host`:`--base-port + r`. `--spawn` launches the
/// `--procs` rank processes of such a job on this host.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: Args,

    /// Number of ranks.
    #[arg(long, default_value_t = 1)]
    procs: usize,

    /// Rank of this process in a multi-process job.
    #[arg(long, requires = "world")]
    rank: Option<usize>,

    /// Number of ranks of the multi-process job.
    #[arg(long, requires = "rank")]
    world: Option<usize>,

    /// First listening port; rank r listens on base_port + r.
    #[arg(long, default_value_t = 47000)]
    base_port: u16,

    /// Host every rank listens on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Launch --procs rank processes of this binary on this host and wait for them.
    #[arg(long, default_value_t = false, conflicts_with = "rank")]
    spawn: bool,
}

fn run_rank(cli: &Cli, rank: usize, world: usize) -> Result<(), BatError> {
    let threads = cli.args.threads.unwrap_or(1);
    let config = cli.args.to_config(DriverKind::Distributed, threads, world);
    // reject before opening any socket, like every other rank will
    config.validate_partition(world)?;
    if rank >= world {
        return Err(CommError::InvalidRank { rank, size: world }.into());
    }
    let peers = peer_addresses(&cli.host, cli.base_port, world)?;
    let listener = TcpListener::bind(peers[rank])?;
    let mut transport = TcpTransport::connect(rank, listener, &peers)?;
    if let Some(report) = run_distributed(&mut transport, &config)? {
        cli::emit_bench(&report)?;
    }
    Ok(())
}

/// Command-line arguments forwarded to the rank processes
fn forwarded_args() -> Vec<String> {
    let mut out = Vec::new();
    let mut raw = env::args().skip(1);
    while let Some(a) = raw.next() {
        if a == "--spawn" || a.starts_with("--procs=") {
            continue;
        }
        if a == "--procs" {
            raw.next();
            continue;
        }
        out.push(a);
    }
    out
}

fn spawn_ranks(cli: &Cli) -> Result<(), BatError> {
    let threads = cli.args.threads.unwrap_or(1);
    cli.args.to_config(DriverKind::Distributed, threads, cli.procs).validate_partition(cli.procs)?;
    let exe = env::current_exe()?;
    let forwarded = forwarded_args();
    let mut children = Vec::with_capacity(cli.procs);
    for rank in 0..cli.procs {
        let child = Command::new(&exe)
            .args(&forwarded)
            .arg("--rank")
            .arg(rank.to_string())
            .arg("--world")
            .arg(cli.procs.to_string())
            .spawn()?;
        children.push(child);
    }
    let mut failed = Vec::new();
    for (rank, mut child) in children.into_iter().enumerate() {
        let status = child.wait()?;
        if !status.success() {
            failed.push(rank);
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(BatError::Config(format!("ranks {:?} exited with an error", failed)))
    }
}

fn run(cli: &Cli) -> Result<(), BatError> {
    if cli.args.record.is_some() {
        return Err(BatError::Config("the distributed driver does not support --record".into()));
    }
    if let (Some(rank), Some(world)) = (cli.rank, cli.world) {
        return run_rank(cli, rank, world);
    }
    if cli.spawn {
        return spawn_ranks(cli);
    }
    let threads = cli.args.threads.unwrap_or(1);
    let report = run_distributed_local(&cli.args.to_config(DriverKind::Distributed, threads, cli.procs))?;
    cli::emit_bench(&report)
}

fn main() {
    cli::init_logging();
    let cli = Cli::parse();
    cli::exit_on_error(run(&cli));
}
