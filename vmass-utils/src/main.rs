mod dump;
mod format;
mod info;
mod plan;

use clap::Parser;
use derive_more::Display;
use thiserror::Error;
use vmass::Layout;

#[derive(Debug, Display, Error)]
pub enum Error {
    #[display("{_0}")]
    Disk(#[from] vmass::error::Error),
    #[display("IO: {_0}")]
    IO(#[from] std::io::Error),
    #[display("Invalid page size {_0:?}")]
    Size(String),
    #[display("No FAT boot sector found")]
    NotFat,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Filesystem {
    Fat12,
    Fat16,
    Fat32,
}

impl From<Filesystem> for Layout {
    fn from(filesystem: Filesystem) -> Self {
        match filesystem {
            Filesystem::Fat12 => Self::Fat12,
            Filesystem::Fat16 => Self::Fat16,
            Filesystem::Fat32 => Self::Fat32,
        }
    }
}

#[derive(Debug, clap::Args)]
struct Format {
    /// Comma separated page sizes, e.g. 10M,4M,2M
    #[clap(short, long, default_value = "10M,4M,2M")]
    plan: String,
    /// Filesystem type, chosen by disk size if not specified
    #[clap(short, long, value_enum)]
    filesystem: Option<Filesystem>,
    /// Image file to write
    #[clap(short, long)]
    output: String,
}

#[derive(Debug, clap::Args)]
struct Info {
    /// Disk image to inspect
    image: String,
}

#[derive(Debug, clap::Args)]
struct Dump {
    /// Disk image to dump
    image: String,
    /// First sector to dump
    #[clap(short, long, default_value_t = 0)]
    sector: u64,
    /// Number of sectors to dump
    #[clap(short, long, default_value_t = 1)]
    count: u32,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// Create a FAT formatted disk image
    Format(Format),
    /// Print device and boot sector information of an image
    Info(Info),
    /// Hex dump sectors of an image
    Dump(Dump),
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long)]
    quiet: bool,
    #[clap(short, action = clap::ArgAction::Count)]
    verbosity: u8,
    #[clap(subcommand)]
    action: Action,
}

fn main() {
    let args = Args::parse();
    let level = match (args.quiet, args.verbosity) {
        (true, _) => log::LevelFilter::Off,
        (_, 0) => log::LevelFilter::Info,
        (_, 1) => log::LevelFilter::Debug,
        (_, _) => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
    env_logger::builder().filter(None, level).target(env_logger::Target::Stdout).init();

    let result = match args.action {
        Action::Format(args) => {
            format::format(&args.plan, args.filesystem.map(Layout::from), &args.output)
        }
        Action::Info(args) => info::info(&args.image),
        Action::Dump(args) => dump::dump(&args.image, args.sector, args.count),
    };
    if let Some(error) = result.err() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
