use clap;
use std::path::PathBuf;

#[derive(clap::Parser,Debug)]
pub struct AcquireArgs {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(clap::Subcommand,Debug)]
pub enum Action {
    /// write a default run configuration (toml)
    NewConfig(NewConfigArgs),
    /// write default parameters for an experiment (json)
    NewExperiment(NewExperimentArgs),
    ListExperiments,
    /// compile an experiment and print its steps and board usage
    Compile(CompileArgs),
    /// run an experiment on simulated instruments
    Simulate(SimulateArgs),
}

#[derive(clap::Args,Debug)]
pub struct NewConfigArgs {
    pub destination:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct NewExperimentArgs {
    pub name:String,
    pub destination:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct CompileArgs {
    pub params:PathBuf,
    #[clap(short, long)]
    pub config:Option<PathBuf>,
    #[clap(short, long)]
    pub board:Option<usize>,
}

#[derive(clap::Args,Debug)]
pub struct SimulateArgs {
    pub params:PathBuf,
    #[clap(short, long)]
    pub config:Option<PathBuf>,
}
