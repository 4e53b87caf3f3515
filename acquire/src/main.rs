use clap::Parser;
use log::error;
use acquire::build::{compile, new_config, new_experiment, simulate, Experiment};
use acquire::args::*;

fn main(){
    env_logger::init();
    let args = AcquireArgs::parse();
    use Action::*;
    let result = match &args.action {
        ListExperiments => {
            println!("{}", Experiment::list());
            Ok(())
        }
        NewConfig(args) => new_config(&args),
        NewExperiment(args) => new_experiment(&args),
        Compile(args) => compile(&args),
        Simulate(args) => simulate(&args),
    };
    if let Err(e) = result {
        error!("{}",e);
        std::process::exit(1);
    }
}
