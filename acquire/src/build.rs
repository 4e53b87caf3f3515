use std::path::Path;
use log::{info, warn};
use seq_lib::detect_noise::DetectNoiseParams;
use seq_lib::experiment::{ExperimentParameters, Initialize};
use seq_lib::spectroscopy::SpectroscopyParams;
use seq_tools::board::BoardProgram;
use seq_tools::program::CompiledProgram;
use spectrum::PowerSpectrum;
use utils::present_float;
use crate::args::{CompileArgs, NewConfigArgs, NewExperimentArgs, SimulateArgs};
use crate::config::AcquireConfig;
use crate::device::Apparatus;
use crate::error::{AcquireError, ConfigFileError, ConfigurationError};
use crate::probe::{Channel, Probe, StatisticsMode};
use crate::run::{run_sequence, RunData, RunResult, SetupMode};
use crate::sim::{SimulatedAwg, SimulatedDigitizer};

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Experiment {
    Spectroscopy,
    DetectNoise,
}

impl Experiment {
    pub fn list() -> String {
        vec![
            Self::decode(&Self::Spectroscopy),
            Self::decode(&Self::DetectNoise),
        ].join("\n")
    }
    pub fn encode(name:&str) -> Result<Self,ConfigurationError> {
        match name {
            "spectroscopy" => Ok(Self::Spectroscopy),
            "detect_noise" => Ok(Self::DetectNoise),
            _=> Err(ConfigurationError::UnknownExperiment(name.to_string()))
        }
    }
    pub fn decode(&self) -> String {
        match &self {
            Self::Spectroscopy => String::from("spectroscopy"),
            Self::DetectNoise => String::from("detect_noise"),
        }
    }
    pub fn write_default(&self,params_file:&Path) -> Result<(),AcquireError> {
        match self {
            Self::Spectroscopy => SpectroscopyParams::write_default(params_file)?,
            Self::DetectNoise => DetectNoiseParams::write_default(params_file)?,
        }
        Ok(())
    }
}

/// the experiment a parameter file belongs to, from its name field
pub fn find_experiment_from_params(params_str:&str) -> Result<Experiment,AcquireError> {
    let value:serde_json::Value = serde_json::from_str(params_str).map_err(ConfigFileError::from)?;
    let name = value.get("name").and_then(|n| n.as_str()).unwrap_or_default();
    Ok(Experiment::encode(name)?)
}

pub fn load_params(params_file:&Path) -> Result<Box<dyn ExperimentParameters>,AcquireError> {
    let params_str = utils::read_to_string(params_file,"json").map_err(ConfigFileError::from)?;
    let params:Box<dyn ExperimentParameters> = match find_experiment_from_params(&params_str)? {
        Experiment::Spectroscopy => Box::new(SpectroscopyParams::load(params_file)?),
        Experiment::DetectNoise => Box::new(DetectNoiseParams::load(params_file)?),
    };
    Ok(params)
}

fn load_config(config_file:Option<&Path>) -> Result<AcquireConfig,AcquireError> {
    match config_file {
        Some(path) => Ok(AcquireConfig::load(path)?),
        None => {
            info!("no run configuration given, using defaults");
            Ok(AcquireConfig::default())
        }
    }
}

pub fn compile_program(params:&dyn ExperimentParameters,config:&AcquireConfig) -> Result<CompiledProgram,AcquireError> {
    let (mut sequence,steps) = params.build_sequence(&config.channel_map)?;
    Ok(sequence.setup_sequence(&steps)?)
}

pub fn new_config(args:&NewConfigArgs) -> Result<(),AcquireError> {
    if args.destination.with_extension("toml").exists() {
        println!("{:?} already exists. Choose a different name.",args.destination);
        return Ok(())
    }
    AcquireConfig::write_default(&args.destination)?;
    Ok(())
}

pub fn new_experiment(args:&NewExperimentArgs) -> Result<(),AcquireError> {
    let experiment = Experiment::encode(&args.name)?;
    if args.destination.with_extension("json").exists() {
        println!("{:?} already exists. Choose a different name.",args.destination);
        return Ok(())
    }
    experiment.write_default(&args.destination)
}

pub fn compile(args:&CompileArgs) -> Result<(),AcquireError> {
    let config = load_config(args.config.as_deref())?;
    let params = load_params(&args.params)?;
    let program = compile_program(params.as_ref(),&config)?;
    println!("{}: {} segments, {} steps, {} records per replay, {:.6} s",
        params.name(),program.segments.len(),program.steps.len(),program.num_of_records(),program.total_duration());
    for (i,step) in program.steps.iter().enumerate() {
        let (name,_) = program.segments.get_index(step.segment_index).ok_or(AcquireError::Device(format!("step {} has no segment",i)))?;
        println!("{:>4} {:<20} x{:<8} -> {:<4} {:?}",i,name,step.loops,step.next_step,step.end);
    }
    let boards:Vec<usize> = match args.board {
        Some(b) => vec![b],
        None => (0..config.channel_map.n_boards()).collect()
    };
    for board in boards {
        let lowered = BoardProgram::lower(&program,&config.channel_map,board)?;
        println!("board {}: {} segments (memory for {}), {} steps",board,lowered.segments.len(),lowered.max_segments,lowered.steps.len());
    }
    Ok(())
}

fn print_report(program:&CompiledProgram,result:&RunResult,config:&AcquireConfig) -> Result<(),AcquireError> {
    println!("run from {} to {}",result.started.format("%Y-%m-%d %H:%M:%S"),result.finished.format("%H:%M:%S"));
    let (signal,monitor) = match &result.data {
        RunData::Raw(data) => {
            println!("{} raw records of {} channels",data.num_of_records(),data.channels.len());
            return Ok(())
        }
        RunData::Reduced{signal,monitor} => (signal,monitor)
    };
    let mut probe = Probe::new(signal,monitor,&program.analysis.detect_groups)?;
    let labels:Vec<String> = probe.labels().iter().map(|l| l.to_string()).collect();
    for label in labels {
        let avg = probe.averages(&label,Channel::Signal,StatisticsMode::All)?;
        let err = probe.errors(&label,Channel::Signal,StatisticsMode::All)?;
        let (ratio,ratio_err) = probe.ratio(&label,StatisticsMode::All)?;
        println!("{}",label);
        for (((d,a),e),(r,re)) in program.analysis.detect_detunings.iter().zip(avg.iter()).zip(err.iter()).zip(ratio.iter().zip(ratio_err.iter())) {
            println!("  {:>12.0} Hz  signal {}  ratio {}",d,present_float(*a,*e,None),present_float(*r,*re,None));
        }
    }
    for notice in probe.notices() {
        println!("note: {:?}",notice);
    }

    // record to record noise of the first window
    let records = program.num_of_records();
    if records >= 2 && signal.num_of_windows() > 0 && !result.transfers.is_empty() {
        let per_transfer = signal.num_of_records()/result.transfers.len();
        let dt = program.total_duration()/records as f64;
        let mut ps = PowerSpectrum::new(per_transfer,dt,config.spectrum.max_points_per_decade,config.spectrum.strategy)?;
        for transfer in &result.transfers {
            if let RunData::Reduced{signal,..} = transfer {
                ps.add_data(&signal.averages.column(0).to_vec())?;
            }
        }
        let spectrum = ps.relative_voltage_spectrum()?;
        println!("relative noise of window 0 ({} averages)",ps.num_of_averages());
        for (f,v) in ps.f().iter().zip(spectrum.iter()) {
            println!("  {:>12.3} Hz  {:.3e} /sqrt(Hz)",f,v);
        }
    }
    Ok(())
}

pub fn simulate(args:&SimulateArgs) -> Result<(),AcquireError> {
    let config = load_config(args.config.as_deref())?;
    let params = load_params(&args.params)?;
    let program = compile_program(params.as_ref(),&config)?;
    let mut digitizer = SimulatedDigitizer::new(config.simulation.inputs.clone(),config.simulation.record_period);
    if config.simulation.time_out {
        warn!("simulated digitizer is set to time out");
        digitizer = digitizer.timing_out();
    }
    let mut apparatus = Apparatus::open(SimulatedAwg::new(),digitizer)?;
    let result = run_sequence(&mut apparatus,&program,&config.digitizer,&config.run,SetupMode::Full);
    let (awg,_) = apparatus.close()?;
    let result = result?;
    info!("simulated awg replayed the program {} times ({:.3} s)",awg.replays(),awg.played_time());
    print_report(&program,&result,&config)
}
