use {
    crate::{
        agents::TD3,
        configs::{
            TD3_Config,
            TrainConfig,
        },
        engines::run_experiment_off_policy,
        envs::{
            Environment,
            PendulumConfig,
            PendulumEnv,
            ReacherConfig,
            ReacherEnv,
        },
        logging::setup_logging,
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    serde::Serialize,
    std::path::{
        Path,
        PathBuf,
    },
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    Pendulum,
    Reacher,
}
impl Env {
    pub fn name(&self) -> &str {
        match self {
            Env::Pendulum => "pendulum",
            Env::Reacher => "reacher",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::None)]
    pub log: Loglevel,

    /// The environment to run.
    #[arg(long, value_enum)]
    pub env: Env,

    /// A RON file with TD3 hyperparameters replacing the environment preset.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory under `data/` to write the results to, defaults to the
    /// environment name.
    #[arg(long)]
    pub output: Option<String>,

    /// The number of independent training runs.
    #[arg(long, default_value_t = 10)]
    pub runs: usize,

    /// Override the number of training episodes per run.
    #[arg(long)]
    pub episodes: Option<usize>,
}

impl Args {
    /// The experiment directory.
    pub fn output_dir(&self) -> PathBuf {
        Path::new("data/").join(self.output.as_deref().unwrap_or(self.env.name()))
    }

    /// The preset for the chosen environment, or the config file if given.
    pub fn alg_config(&self) -> Result<TD3_Config> {
        match &self.config {
            Some(path) => TD3_Config::from_ron_file(path),
            None => Ok(match self.env {
                Env::Pendulum => TD3_Config::pendulum(),
                Env::Reacher => TD3_Config::reacher(),
            }),
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        let mut config = match self.env {
            Env::Pendulum => TrainConfig::pendulum(),
            Env::Reacher => TrainConfig::reacher(),
        };
        if let Some(episodes) = self.episodes {
            config.set_max_episodes(episodes);
        }
        config
    }
}

fn run_experiment<Env>(
    args: &Args,
    env_config: Env::Config,
    device: &Device,
) -> Result<()>
where
    Env: Environment,
    Env::Config: Clone + Serialize,
{
    let path = args.output_dir();
    warn!("Writing experiment data to {}", path.display());
    run_experiment_off_policy::<TD3, Env>(
        &path,
        args.runs,
        env_config,
        args.alg_config()?,
        args.train_config(),
        device,
    )
}

/// Set up logging and run the experiment the arguments describe.
pub fn run(args: Args) -> Result<()> {
    if let Some(level) = args.log.level() {
        setup_logging(
            &Path::new("data/").join(format!("{}.log", args.env.name())),
            Some(level),
            Some(level),
        )?;
    }

    let device = Device::Cpu;
    match args.env {
        Env::Pendulum => run_experiment::<PendulumEnv>(&args, PendulumConfig::default(), &device),
        Env::Reacher => run_experiment::<ReacherEnv>(&args, ReacherConfig::default(), &device),
    }
}
