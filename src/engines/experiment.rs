use {
    super::{
        test::evaluation_loop,
        train::training_loop_off_policy,
    },
    crate::{
        agents::OffPolicyAlgorithm,
        configs::{
            TestConfig,
            TrainConfig,
        },
        envs::Environment,
        util::write_config,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Device,
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    serde::Serialize,
    std::{
        fs::{
            create_dir_all,
            File,
        },
        path::Path,
    },
    tracing::warn,
};


/// Run an experiment with an off-policy algorithm.
///
/// Writes the three configs to `path` and then, for every repetition, trains
/// a fresh agent on a fresh environment, evaluates it greedily and stores the
/// per-episode training data in `run_{n}_data.parquet` and the evaluation
/// data in `run_{n}_eval.parquet`.
///
/// # Arguments
///
/// * `path` - The directory where the collected data will be stored.
/// * `n_repetitions` - The number of repeated, identical runs to perform.
/// * `env_config` - The configuration for the environment.
/// * `alg_config` - The configuration for the algorithm.
/// * `train_config` - The configuration for each training run.
/// * `device` - The device to run the experiment on.
pub fn run_experiment_off_policy<Alg, Env>(
    path: &dyn AsRef<Path>,
    n_repetitions: usize,
    env_config: Env::Config,
    alg_config: Alg::Config,
    train_config: TrainConfig,
    device: &Device,
) -> Result<()>
where
    Env: Environment,
    Env::Config: Clone + Serialize,
    Alg: OffPolicyAlgorithm,
    Alg::Config: Serialize,
{
    let path = path.as_ref();

    if path.join("config_algorithm.ron").try_exists()? || path.join("config_environment.ron").try_exists()? {
        Err(anyhow!(concat!(
            "Config files already exist in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    // invalid configs must fail before anything is written
    train_config.validate()?;
    let env = *Env::new(env_config.clone())?;
    Alg::from_config(
        device,
        &alg_config,
        &env.observation_space(),
        &env.action_space(),
    )?;

    create_dir_all(path)?;
    write_config(&alg_config, path.join("config_algorithm.ron"))?;
    write_config(&env_config, path.join("config_environment.ron"))?;
    write_config(&train_config, path.join("config_train.ron"))?;

    let test_config = TestConfig::new(TestConfig::default().max_episodes(), train_config.seed().wrapping_add(1));

    for n in 0..n_repetitions {
        warn!("Collecting data, run {n}/{n_repetitions}");

        let mut env = *Env::new(env_config.clone())?;
        let mut alg = *Alg::from_config(
            device,
            &alg_config,
            &env.observation_space(),
            &env.action_space(),
        )?;

        let report = training_loop_off_policy(&mut env, &mut alg, &train_config, device)?;

        let mut df = DataFrame::new(vec![
            Series::new("total_rewards", &report.total_rewards),
            Series::new("successes", &report.successes),
            Series::new("critic_losses", &report.critic_losses),
            Series::new("actor_losses", &report.actor_losses),
        ])?;
        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_data.parquet")))?
        ).finish(&mut df)?;

        let (eval_rewards, eval_successes) = evaluation_loop(&mut env, &mut alg, &test_config, device)?;
        warn!(
            "Run {n} evaluated with avg return {}",
            eval_rewards.iter().sum::<f64>() / eval_rewards.len().max(1) as f64,
        );

        let mut df = DataFrame::new(vec![
            Series::new("total_rewards", &eval_rewards),
            Series::new("successes", &eval_successes),
        ])?;
        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_eval.parquet")))?
        ).finish(&mut df)?;
    }
    Ok(())
}
