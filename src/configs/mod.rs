mod td3;
mod train;

pub use td3::{
    NetworkConfig,
    NoiseKind,
    TD3_Config,
};
pub use test::TestConfig;
pub use train::TrainConfig;
