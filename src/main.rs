use {
    anyhow::Result,
    clap::Parser,
    td3_rl::cli::{
        run,
        Args,
    },
};

// LATER

// >- Add Cuda as a Device behind a cargo feature
// >- Save and load trained actor weights (candle safetensors)


fn main() -> Result<()> {
    run(Args::parse())
}
