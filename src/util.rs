use {
    anyhow::Result,
    serde::Serialize,
    std::{
        fs::File,
        io::Write,
        path::Path,
    },
};


/// Write a serializable config to `path` as pretty RON.
pub fn write_config<C: Serialize>(
    config: &C,
    path: impl AsRef<Path>,
) -> Result<()> {
    File::create(path)?.write_all(
        ron::ser::to_string_pretty(
            config,
            ron::ser::PrettyConfig::default(),
        )?.as_bytes()
    )?;
    Ok(())
}
