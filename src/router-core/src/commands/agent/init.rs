use crate::{config, stores};

/// First-boot bootstrap: creates the config directory and an empty
/// on-disk store layout. Safe to run again later — every store's `init`
/// is a self-healing load, never a destructive overwrite.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = config::config_dir()?;
    std::fs::create_dir_all(dir)?;
    log::info!("initializing softrouter agent state under {:?}", dir);

    config::init()?;
    stores::interfaces::init()?;
    stores::portforward::init()?;
    stores::wan::init()?;
    stores::routes::init()?;
    stores::vpn_policy::init()?;
    stores::qos::init()?;

    log::info!("agent initialized");
    Ok(())
}
