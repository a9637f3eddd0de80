//! `roadshield url` – print the metadata query URL for a shield.

use anyhow::Result;
use roadshield_core::config::RoadshieldConfig;
use roadshield_core::request::ShieldRequest;

pub fn run_url(cfg: &RoadshieldConfig, network: &str, number: &str, height_px: f64) -> Result<()> {
    let request = ShieldRequest::new(network, number, height_px);
    let Some(image_name) = cfg
        .lookup_table()
        .image_name(request.network(), request.route_number())
    else {
        anyhow::bail!("no shield template for network {:?}", network);
    };
    println!("{}", cfg.endpoint().query_url(&image_name, request.height_px()));
    Ok(())
}
