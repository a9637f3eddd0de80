//! `roadshield networks` – list supported networks.

use roadshield_core::config::RoadshieldConfig;

pub fn run_networks(cfg: &RoadshieldConfig) {
    let table = cfg.lookup_table();
    println!("{:<12} {}", "NETWORK", "TEMPLATE");
    for (network, template) in table.entries() {
        println!("{:<12} {}", network, template);
    }
}
