use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use ecomap_common::config::EngineSettings;
use ecomap_core::TopologyService;

use crate::terminal::format::yes_no;
use crate::terminal::print;
use crate::terminal::spinner::{self, Spinner};

const KEY_WIDTH: usize = 18;

pub async fn health(settings: Arc<EngineSettings>) -> anyhow::Result<()> {
    let service = TopologyService::system(settings)
        .with_progress(Arc::new(spinner::report_discovery_progress));

    let spinner = Spinner::start("Checking connectivity...");
    let (connectivity, snapshot) = tokio::join!(service.connectivity_ok(), service.discover());
    let access: BTreeMap<Ipv4Addr, bool> = service.check_access(snapshot.ecosystem_servers()).await;
    spinner.finish();

    print::blank();
    print::header("Health");
    print::aligned_line("connectivity ok", yes_no(connectivity), KEY_WIDTH);
    print::aligned_line("ecosystem present", yes_no(snapshot.ecosystem_present()), KEY_WIDTH);

    for (address, reachable) in access {
        print::aligned_line(&address.to_string(), yes_no(reachable), KEY_WIDTH);
    }
    Ok(())
}
