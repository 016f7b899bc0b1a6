//! Group listing.

use tabled::Tabled;

use bisecure_core::{DiscoveredDevice, GatewayController};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
}

fn row(d: &DiscoveredDevice) -> GroupRow {
    GroupRow {
        id: d.group_id,
        name: d.label.clone(),
        gateway: d.bridge.clone(),
    }
}

pub async fn handle(controller: &GatewayController, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = controller.discover_devices().await?;
    let out = output::render_list(global.output, &devices, row, |d| d.group_id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
