//! `irdeck accessories`: show the accessory cache file.

use tabled::Tabled;

use irdeck_config::Config;
use irdeck_core::Accessory;
use irdeck_core::host::read_cache;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct AccessoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "Stored")]
    stored: String,
}

impl AccessoryRow {
    fn new(accessory: &Accessory, color: bool) -> Self {
        Self {
            id: accessory.id.to_string(),
            name: accessory.display_name.clone(),
            tag: output::tag(&accessory.context.tag, color),
            remote: accessory.context.remote_id.to_string(),
            stored: if accessory.context.is_stored { "yes" } else { "no" }.into(),
        }
    }
}

pub async fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let mut accessories = read_cache(&cfg.cache_path()).await?;
    accessories.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &accessories,
        |a| AccessoryRow::new(a, color),
        |a| a.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
