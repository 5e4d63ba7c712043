//! `foldervault list` — show every sealed folder.

use crate::cli::output;
use crate::cli::{build_engine, Cli};
use crate::errors::Result;
use crate::vault::RegistryStatus;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (engine, _settings, _data_dir) = build_engine(cli)?;

    if let RegistryStatus::Unreadable(reason) = engine.registry_status() {
        output::warning(&format!(
            "The registry at {} could not be read ({reason}); showing no folders.",
            engine.registry_path().display()
        ));
    }

    output::print_vaults_table(&engine.list_vaults());
    Ok(())
}
