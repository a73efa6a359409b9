use crate::commands::{build_runtime, load_config, CommandResult};
use kudos_db::connect_grant_repository;

/// Deletes every stored grant. Without `confirmed` the ledger is only counted and left untouched.
pub fn run(confirmed: bool) -> CommandResult {
    let config = match load_config("wipe") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("wipe") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let repository = connect_grant_repository(&config.database)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), 4u8))?;
        repository.prepare().await.map_err(|error| ("store_prepare", error.to_string(), 5u8))?;
        let stored = repository
            .count()
            .await
            .map_err(|error| ("store_read", error.to_string(), 4u8))?;

        if !confirmed {
            return Err((
                "confirmation_required",
                format!("refusing to delete {stored} stored grants; rerun with --yes"),
                1u8,
            ));
        }

        repository.delete_all().await.map_err(|error| ("store_write", error.to_string(), 4u8))
    });

    match result {
        Ok(deleted) => CommandResult::success("wipe", format!("deleted {deleted} stored grants")),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("wipe", error_class, message, exit_code)
        }
    }
}
