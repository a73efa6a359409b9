use crate::commands::{build_runtime, load_config, CommandResult};
use kudos_db::connect_grant_repository;

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let repository = connect_grant_repository(&config.database)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), 4u8))?;
        repository.prepare().await.map_err(|error| ("store_prepare", error.to_string(), 5u8))?;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "grant ledger schema and indexes are in place"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
