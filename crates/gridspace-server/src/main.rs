//! Runs the realtime layer standalone.
//!
//! Configured through the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `GRIDSPACE_BIND` | listen address, default `127.0.0.1:8080` |
//! | `GRIDSPACE_JWT_SECRET` | HS256 secret shared with the token issuer (required) |
//! | `GRIDSPACE_JWT_REQUIRE_EXP` | refuse tokens without `exp` |
//! | `GRIDSPACE_SPACE_CHANNEL_SIZE` | command queue depth per space |
//! | `GRIDSPACE_SPACES` | path to a JSON space catalogue |
//! | `RUST_LOG` | log filter, default `info` |

use gridspace::prelude::*;

#[tokio::main]
async fn main() -> Result<(), GridspaceError> {
    gridspace::init_tracing("info");

    let config = ServerConfig::from_env()?;
    let validator = config.validator()?;
    let directory = config.directory().await?;
    if config.spaces_path.is_none() {
        tracing::warn!("no space catalogue configured, every join will report space not found");
    }

    let server = GridspaceServerBuilder::from_config(&config)
        .build(validator, directory)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
