use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{server, Config, Result};

/// Runs the HTTP API until Ctrl-C. `bind` overrides `bind_address` from `config.json`.
pub async fn serve(config: Config, bind: Option<String>) -> Result<Out<()>> {
    let bind = bind.unwrap_or_else(|| config.bind_address().to_string());
    server::run(config, &bind)
        .await
        .pub_result(ErrorType::Io)?;
    Ok("Done running HTTP server".into())
}
