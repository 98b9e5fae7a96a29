// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console::config::{ConsoleConfig, ServerOptions};

pub mod console;
pub mod context;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

/// Runs the console until the listeners stop. Configuration comes from the
/// environment, overridden by `options`.
pub async fn run_console(options: ServerOptions) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let mut config = ConsoleConfig::from_env();
    config.apply(options);
    info!(
        "starting operator console, subpath '{}', session duration {}s",
        config.subpath,
        config.session_duration.as_secs()
    );

    console::server::run(config).await?;
    Ok(())
}
