//! Version command implementation

use crate::cli::Output;
use anyhow::Result;

/// Execute the version command
pub async fn execute(output: &Output) -> Result<()> {
    let authors = env!("CARGO_PKG_AUTHORS");

    output.header("🚀 s1-sweep Version Information");
    output.status_indicator("VERSION", &version_line(), true);
    output.blank_line();

    output.category("About");
    output.key_value("Description:", crate::PKG_DESCRIPTION, false);
    output.key_value("Authors:", authors, false);
    output.blank_line();

    output.category("Build Information");
    output.key_value("Rust edition:", "2024", false);
    output.key_value("Target:", std::env::consts::ARCH, false);
    output.key_value("Profile:", if cfg!(debug_assertions) { "debug" } else { "release" }, false);
    output.key_value("Logical CPUs:", &num_cpus::get().to_string(), false);

    output.blank_line();
    output.success("💡 Run 's1-sweep --help' for usage information");

    Ok(())
}

fn version_line() -> String {
    format!("{} v{}", crate::PKG_NAME, crate::VERSION)
}
