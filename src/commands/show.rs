//! `plugin-e2e show` - print one case with defaults applied

use plugin_e2e_core::error::{HarnessError, Result};

use super::Context;

pub fn execute(ctx: &Context, name: &str) -> Result<()> {
    let cases = ctx.load_cases()?;
    let case = cases
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| HarnessError::UsageError(format!("no test case named '{}'", name)))?;

    println!("{}", serde_json::to_string_pretty(case)?);
    Ok(())
}
