//! `plugin-e2e list` - tabulate declared cases

use plugin_e2e_core::case::TestCase;
use plugin_e2e_core::error::Result;

use super::Context;

pub fn execute(ctx: &Context, case_type: Option<&str>) -> Result<()> {
    let cases: Vec<TestCase> = ctx
        .load_cases()?
        .into_iter()
        .filter(|c| case_type.map_or(true, |t| c.type_label() == t))
        .collect();

    if cases.is_empty() {
        println!("No test cases found");
        return Ok(());
    }

    println!(
        "{:<28} {:<12} {:<24} {}",
        "NAME", "TYPE", "PROJECT", "DESCRIPTION"
    );
    for case in &cases {
        println!(
            "{:<28} {:<12} {:<24} {}",
            case.name,
            case.type_label(),
            case.project,
            case.description_or_empty()
        );
    }
    Ok(())
}
