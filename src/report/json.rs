use anyhow::Result;

use crate::report::summary::MergeSummary;

/// Render a merge summary as pretty-printed JSON
pub fn render(summary: &MergeSummary) -> Result<String> {
    let json = serde_json::to_string_pretty(summary)?;
    Ok(json)
}
