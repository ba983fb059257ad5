use anyhow::Result;
use sigaudit_sdk::mcp::tool_definitions;

pub fn handle() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&tool_definitions())?);
    Ok(())
}
