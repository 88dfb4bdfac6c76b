use sylvia_types::{Configuration, ToolKind, ToolToggles};

/// Translate UI toggles into a request configuration.
///
/// Sampling values pass through unchanged. Tools are listed search first,
/// then code execution; with both off the list is empty.
#[must_use]
pub fn build_configuration(toggles: &ToolToggles) -> Configuration {
    let mut tools = Vec::with_capacity(2);
    if toggles.search_enabled {
        tools.push(ToolKind::GoogleSearch);
    }
    if toggles.code_exec_enabled {
        tools.push(ToolKind::CodeExecution);
    }
    Configuration::new(toggles.temperature, toggles.max_tokens, tools)
}
