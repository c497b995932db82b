//! List registered modes.

use veil_core::StrategyRegistry;

/// Render one `id<TAB>label<TAB>description` line per registered mode.
pub fn run(registry: &StrategyRegistry) -> String {
    registry
        .list_modes()
        .into_iter()
        .map(|meta| {
            format!(
                "{}\t{}\t{}\n",
                meta.id,
                meta.label,
                meta.description.unwrap_or_default()
            )
        })
        .collect()
}
