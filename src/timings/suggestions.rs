//! Plugins that are redundant or harmful on particular server software.
//!
//! A row applies when the report lists the row's configuration namespace
//! (which identifies the server software) and the plugin is loaded.

/// A warning about one plugin, gated on a configuration namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionRule {
    /// Loaded plugin name as it appears in the report
    pub plugin: &'static str,
    /// Configuration namespace that must be present
    pub config: &'static str,
    /// Shown after the plugin name in the finding title
    pub prefix: &'static str,
    pub warning: &'static str,
}

const LAG_REMOVER: &str = "Plugins that claim to remove lag actually cause more lag.";

pub const SERVER_PLUGIN_SUGGESTIONS: &[SuggestionRule] = &[
    SuggestionRule {
        plugin: "ClearLag",
        config: "bukkit",
        prefix: "❌",
        warning: LAG_REMOVER,
    },
    SuggestionRule {
        plugin: "LagAssist",
        config: "bukkit",
        prefix: "❌",
        warning: LAG_REMOVER,
    },
    SuggestionRule {
        plugin: "NoChunkLag",
        config: "bukkit",
        prefix: "❌",
        warning: LAG_REMOVER,
    },
    SuggestionRule {
        plugin: "ServerBoosterPlus",
        config: "bukkit",
        prefix: "❌",
        warning: LAG_REMOVER,
    },
    SuggestionRule {
        plugin: "CleanMemory",
        config: "bukkit",
        prefix: "❌",
        warning: "Freeing memory by hand only makes the garbage collector work harder.",
    },
    SuggestionRule {
        plugin: "PhantomSMP",
        config: "paper",
        prefix: "⚠",
        warning: "You probably don't need PhantomSMP as Paper already has its features.",
    },
    SuggestionRule {
        plugin: "PacketLimiter",
        config: "paper",
        prefix: "⚠",
        warning: "You should remove PacketLimiter as Paper already has its features.",
    },
    SuggestionRule {
        plugin: "StackMob",
        config: "paper",
        prefix: "⚠",
        warning: "Stacking plugins are laggy. Lower entity limits in paper.yml instead.",
    },
    SuggestionRule {
        plugin: "SilkSpawners",
        config: "purpur",
        prefix: "⚠",
        warning: "You probably don't need SilkSpawners as Purpur already has its features.",
    },
    SuggestionRule {
        plugin: "MineableSpawners",
        config: "purpur",
        prefix: "⚠",
        warning: "You probably don't need MineableSpawners as Purpur already has its features.",
    },
    SuggestionRule {
        plugin: "VillagerLobotomizatornator",
        config: "purpur",
        prefix: "⚠",
        warning: "You probably don't need VillagerLobotomizatornator as Purpur can lobotomize villagers.",
    },
    SuggestionRule {
        plugin: "VillagerOptimiser",
        config: "purpur",
        prefix: "⚠",
        warning: "You probably don't need VillagerOptimiser as Purpur can lobotomize villagers.",
    },
];
