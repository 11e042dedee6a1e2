//! Diagnostic checks over a timings report
//!
//! Every check reads the report and appends its own findings. Checks run in
//! a fixed order and never look at each other's output, so the result is a
//! pure function of the report.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::finding::Finding;
use super::report::{Report, parse_report};
use super::suggestions::SERVER_PLUGIN_SUGGESTIONS;
use crate::error::ReportError;

/// `major.minor.patch` anywhere in the server version string
static MINECRAFT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+").expect("version pattern is valid")
});

const AIKAR_FLAGS_URL: &str =
    "https://aikar.co/2018/07/02/tuning-the-jvm-g1gc-garbage-collector-flags-for-minecraft/";

const OUTDATED_FLAGS: &str = "Outdated JVM Flags";

const MAX_TIMING_COST: i64 = 300;
const MIN_CPU_THREADS: i64 = 4;
const MIN_ZGC_JAVA: i32 = 14;
/// Heap size below which the server is considered starved, in megabytes
const LOW_MEMORY_MB: i32 = 5400;

const COMMAND_FUNCTION_PREFIX: &str = "Command Function - ";
const TICK_SUFFIX: &str = ":tick";

type Check = fn(&RuleEngine, &Report, &mut Vec<Finding>) -> Result<(), ReportError>;

/// Checks in execution order
const CHECKS: &[(&str, Check)] = &[
    ("minecraft version", RuleEngine::check_minecraft_version),
    ("timing cost", RuleEngine::check_timing_cost),
    ("jvm version", RuleEngine::check_jvm_version),
    ("jvm flags", RuleEngine::check_jvm_flags),
    ("cpu", RuleEngine::check_cpu),
    ("data packs", RuleEngine::check_data_packs),
    ("plugins", RuleEngine::check_plugins),
];

/// The fixed battery of report checks
#[derive(Debug, Clone)]
pub struct RuleEngine {
    current_version: String,
}

impl RuleEngine {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
        }
    }

    /// Decode `body` and run every check.
    ///
    /// A clean report, or one without a `timingsMaster` section, yields the
    /// single "All good" finding.
    pub fn analyze(&self, body: &str) -> Result<Vec<Finding>, ReportError> {
        let mut findings = match parse_report(body)? {
            Some(report) => self.evaluate(&report)?,
            None => {
                debug!("Report has no timingsMaster section, nothing to analyze");
                Vec::new()
            }
        };

        if findings.is_empty() {
            findings.push(Finding::all_good());
        }
        Ok(findings)
    }

    /// Run every check over `report`, in order
    pub fn evaluate(&self, report: &Report) -> Result<Vec<Finding>, ReportError> {
        let mut findings = Vec::new();
        for (name, check) in CHECKS {
            let before = findings.len();
            check(self, report, &mut findings)?;
            debug!("Check {name}: {} finding(s)", findings.len() - before);
        }
        Ok(findings)
    }

    fn check_minecraft_version(
        &self,
        report: &Report,
        out: &mut Vec<Finding>,
    ) -> Result<(), ReportError> {
        let version = &report.version;
        match MINECRAFT_VERSION.find(version) {
            Some(found) if found.as_str() != self.current_version => out.push(Finding::new(
                "Legacy Build",
                format!("You are using {version}. Update to {}", self.current_version),
            )),
            Some(_) => {}
            None => out.push(Finding::new(
                "Value Error",
                format!("Could not locate version from {version}"),
            )),
        }
        Ok(())
    }

    fn check_timing_cost(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        let cost = report.system.timingcost;
        if cost > MAX_TIMING_COST {
            out.push(Finding::new(
                "Timingcost is high",
                format!(
                    "Your timingcost is {cost}. Your cpu is overloaded and/or slow. Find a better host."
                ),
            ));
        }
        Ok(())
    }

    fn check_jvm_version(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        let jvm = &report.system.jvmversion;
        if ["1.8.", "9.", "10."].iter().any(|old| jvm.starts_with(old)) {
            out.push(Finding::new(
                "Java version",
                format!(
                    "You are using Java {jvm}. Update to [Java 11](https://adoptopenjdk.net/installation.html)."
                ),
            ));
        }
        Ok(())
    }

    /// Only the first matching branch applies: ZGC, current Aikar flags,
    /// legacy Aikar flags, then anything else.
    fn check_jvm_flags(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        let flags = &report.system.flags;

        if flags.contains("-XX:+UseZGC") {
            let jvm = &report.system.jvmversion;
            let major = jvm.split('.').next().unwrap_or_default();
            let major: i32 = major.parse().map_err(|_| {
                ReportError::rule("jvm flags", format!("cannot read Java major version from {jvm:?}"))
            })?;
            if major < MIN_ZGC_JAVA {
                out.push(Finding::new(
                    "Java version & ZGC",
                    "If you are going to use ZGC, you should also use Java 14+.",
                ));
            }
        } else if flags.contains("-Daikars.new.flags=true") {
            if !flags.contains("XX:G1MixedGCCountTarget=4") {
                out.push(Finding::new(
                    OUTDATED_FLAGS,
                    "Add `-XX:G1MixedGCCountTarget=4` to flags.",
                ));
            }
            if !flags.contains("-XX:+UseG1GC") {
                out.push(Finding::new(
                    OUTDATED_FLAGS,
                    "You must use G1GC when using Aikar's flags.",
                ));
            }
            if flags.contains("-Xmx") {
                check_heap(flags, out)?;
            }
        } else if flags.contains("-Dusing.aikars.flags=mcflags.emc.gs") {
            out.push(Finding::new(
                OUTDATED_FLAGS,
                format!("Update [Aikar's flags]({AIKAR_FLAGS_URL})."),
            ));
        } else {
            out.push(Finding::new(
                "Use Aikar's Flags",
                format!("Use [Aikar's flags]({AIKAR_FLAGS_URL})."),
            ));
        }
        Ok(())
    }

    fn check_cpu(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        let cpu = report.system.cpu;
        if cpu < MIN_CPU_THREADS {
            out.push(Finding::new(
                "CPU Threads",
                format!("You have only {cpu} thread(s). Find a better host"),
            ));
        }
        Ok(())
    }

    fn check_data_packs(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        for handler in report.idmap.handler_map.values() {
            let name = &handler.name;
            if let Some(rest) = name.strip_prefix(COMMAND_FUNCTION_PREFIX)
                && name.ends_with(TICK_SUFFIX)
            {
                out.push(Finding::new(
                    function_name(rest)?,
                    "This datapack uses command functions which are laggy.",
                ));
            }
        }
        Ok(())
    }

    fn check_plugins(&self, report: &Report, out: &mut Vec<Finding>) -> Result<(), ReportError> {
        let applicable = SERVER_PLUGIN_SUGGESTIONS.iter().filter(|rule| {
            report.config.contains_key(rule.config) && report.plugins.contains_key(rule.plugin)
        });
        for rule in applicable {
            out.push(Finding::new(
                format!("{} {}", rule.plugin, rule.prefix),
                rule.warning,
            ));
        }
        Ok(())
    }
}

/// Heap checks for Aikar's flags; `-Xms` is only compared when `-Xmx` is set
fn check_heap(flags: &str, out: &mut Vec<Finding>) -> Result<(), ReportError> {
    let tokens: Vec<&str> = flags.split(' ').collect();
    let Some(max) = tokens.iter().find_map(|t| t.strip_prefix("-Xmx")) else {
        return Ok(());
    };

    let max_heap = heap_megabytes(max)?;
    if max_heap < LOW_MEMORY_MB {
        out.push(Finding::new(
            "Low Memory",
            "Allocate at least 6-10GB of ram to your server if you can afford it.",
        ));
    }

    if let Some(min) = tokens.iter().find_map(|t| t.strip_prefix("-Xms")) {
        let min_heap = heap_megabytes(min)?;
        if min_heap != max_heap {
            out.push(Finding::new(
                OUTDATED_FLAGS,
                "Your Xmx and Xms values should be equivalent when using Aikar's flags.",
            ));
        }
    }
    Ok(())
}

/// Reads a heap size textually: `G` becomes `000` and `M` is dropped, so
/// `8G` reads as 8000 and `8192M` as 8192.
fn heap_megabytes(raw: &str) -> Result<i32, ReportError> {
    let digits = raw
        .replace('G', "000")
        .replace('g', "000")
        .replace('M', "")
        .replace('m', "");
    digits
        .parse()
        .map_err(|_| ReportError::rule("jvm flags", format!("cannot read heap size {raw:?}")))
}

/// Text before the first `:tick`; a name made only of `:tick` markers has none
fn function_name(rest: &str) -> Result<&str, ReportError> {
    let mut pieces = rest.split(TICK_SUFFIX);
    let first = pieces.next().unwrap_or_default();
    if first.is_empty() && pieces.all(str::is_empty) {
        return Err(ReportError::rule(
            "data packs",
            format!("command function {rest:?} has no name"),
        ));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timings::report::{Handler, IdMap, SystemInfo};
    use indexmap::IndexMap;
    use serde_json::json;

    const GOOD_FLAGS: &str =
        "-Daikars.new.flags=true -XX:+UseG1GC -XX:G1MixedGCCountTarget=4 -Xmx8000M -Xms8000M";

    fn engine() -> RuleEngine {
        RuleEngine::new("1.16.5")
    }

    fn clean_report() -> Report {
        Report {
            version: "git-Paper-445 (MC: 1.16.5)".to_string(),
            system: SystemInfo {
                cpu: 8,
                timingcost: 120,
                jvmversion: "11.0.9".to_string(),
                flags: GOOD_FLAGS.to_string(),
            },
            plugins: IndexMap::new(),
            config: IndexMap::new(),
            idmap: IdMap {
                handler_map: IndexMap::new(),
            },
        }
    }

    fn with_flags(flags: &str) -> Report {
        let mut report = clean_report();
        report.system.flags = flags.to_string();
        report
    }

    fn titles(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.title.as_str()).collect()
    }

    #[test]
    fn test_clean_report_has_no_findings() {
        assert!(engine().evaluate(&clean_report()).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_build() {
        let mut report = clean_report();
        report.version = "git-Paper-100 (MC: 1.15.2)".to_string();

        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(
            findings,
            vec![Finding::new(
                "Legacy Build",
                "You are using git-Paper-100 (MC: 1.15.2). Update to 1.16.5"
            )]
        );
    }

    #[test]
    fn test_unparseable_version_is_a_finding() {
        let mut report = clean_report();
        report.version = "custom build".to_string();

        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["Value Error"]);
        assert!(findings[0].detail.contains("custom build"));
    }

    #[test]
    fn test_timing_cost_threshold() {
        let mut report = clean_report();
        report.system.timingcost = 301;
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["Timingcost is high"]);
        assert!(findings[0].detail.contains("301"));

        report.system.timingcost = 300;
        assert!(engine().evaluate(&report).unwrap().is_empty());
    }

    #[test]
    fn test_cpu_threshold() {
        let mut report = clean_report();
        report.system.cpu = 2;
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["CPU Threads"]);
        assert!(findings[0].detail.contains('2'));

        report.system.cpu = 4;
        assert!(engine().evaluate(&report).unwrap().is_empty());
    }

    #[test]
    fn test_outdated_java() {
        for jvm in ["1.8.0_275", "9.0.4", "10.0.2"] {
            let mut report = clean_report();
            report.system.jvmversion = jvm.to_string();
            let findings = engine().evaluate(&report).unwrap();
            assert_eq!(titles(&findings), vec!["Java version"], "for {jvm}");
            assert!(findings[0].detail.contains(jvm));
        }

        let mut report = clean_report();
        report.system.jvmversion = "1.80".to_string();
        assert!(engine().evaluate(&report).unwrap().is_empty());
    }

    #[test]
    fn test_zgc_requires_java_14() {
        let mut report = with_flags("-XX:+UseZGC -Daikars.new.flags=true");
        report.system.jvmversion = "11.0.9".to_string();
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["Java version & ZGC"]);

        report.system.jvmversion = "15.0.1".to_string();
        assert!(engine().evaluate(&report).unwrap().is_empty());
    }

    #[test]
    fn test_zgc_with_unreadable_java_version_fails() {
        let mut report = with_flags("-XX:+UseZGC");
        report.system.jvmversion = "openjdk".to_string();
        assert!(matches!(
            engine().evaluate(&report),
            Err(ReportError::Rule { check: "jvm flags", .. })
        ));
    }

    #[test]
    fn test_mismatched_heap_sizes() {
        let report = with_flags(&GOOD_FLAGS.replace("-Xms8000M", "-Xms4000M"));
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(
            findings,
            vec![Finding::new(
                OUTDATED_FLAGS,
                "Your Xmx and Xms values should be equivalent when using Aikar's flags."
            )]
        );
    }

    #[test]
    fn test_missing_aikar_components() {
        let report = with_flags("-Daikars.new.flags=true -Xmx10G -Xms10G");
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec![OUTDATED_FLAGS, OUTDATED_FLAGS]);
        assert!(findings[0].detail.contains("G1MixedGCCountTarget"));
        assert!(findings[1].detail.contains("G1GC"));
    }

    #[test]
    fn test_low_memory() {
        let report = with_flags(
            "-Daikars.new.flags=true -XX:+UseG1GC -XX:G1MixedGCCountTarget=4 -Xmx4G -Xms4G",
        );
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["Low Memory"]);
    }

    #[test]
    fn test_gigabytes_are_compared_textually() {
        // 8G reads as 8000, so it does not match 8192M
        let report = with_flags(
            "-Daikars.new.flags=true -XX:+UseG1GC -XX:G1MixedGCCountTarget=4 -Xmx8G -Xms8192M",
        );
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec![OUTDATED_FLAGS]);
    }

    #[test]
    fn test_unreadable_heap_size_fails() {
        let report = with_flags(
            "-Daikars.new.flags=true -XX:+UseG1GC -XX:G1MixedGCCountTarget=4 -Xmx8T",
        );
        assert!(engine().evaluate(&report).is_err());
    }

    #[test]
    fn test_xms_without_xmx_is_ignored() {
        let report = with_flags(
            "-Daikars.new.flags=true -XX:+UseG1GC -XX:G1MixedGCCountTarget=4 -Xms2G",
        );
        assert!(engine().evaluate(&report).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_and_missing_aikar_flags() {
        let findings = engine()
            .evaluate(&with_flags("-Dusing.aikars.flags=mcflags.emc.gs -Xmx1G"))
            .unwrap();
        assert_eq!(titles(&findings), vec![OUTDATED_FLAGS]);
        assert!(findings[0].detail.starts_with("Update [Aikar's flags]"));

        let findings = engine().evaluate(&with_flags("-Xmx1G")).unwrap();
        assert_eq!(titles(&findings), vec!["Use Aikar's Flags"]);
    }

    #[test]
    fn test_command_function_data_pack() {
        let mut report = clean_report();
        report.idmap.handler_map.insert(
            "12".to_string(),
            Handler {
                name: "Command Function - foo:tick".to_string(),
            },
        );
        report.idmap.handler_map.insert(
            "13".to_string(),
            Handler {
                name: "Command Function - foo:load".to_string(),
            },
        );

        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(
            findings,
            vec![Finding::new(
                "foo",
                "This datapack uses command functions which are laggy."
            )]
        );
    }

    #[test]
    fn test_nameless_command_function_fails() {
        let mut report = clean_report();
        report.idmap.handler_map.insert(
            "1".to_string(),
            Handler {
                name: "Command Function - :tick".to_string(),
            },
        );
        assert!(engine().evaluate(&report).is_err());
    }

    #[test]
    fn test_plugin_suggestions_are_gated_on_config() {
        let mut report = clean_report();
        report.plugins.insert("ClearLag".to_string(), json!({}));
        report.plugins.insert("SilkSpawners".to_string(), json!({}));
        report.config.insert("bukkit".to_string(), json!({}));

        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["ClearLag ❌"]);

        report.config.insert("purpur".to_string(), json!({}));
        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(titles(&findings), vec!["ClearLag ❌", "SilkSpawners ⚠"]);
    }

    #[test]
    fn test_checks_do_not_short_circuit() {
        let mut report = with_flags("");
        report.system.cpu = 1;
        report.system.timingcost = 900;
        report.version = "1.12.2".to_string();

        let findings = engine().evaluate(&report).unwrap();
        assert_eq!(
            titles(&findings),
            vec!["Legacy Build", "Timingcost is high", "Use Aikar's Flags", "CPU Threads"]
        );
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let mut report = with_flags("-Xmx2G");
        report.system.cpu = 2;
        report.plugins.insert("LagAssist".to_string(), json!({}));
        report.config.insert("bukkit".to_string(), json!({}));

        let first = engine().evaluate(&report).unwrap();
        let second = engine().evaluate(&report).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyze_clean_body_is_all_good() {
        let body = json!({
            "timingsMaster": {
                "version": "git-Paper-445 (MC: 1.16.5)",
                "system": { "cpu": 8, "timingcost": 100, "jvmversion": "11.0.9", "flags": GOOD_FLAGS },
                "plugins": {},
                "config": {},
                "idmap": { "handlerMap": {} }
            }
        })
        .to_string();

        assert_eq!(engine().analyze(&body).unwrap(), vec![Finding::all_good()]);
    }

    #[test]
    fn test_analyze_without_master_is_all_good() {
        assert_eq!(engine().analyze("{}").unwrap(), vec![Finding::all_good()]);
    }

    #[test]
    fn test_analyze_malformed_body_fails() {
        assert!(engine().analyze("not json").is_err());
    }
}
