//! Per-rule extraction pipeline and whole-run orchestration.

use rayon::prelude::*;
use serde::Serialize;

use crate::engine::diagnostics::Diagnostic;
use crate::engine::enrich::{enrich, project_info, Enrichment, ProjectInfo};
use crate::engine::filter::filter_elements;
use crate::engine::grouping::{group_entries, GroupSum};
use crate::engine::index::{ModelIndex, NOT_AVAILABLE};
use crate::engine::planner::ExtensionPlan;
use crate::engine::quantity::sum_quantity;
use crate::error::{ExtractError, IndexError};
use crate::rules::{RuleSet, SelectionRule};
use crate::wbs::compare_codes;

/// Options of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Evaluate rules on the rayon pool.
    pub parallel: bool,
    /// Model file label written to the dashboard rows.
    pub model_label: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            model_label: NOT_AVAILABLE.to_string(),
        }
    }
}

/// One matched element with its context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub global_id: String,
    pub class_name: String,
    pub predefined_type: Option<String>,
    pub object_type: Option<String>,
    pub value: f64,
    pub group: Option<String>,
    #[serde(flatten)]
    pub enrichment: Enrichment,
}

/// Output of one rule's pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub total: f64,
    pub groups: Vec<GroupSum>,
    pub matches: Vec<MatchRecord>,
    /// Elements of the class before narrowing.
    pub candidates: usize,
    /// Elements the filter kept, contributing or not.
    pub selected: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl AggregationResult {
    #[must_use]
    pub fn group_values(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.value.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleOutcome {
    Completed(AggregationResult),
    Failed { reason: String },
}

impl RuleOutcome {
    #[must_use]
    pub fn result(&self) -> Option<&AggregationResult> {
        match self {
            RuleOutcome::Completed(result) => Some(result),
            RuleOutcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, RuleOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub code: String,
    pub ifc_class: String,
    pub predefined_type: String,
    pub object_type: Option<String>,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Everything a run produced, rules in WBS code order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRun {
    pub model_label: String,
    pub project: ProjectInfo,
    pub rules: Vec<RuleReport>,
    pub plan: ExtensionPlan,
}

impl ExtractionRun {
    #[must_use]
    pub fn rule(&self, code: &str) -> Option<&RuleReport> {
        self.rules.iter().find(|r| r.code == code)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.rules.iter().filter(|r| r.outcome.is_failed()).count()
    }

    #[must_use]
    pub fn matched_elements(&self) -> usize {
        self.rules
            .iter()
            .filter_map(|r| r.outcome.result())
            .map(|r| r.matches.len())
            .sum()
    }
}

/// Run one rule: filter, sum, group, enrich.
pub fn run_rule(index: &ModelIndex, rule: &SelectionRule) -> Result<AggregationResult, ExtractError> {
    if !rule.quantity.is_complete() {
        return Err(ExtractError::InvalidRule {
            reason: "rule has no quantity pset/prop".to_string(),
        });
    }
    let graph = index.graph()?;

    let selection = filter_elements(index, rule)?;
    let sum = sum_quantity(graph, &selection.elements, &rule.quantity);
    let grouping = group_entries(&sum.entries, rule.grouping.as_ref());

    let mut matches = Vec::with_capacity(sum.entries.len());
    for (entry, group) in sum.entries.iter().zip(grouping.assignments) {
        matches.push(MatchRecord {
            global_id: entry.global_id().to_string(),
            class_name: entry.element.class_name.clone(),
            predefined_type: entry.element.predefined_type.clone(),
            object_type: entry.element.object_type.clone(),
            value: entry.value,
            group,
            enrichment: enrich(index, entry.element)?,
        });
    }

    let mut diagnostics = selection.diagnostics;
    diagnostics.extend(sum.diagnostics);

    Ok(AggregationResult {
        total: sum.total,
        groups: grouping.groups,
        matches,
        candidates: selection.candidates,
        selected: selection.elements.len(),
        diagnostics,
    })
}

/// Run every rule of `rules` against the indexed model.
///
/// A failing rule is reported as [`RuleOutcome::Failed`]; the others still
/// run. `on_rule` is called once per finished rule, possibly from several
/// threads at once.
pub fn run_rules<F>(
    index: &ModelIndex,
    rules: &RuleSet,
    options: &ExtractOptions,
    on_rule: F,
) -> Result<ExtractionRun, IndexError>
where
    F: Fn(&RuleReport) + Sync,
{
    let graph = index.graph()?;
    tracing::info!(
        rules = rules.len(),
        parallel = options.parallel,
        "Running extraction"
    );

    let evaluate = |(code, rule): (&String, &SelectionRule)| {
        let outcome = match run_rule(index, rule) {
            Ok(result) => {
                tracing::info!(
                    code = %code,
                    total = result.total,
                    matches = result.matches.len(),
                    groups = result.groups.len(),
                    "Rule completed"
                );
                RuleOutcome::Completed(result)
            }
            Err(err) => {
                tracing::warn!(code = %code, error = %err, "Rule failed");
                RuleOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        let report = RuleReport {
            code: code.clone(),
            ifc_class: rule.filter.ifc_class.clone(),
            predefined_type: rule.filter.predefined_type.clone(),
            object_type: rule.object_type().map(str::to_string),
            outcome,
        };
        on_rule(&report);
        report
    };

    let mut reports: Vec<RuleReport> = if options.parallel {
        rules.rules.par_iter().map(evaluate).collect()
    } else {
        rules.rules.iter().map(evaluate).collect()
    };
    reports.sort_by(|a, b| compare_codes(&a.code, &b.code).then_with(|| a.code.cmp(&b.code)));

    let mut plan = ExtensionPlan::new();
    for report in &reports {
        if let Some(result) = report.outcome.result() {
            plan.plan(&report.code, &result.group_values());
        }
    }

    let run = ExtractionRun {
        model_label: options.model_label.clone(),
        project: project_info(graph),
        rules: reports,
        plan,
    };
    tracing::info!(
        rules = run.rules.len(),
        failed = run.failed(),
        matched = run.matched_elements(),
        "Extraction finished"
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{index, LOAD_BEARING_WALLS};
    use crate::rules::PropertyRef;
    use pretty_assertions::assert_eq;

    fn wall_rule() -> SelectionRule {
        SelectionRule::new(
            "IfcWall",
            "STANDARD",
            PropertyRef::new("Qto_WallBaseQuantities", "NetVolume"),
            PropertyRef::new("Pset_WallCommon", "LoadBearing"),
        )
    }

    fn rule_set(rules: &[(&str, SelectionRule)]) -> RuleSet {
        let mut set = RuleSet::new();
        for (code, rule) in rules {
            set.rules.insert((*code).to_string(), rule.clone());
        }
        set
    }

    #[test]
    fn load_bearing_walls_scenario() {
        let index = index(LOAD_BEARING_WALLS);
        let result = run_rule(&index, &wall_rule()).unwrap();
        assert_eq!(result.total, 6.0);
        assert_eq!(result.group_values(), vec!["true", "false"]);
        assert_eq!(result.groups[0].sum, 4.0);
        assert_eq!(result.groups[1].sum, 2.0);
        assert_eq!(result.matches.len(), 3);
        assert_eq!(result.matches[0].enrichment.building_storey, "Ground");
    }

    #[test]
    fn reruns_are_identical() {
        let index = index(LOAD_BEARING_WALLS);
        let first = run_rule(&index, &wall_rule()).unwrap();
        let second = run_rule(&index, &wall_rule()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn failing_rule_does_not_stop_the_run() {
        let index = index(LOAD_BEARING_WALLS);
        let mut broken = wall_rule();
        broken.quantity = PropertyRef::default();
        let mut missing = wall_rule();
        missing.filter.ifc_class = "IfcRamp".into();
        let set = rule_set(&[("2.1", wall_rule()), ("10.1", broken), ("2.10", missing)]);

        let run = run_rules(&index, &set, &ExtractOptions::default(), |_| {}).unwrap();
        let codes: Vec<_> = run.rules.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2.1", "2.10", "10.1"]);
        assert_eq!(run.failed(), 1);
        assert!(run.rule("10.1").unwrap().outcome.is_failed());
        assert_eq!(run.project.project, "Demo");

        // a leaf with no matches still gets its description code
        let empty = run.plan.get("2.10").unwrap();
        assert_eq!(empty.description_code, "2.10.01");
        assert!(empty.groups.is_empty());
        assert!(!run.plan.contains("10.1"));
        assert_eq!(
            run.plan.get("2.1").unwrap().group_code("false"),
            Some("2.1.01.02")
        );
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let index = index(LOAD_BEARING_WALLS);
        let set = rule_set(&[("1.1", wall_rule()), ("1.2", wall_rule())]);
        let parallel = run_rules(&index, &set, &ExtractOptions::default(), |_| {}).unwrap();
        let sequential = ExtractOptions {
            parallel: false,
            ..ExtractOptions::default()
        };
        let sequential = run_rules(&index, &set, &sequential, |_| {}).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn reports_progress_per_rule() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let index = index(LOAD_BEARING_WALLS);
        let set = rule_set(&[("1.1", wall_rule()), ("1.2", wall_rule())]);
        let seen = AtomicUsize::new(0);
        run_rules(&index, &set, &ExtractOptions::default(), |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unloaded_index_fails_the_run() {
        let set = rule_set(&[("1.1", wall_rule())]);
        assert_eq!(
            run_rules(&ModelIndex::new(), &set, &ExtractOptions::default(), |_| {}),
            Err(IndexError::NotLoaded)
        );
    }
}
