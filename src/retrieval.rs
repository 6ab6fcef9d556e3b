//! Top-level retrieval of referring expressions.
//!
//! Collects and sorts the restriction pool, profiles every individual, groups
//! individuals sharing a profile and the same outgoing role assertions, and
//! runs the expression builder once per group.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::ExpressionBuilder;
use crate::concept::{Concept, Role};
use crate::context::OntologyContext;
use crate::error::{ConfigError, ConfigResult, CreResult};
use crate::expression::{CompletedExpression, InProgressExpression};
use crate::hierarchy::DEFAULT_BULK_THRESHOLD;
use crate::ontology::Ontology;
use crate::oracle::Reasoner;
use crate::profile::{IndividualProfiler, Profiles};
use crate::restriction::{RestrictionCollector, RestrictionPool};

/// Retrieval settings, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Sort the restriction pool into subsumption hierarchies before
    /// building. Without sorting, minimality is checked pairwise.
    #[serde(default = "default_apply_sorting")]
    pub apply_sorting: bool,
    /// Hierarchies with at least this many nodes are sorted by a single
    /// classification instead of pairwise insertion.
    #[serde(default = "default_bulk_threshold")]
    pub bulk_threshold: usize,
    /// Log [`RetrievalStats`] at info level.
    #[serde(default)]
    pub collect_stats: bool,
}

fn default_apply_sorting() -> bool {
    true
}
fn default_bulk_threshold() -> usize {
    DEFAULT_BULK_THRESHOLD
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            apply_sorting: default_apply_sorting(),
            bulk_threshold: default_bulk_threshold(),
            collect_stats: false,
        }
    }
}

impl RetrievalConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Figures of one retrieval call. A group is a set of individuals sharing a
/// profile and the same outgoing role assertions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalStats {
    pub individuals: usize,
    pub groups: usize,
    pub largest_group: usize,
    pub average_group_size: f64,
    pub expressions: usize,
    pub oracle_calls: usize,
}

pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Referring expressions answering `query`, shortest first.
    pub fn retrieve<R: Reasoner + ?Sized>(
        &self,
        ontology: &Ontology,
        reasoner: &R,
        query: &Concept,
    ) -> CreResult<Vec<CompletedExpression>> {
        self.retrieve_with_stats(ontology, reasoner, query)
            .map(|(expressions, _)| expressions)
    }

    pub fn retrieve_with_stats<R: Reasoner + ?Sized>(
        &self,
        ontology: &Ontology,
        reasoner: &R,
        query: &Concept,
    ) -> CreResult<(Vec<CompletedExpression>, RetrievalStats)> {
        let ctx = OntologyContext::new(ontology, reasoner);
        let pool = self.pool(&ctx)?;
        let profiles = IndividualProfiler::new(&ctx, &pool).profile()?;

        let mut groups: BTreeMap<BTreeSet<Concept>, BTreeSet<String>> = BTreeMap::new();
        for (individual, concepts) in &profiles {
            groups
                .entry(concepts.clone())
                .or_default()
                .insert(individual.clone());
        }

        let builder = ExpressionBuilder::new(&ctx, &pool, query, self.config.apply_sorting);
        let mut found = BTreeSet::new();
        let mut subgroups = 0;
        let mut largest_group = 0;
        for (concepts, members) in &groups {
            let start = Concept::and(concepts.iter().cloned());
            for subgroup in split_by_successors(ontology, members) {
                tracing::debug!(%start, individuals = subgroup.len(), "building expressions");
                subgroups += 1;
                largest_group = largest_group.max(subgroup.len());
                let expr = InProgressExpression::new(subgroup);
                found.extend(builder.construct(&start, &expr, &BTreeSet::new())?);
            }
        }

        let mut expressions: Vec<CompletedExpression> = found.into_iter().collect();
        expressions.sort_by(|a, b| {
            a.text()
                .chars()
                .count()
                .cmp(&b.text().chars().count())
                .then_with(|| a.text().cmp(b.text()))
        });

        let stats = RetrievalStats {
            individuals: profiles.len(),
            groups: subgroups,
            largest_group,
            average_group_size: if subgroups == 0 {
                0.0
            } else {
                profiles.len() as f64 / subgroups as f64
            },
            expressions: expressions.len(),
            oracle_calls: ctx.oracle_calls(),
        };
        tracing::info!(
            %query,
            expressions = stats.expressions,
            oracle_calls = stats.oracle_calls,
            "retrieval finished"
        );
        if self.config.collect_stats {
            tracing::info!(
                individuals = stats.individuals,
                groups = stats.groups,
                largest_group = stats.largest_group,
                average_group_size = stats.average_group_size,
                expressions = stats.expressions,
                oracle_calls = stats.oracle_calls,
                "retrieval stats"
            );
        }
        Ok((expressions, stats))
    }

    /// The restriction pool of `ontology`, sorted unless sorting is off.
    pub fn restrictions<R: Reasoner + ?Sized>(&self, ontology: &Ontology, reasoner: &R) -> CreResult<RestrictionPool> {
        let ctx = OntologyContext::new(ontology, reasoner);
        self.pool(&ctx)
    }

    /// Most specific concepts of every individual of `ontology`.
    pub fn profiles<R: Reasoner + ?Sized>(&self, ontology: &Ontology, reasoner: &R) -> CreResult<Profiles> {
        let ctx = OntologyContext::new(ontology, reasoner);
        let pool = self.pool(&ctx)?;
        IndividualProfiler::new(&ctx, &pool).profile()
    }

    fn pool<R: Reasoner + ?Sized>(&self, ctx: &OntologyContext<'_, R>) -> CreResult<RestrictionPool> {
        let mut pool = RestrictionCollector::new(ctx).collect_ontology()?;
        if self.config.apply_sorting {
            pool.sort(ctx, self.config.bulk_threshold)?;
        }
        Ok(pool)
    }
}

/// Split `members` by their sets of outgoing `(role, object)` pairs.
fn split_by_successors(ontology: &Ontology, members: &BTreeSet<String>) -> Vec<BTreeSet<String>> {
    let mut subgroups: BTreeMap<BTreeSet<(Role, String)>, BTreeSet<String>> = BTreeMap::new();
    for individual in members {
        let successors = ontology
            .roles_from(individual)
            .map(|a| (a.role.clone(), a.object.clone()))
            .collect();
        subgroups
            .entry(successors)
            .or_default()
            .insert(individual.clone());
    }
    subgroups.into_values().collect()
}
