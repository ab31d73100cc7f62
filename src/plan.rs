// src/plan.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::metrics::{self, MetricsResult};
use crate::snapshot::Snapshot;

/// Team-level margin targets derived from the per-rep figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanTargets {
    pub rep_count: usize,
    pub per_rep_netsuite: f64,
    pub per_rep_addons: f64,
    pub per_rep_total: f64,
    pub netsuite_total: f64,
    pub addons_total: f64,
    pub total_margin: f64,
    /// NetSuite share of the total margin target, in percent.
    pub netsuite_mix_percent: i64,
}

impl PlanTargets {
    pub fn from_config(cfg: &PipelineConfig) -> MetricsResult<Self> {
        let rep_count = cfg.reps.len();
        let n = rep_count as f64;
        let per_rep_netsuite = cfg.per_rep.netsuite_margin;
        let per_rep_addons = cfg.per_rep.addons_margin;
        let per_rep_total = per_rep_netsuite + per_rep_addons;
        let netsuite_total = per_rep_netsuite * n;
        let total_margin = per_rep_total * n;

        Ok(Self {
            rep_count,
            per_rep_netsuite,
            per_rep_addons,
            per_rep_total,
            netsuite_total,
            addons_total: per_rep_addons * n,
            total_margin,
            netsuite_mix_percent: metrics::mix_percent(netsuite_total, total_margin)?,
        })
    }
}

/// What the team NetSuite target implies for pipeline volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineAssumptions {
    pub win_rate: f64,
    pub avg_margin_per_win: f64,
    pub coverage_ratio: f64,
    /// NetSuite target / win rate.
    pub required_pipeline: f64,
    /// Required pipeline × coverage ratio.
    pub coverage_pipeline_target: f64,
    pub deals_required: i64,
}

impl PipelineAssumptions {
    pub fn for_target(target: f64, cfg: &PipelineConfig) -> MetricsResult<Self> {
        let p = &cfg.pipeline;
        let required_pipeline = metrics::required_pipeline(target, p.win_rate)?;
        Ok(Self {
            win_rate: p.win_rate,
            avg_margin_per_win: p.avg_margin_per_win,
            coverage_ratio: p.coverage_ratio,
            required_pipeline,
            coverage_pipeline_target: metrics::coverage_pipeline_target(
                required_pipeline,
                p.coverage_ratio,
            )?,
            deals_required: metrics::deals_required(target, p.avg_margin_per_win)?,
        })
    }
}

/// Pipeline standing of one rep against their NetSuite margin target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepCoverage {
    pub name: String,
    pub owner: String,
    pub pipeline: f64,
    pub opportunities: usize,
    pub target: f64,
    pub percent_of_target: i64,
    pub required_pipeline: f64,
    pub coverage_percent: i64,
    pub deals_required: i64,
    /// Pipeline summed per stage; records with a blank stage land under `""`.
    pub by_stage: BTreeMap<String, f64>,
    pub earliest_close: Option<NaiveDate>,
    pub latest_close: Option<NaiveDate>,
}

/// Everything the dashboard shows, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub fiscal_year: String,
    pub generated_at: DateTime<Utc>,
    pub row_count: usize,
    pub targets: PlanTargets,
    pub team: PipelineAssumptions,
    pub team_pipeline: f64,
    pub team_coverage_percent: i64,
    pub reps: Vec<RepCoverage>,
}

fn rep_coverage(
    cfg: &PipelineConfig,
    snapshot: &Snapshot,
    name: &str,
    owner: &str,
) -> MetricsResult<RepCoverage> {
    let target = cfg.per_rep.netsuite_margin;
    let pipeline = snapshot.total_for(owner);
    let required_pipeline = metrics::required_pipeline(target, cfg.pipeline.win_rate)?;

    let mut by_stage: BTreeMap<String, f64> = BTreeMap::new();
    let mut earliest_close: Option<NaiveDate> = None;
    let mut latest_close: Option<NaiveDate> = None;
    let records = snapshot.group(owner).map(|g| g.records.as_slice()).unwrap_or_default();
    for record in records {
        *by_stage
            .entry(record.get(&cfg.columns.stage).to_string())
            .or_insert(0.0) += record.value();
        if let Some(d) = record.date(&cfg.columns.close_date) {
            earliest_close = Some(earliest_close.map_or(d, |e| e.min(d)));
            latest_close = Some(latest_close.map_or(d, |l| l.max(d)));
        }
    }

    Ok(RepCoverage {
        name: name.to_string(),
        owner: owner.to_string(),
        pipeline,
        opportunities: records.len(),
        target,
        percent_of_target: metrics::percent_of_target(pipeline, target)?,
        required_pipeline,
        coverage_percent: metrics::coverage_percent(pipeline, required_pipeline)?,
        deals_required: metrics::deals_required(target, cfg.pipeline.avg_margin_per_win)?,
        by_stage,
        earliest_close,
        latest_close,
    })
}

/// Combine a snapshot with the configured targets and rates.
///
/// Reps sharing an owner key each see that owner's full pipeline; the team
/// pipeline counts every owner once.
pub fn build_report(cfg: &PipelineConfig, snapshot: &Snapshot) -> MetricsResult<PlanReport> {
    let targets = PlanTargets::from_config(cfg)?;
    let team = PipelineAssumptions::for_target(targets.netsuite_total, cfg)?;

    let reps = cfg
        .reps
        .iter()
        .map(|rep| rep_coverage(cfg, snapshot, &rep.name, rep.owner_key()))
        .collect::<MetricsResult<Vec<_>>>()?;

    let team_pipeline: f64 = cfg
        .owner_keys()
        .into_iter()
        .map(|owner| snapshot.total_for(owner))
        .sum();
    let team_coverage_percent = metrics::coverage_percent(team_pipeline, team.required_pipeline)?;

    debug!(
        reps = reps.len(),
        team_pipeline, team_coverage_percent, "built plan report"
    );

    Ok(PlanReport {
        fiscal_year: cfg.fiscal_year.clone(),
        generated_at: Utc::now(),
        row_count: snapshot.row_count,
        targets,
        team,
        team_pipeline,
        team_coverage_percent,
        reps,
    })
}
