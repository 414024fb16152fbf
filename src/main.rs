use anyhow::{Context, Result};
use thermal_storage_optimizer::{config, telemetry};
use thermal_storage_optimizer::domain::Scenario;
use thermal_storage_optimizer::model::ModelBuilder;
use thermal_storage_optimizer::optimizer::{LpController, Optimizer};
use thermal_storage_optimizer::payback::PaybackAnalyzer;
use thermal_storage_optimizer::repo::{InMemoryRepository, ParameterRepository, ParameterSet};
use thermal_storage_optimizer::report::{ModelReport, RunReport, SolveReport};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let tables = ParameterSet::from_json_file(&cfg.store.parameters_path)
        .with_context(|| format!("loading {}", cfg.store.parameters_path.display()))?;
    let repo = InMemoryRepository::new(tables)?;

    let record = repo.find_scenario(&cfg.run.scenario)?;
    let mut scenario = Scenario::from_record(record, cfg.run.pricing_method);
    if let Some(steps) = cfg.run.horizon_steps {
        scenario = scenario.with_horizon_steps(steps);
    }
    if let Some(minutes) = cfg.run.timestep_minutes {
        scenario = scenario.with_timestep_minutes(minutes);
    }

    info!(
        scenario = %scenario.name,
        pricing_method = %scenario.pricing_method,
        storage_sizing = cfg.run.storage_sizing,
        "starting thermal storage optimizer"
    );

    let baseline_scenario = scenario.without_storage();
    let storage_scenario = scenario
        .storage_type
        .as_deref()
        .map(|name| scenario.with_storage(name));
    if storage_scenario.is_none() {
        warn!(scenario = %scenario.name, "scenario has no storage type; only the baseline is solved");
    }

    let builder = ModelBuilder::new(&repo);
    let baseline_model = builder.build(&baseline_scenario)?;
    let storage_model = storage_scenario
        .as_ref()
        .map(|s| builder.build(s))
        .transpose()?;

    let periods_per_year = cfg.payback.periods_per_year;
    let baseline_problem = baseline_model.optimization_problem(false, periods_per_year)?;
    let storage_problem = storage_model
        .as_ref()
        .map(|m| m.optimization_problem(cfg.run.storage_sizing, periods_per_year))
        .transpose()?;

    let optimizer = Optimizer::new(Box::new(LpController::new(cfg.solver.time_limit())));
    let (baseline, storage) = tokio::join!(optimizer.solve(baseline_problem), async {
        match storage_problem {
            Some(problem) => optimizer.solve(problem).await.map(Some),
            None => Ok(None),
        }
    });
    let baseline = baseline.context("baseline solve failed")?;
    let storage = storage.context("storage solve failed")?;

    let payback = match (&storage, storage_model.as_ref().and_then(|m| m.storage.as_ref())) {
        (Some(result), Some(layout)) => {
            let lifetime_years = layout.record.lifetime_years.ceil() as u32;
            let analyzer =
                PaybackAnalyzer::new(cfg.payback.discount_rate, periods_per_year, lifetime_years);
            let report = if cfg.run.storage_sizing {
                analyzer.analyze(&baseline, result)?
            } else {
                analyzer.analyze_fixed_storage(&baseline, result, &layout.record)?
            };
            Some(report)
        }
        _ => None,
    };

    let report = RunReport {
        baseline_model: ModelReport::from_model(&baseline_model),
        storage_model: storage_model.as_ref().map(ModelReport::from_model),
        baseline: SolveReport::new(&baseline, &baseline_model.timesteps),
        storage: storage
            .as_ref()
            .zip(storage_model.as_ref())
            .map(|(result, model)| SolveReport::new(result, &model.timesteps)),
        payback,
    };

    serde_json::to_writer_pretty(std::io::stdout().lock(), &report)
        .context("writing report")?;
    println!();

    info!(scenario = %scenario.name, "run complete");
    Ok(())
}
