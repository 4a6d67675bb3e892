use std::path::Path;

use tracing::info;

use warm_core::WarmupConfig;
use warmgrid_dispatch::IterationPlan;

pub fn check(path: &str, deadline_millis: u64, format: &str) -> anyhow::Result<()> {
    let config = WarmupConfig::from_file(Path::new(path))?;
    info!(path, strategy = %config.strategy, "config is valid");

    let plan = IterationPlan::new(deadline_millis, config.invocation_count, config.iteration_count);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan_json(&config, &plan))?);
        }
        _ => {
            print!("{}", render_plan(&config, &plan));
        }
    }

    Ok(())
}

pub fn defaults() -> anyhow::Result<()> {
    print!("{}", WarmupConfig::default().to_toml_string()?);
    Ok(())
}

fn mode(config: &WarmupConfig) -> &'static str {
    if config.enable_split_iterations {
        "split (one iteration per run)"
    } else {
        "full"
    }
}

fn render_plan(config: &WarmupConfig, plan: &IterationPlan) -> String {
    let mut out = format!(
        "strategy:        {}\n\
         mode:            {}\n\
         deadline:        {}ms\n\
         slice:           {}ms\n\
         baseline count:  {}\n\
         per iteration:   {} (+{} on the last)\n",
        config.strategy,
        mode(config),
        plan.deadline_millis,
        plan.slice.as_millis(),
        plan.baseline_count,
        plan.per_iteration_count,
        plan.leftover,
    );
    for iteration in 0..plan.iteration_count {
        out.push_str(&format!(
            "  iteration {:>2}:  {} invocations\n",
            iteration + 1,
            plan.running_count(iteration)
        ));
    }
    out
}

fn plan_json(config: &WarmupConfig, plan: &IterationPlan) -> serde_json::Value {
    let counts: Vec<u32> = (0..plan.iteration_count)
        .map(|iteration| plan.running_count(iteration))
        .collect();
    serde_json::json!({
        "strategy": config.strategy,
        "splitIterations": config.enable_split_iterations,
        "deadlineMillis": plan.deadline_millis,
        "sliceMillis": plan.slice.as_millis() as u64,
        "baselineCount": plan.baseline_count,
        "perIterationCount": plan.per_iteration_count,
        "leftover": plan.leftover,
        "iterationCounts": counts,
    })
}
