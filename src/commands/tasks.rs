use super::Context;
use crate::output::UserOutput;
use devstack::tasks::run_task;
use devstack::{Dependency, Registry, Task};

pub async fn run_dev_task(ctx: &Context, task: Task, out: &dyn UserOutput) -> anyhow::Result<()> {
    let watch_available = if task == Task::Dev {
        let registry = Registry::new(vec![Dependency::cargo_watch()])?;
        ctx.bootstrap().check(&registry).await.is_present("cargo-watch")
    } else {
        false
    };
    out.status(&format!("Running {}...", task.name()));
    run_task(&ctx.runner, &ctx.settings, task, watch_available).await?;
    Ok(())
}
